//! Temporal smoothing of camera frames
//!
//! The most recent frames are blended with exponentially increasing weights
//! (newest heaviest), then an edge-preserving bilateral pass removes the
//! remaining sensor noise without softening the borders the edge detector
//! relies on.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::bilateral_filter;
use rayon::prelude::*;
use std::collections::VecDeque;
use tracing::warn;

/// Ratio between the weights of consecutive frames
pub const WEIGHT_GROWTH: f32 = 1.5;
/// Default number of buffered frames
pub const DEFAULT_CAPACITY: usize = 5;

const BILATERAL_WINDOW: u32 = 5;
const BILATERAL_SIGMA_COLOR: f32 = 15.0;
const BILATERAL_SIGMA_SPATIAL: f32 = 3.0;

/// Blend `frames` (oldest first) into one representative frame.
///
/// A single frame is returned unchanged. Mismatched sizes fall back to the
/// newest frame.
pub fn stabilize(frames: &[RgbImage]) -> Option<RgbImage> {
    let newest = frames.last()?;
    if frames.len() == 1 {
        return Some(newest.clone());
    }
    let dims = newest.dimensions();
    if frames.iter().any(|f| f.dimensions() != dims) {
        warn!(frames = frames.len(), "frame sizes differ, using newest frame");
        return Some(newest.clone());
    }

    let blended = weighted_average(frames);
    Some(smooth(&blended))
}

/// Normalized `WEIGHT_GROWTH^i` weights, `i = 0` for the oldest frame
pub fn frame_weights(count: usize) -> Vec<f32> {
    let raw: Vec<f32> = (0..count).map(|i| WEIGHT_GROWTH.powi(i as i32)).collect();
    let total: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

fn weighted_average(frames: &[RgbImage]) -> RgbImage {
    let (width, height) = frames[0].dimensions();
    let weights = frame_weights(frames.len());
    let row_len = width as usize * 3;
    let mut out = vec![0u8; row_len * height as usize];

    out.par_chunks_mut(row_len.max(1)).enumerate().for_each(|(y, row)| {
        let start = y * row_len;
        for (i, dst) in row.iter_mut().enumerate() {
            let acc: f32 = frames
                .iter()
                .zip(&weights)
                .map(|(frame, w)| frame.as_raw()[start + i] as f32 * w)
                .sum();
            *dst = acc.round().clamp(0.0, 255.0) as u8;
        }
    });

    RgbImage::from_raw(width, height, out).unwrap_or_else(|| RgbImage::new(width, height))
}

fn smooth(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let channels: Vec<GrayImage> = (0..3)
        .into_par_iter()
        .map(|c| {
            let plane = GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y).0[c]]));
            bilateral_filter(&plane, BILATERAL_WINDOW, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPATIAL)
        })
        .collect();

    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            channels[0].get_pixel(x, y).0[0],
            channels[1].get_pixel(x, y).0[0],
            channels[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Ring buffer of the most recent frames, owned by the capture loop
#[derive(Debug, Clone)]
pub struct FrameStabilizer {
    frames: VecDeque<RgbImage>,
    capacity: usize,
}

impl FrameStabilizer {
    /// Empty buffer holding at most `capacity` frames (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a frame, evicting the oldest once full
    pub fn push(&mut self, frame: RgbImage) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Frames currently held
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True before the first frame
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Owned copy of the buffer, oldest first
    pub fn snapshot(&self) -> Vec<RgbImage> {
        self.frames.iter().cloned().collect()
    }

}

impl Default for FrameStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
