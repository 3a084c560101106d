//! Luminance conversion for colour frames
//!
//! Y = 0.299*R + 0.587*G + 0.114*B, evaluated in integer arithmetic as
//! Y = (76*R + 150*G + 29*B) >> 8. Rows are converted in parallel.

use image::{DynamicImage, GrayImage};
use rayon::prelude::*;
use tracing::warn;

const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8).min(255) as u8
}

/// Convert packed RGB bytes to grayscale.
///
/// A buffer shorter than `width * height * 3` yields an all-black image.
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_rows(rgb, width, height, |px| luma(px[0], px[1], px[2]))
}

/// Convert packed BGR bytes (camera order) to grayscale
pub fn bgr_to_grayscale(bgr: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_rows(bgr, width, height, |px| luma(px[2], px[1], px[0]))
}

fn convert_rows<F>(src: &[u8], width: usize, height: usize, f: F) -> Vec<u8>
where
    F: Fn(&[u8]) -> u8 + Sync,
{
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }
    if src.len() < width * height * 3 {
        warn!(
            len = src.len(),
            expected = width * height * 3,
            "colour buffer too short, converted as black"
        );
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * 3;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 3;
            *out = f(&src[idx..idx + 3]);
        }
    });

    gray
}

/// Grayscale view of any decoded image.
///
/// Single-channel 8-bit input is passed through untouched so intensity
/// thresholds apply to the exact stored values.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => {
            let rgb = other.to_rgb8();
            let (w, h) = rgb.dimensions();
            let gray = rgb_to_grayscale(rgb.as_raw(), w as usize, h as usize);
            // Length is exactly w*h by construction.
            GrayImage::from_raw(w, h, gray).unwrap_or_else(|| GrayImage::new(w, h))
        }
    }
}
