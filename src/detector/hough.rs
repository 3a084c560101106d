//! Probabilistic Hough transform for line segments
//!
//! Edge points are visited in a fixed pseudo-random order. Each point votes in
//! a (rho, theta) accumulator; once a bin reaches the vote threshold the line
//! through the point is walked in both directions over remaining edge pixels,
//! bridging gaps up to `max_gap`. Pixels consumed by a segment leave the
//! pool, and their votes are withdrawn when the segment is long enough.

use image::GrayImage;

const SHIFT: u32 = 16;

/// A detected straight segment, endpoints in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    /// Start x
    pub x1: i32,
    /// Start y
    pub y1: i32,
    /// End x
    pub x2: i32,
    /// End y
    pub y2: i32,
}

impl LineSegment {
    /// Euclidean length in pixels
    pub fn length(&self) -> f32 {
        let dx = (self.x2 - self.x1) as f32;
        let dy = (self.y2 - self.y1) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Tuning of the segment search
#[derive(Debug, Clone, Copy)]
pub struct SegmentParams {
    /// Votes needed before a line is traced
    pub threshold: u32,
    /// Shortest segment (along x or y) that is reported
    pub min_length: u32,
    /// Longest run of missing pixels bridged inside one segment
    pub max_gap: u32,
    /// Angular resolution, in bins per 180°
    pub angle_bins: usize,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            threshold: 50,
            min_length: 30,
            max_gap: 10,
            angle_bins: 180,
        }
    }
}

/// Find line segments among the nonzero pixels of `edges`
pub fn detect_segments(edges: &GrayImage, params: &SegmentParams) -> Vec<LineSegment> {
    let (w, h) = edges.dimensions();
    let (width, height) = (w as i64, h as i64);
    if width == 0 || height == 0 || params.angle_bins == 0 {
        return Vec::new();
    }

    let num_angle = params.angle_bins;
    let num_rho = ((width + height) * 2 + 1) as usize;
    let rho_offset = ((num_rho - 1) / 2) as i64;
    let trig: Vec<(f32, f32)> = (0..num_angle)
        .map(|n| {
            let theta = n as f32 * std::f32::consts::PI / num_angle as f32;
            (theta.cos(), theta.sin())
        })
        .collect();

    let mut available = vec![false; (width * height) as usize];
    let mut points: Vec<(i64, i64)> = Vec::new();
    for (x, y, p) in edges.enumerate_pixels() {
        if p.0[0] != 0 {
            available[(y as i64 * width + x as i64) as usize] = true;
            points.push((x as i64, y as i64));
        }
    }
    shuffle(&mut points);

    let mut accum = vec![0u32; num_angle * num_rho];
    let rho_bin = |x: i64, y: i64, n: usize| -> usize {
        let (c, s) = trig[n];
        ((x as f32 * c + y as f32 * s).round() as i64 + rho_offset) as usize
    };

    let mut segments = Vec::new();

    for &(px, py) in &points {
        if !available[(py * width + px) as usize] {
            continue;
        }

        let mut max_votes = 0u32;
        let mut max_n = 0usize;
        for n in 0..num_angle {
            let slot = &mut accum[n * num_rho + rho_bin(px, py, n)];
            *slot += 1;
            if *slot > max_votes {
                max_votes = *slot;
                max_n = n;
            }
        }

        if max_votes < params.threshold {
            continue;
        }

        // Direction of the line is perpendicular to its normal (cos, sin).
        let (cos_t, sin_t) = trig[max_n];
        let a = -sin_t;
        let b = cos_t;
        let one = 1i64 << SHIFT;
        let half = 1i64 << (SHIFT - 1);

        let x_major = a.abs() > b.abs();
        let (x0, y0, dx0, dy0) = if x_major {
            let dx0 = if a > 0.0 { 1 } else { -1 };
            let dy0 = (b * one as f32 / a.abs()).round() as i64;
            (px, (py << SHIFT) + half, dx0, dy0)
        } else {
            let dy0 = if b > 0.0 { 1 } else { -1 };
            let dx0 = (a * one as f32 / b.abs()).round() as i64;
            ((px << SHIFT) + half, py, dx0, dy0)
        };

        let to_pixel = |x: i64, y: i64| -> (i64, i64) {
            if x_major { (x, y >> SHIFT) } else { (x >> SHIFT, y) }
        };

        let mut line_end = [(px, py); 2];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            let mut gap = 0u32;
            loop {
                let (j, i) = to_pixel(x, y);
                if j < 0 || j >= width || i < 0 || i >= height {
                    break;
                }
                if available[(i * width + j) as usize] {
                    gap = 0;
                    *end = (j, i);
                } else {
                    gap += 1;
                    if gap > params.max_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let min_len = params.min_length as i64;
        let good_line = (line_end[1].0 - line_end[0].0).abs() >= min_len
            || (line_end[1].1 - line_end[0].1).abs() >= min_len;

        for (k, end) in line_end.iter().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            loop {
                let (j, i) = to_pixel(x, y);
                if j < 0 || j >= width || i < 0 || i >= height {
                    break;
                }
                let idx = (i * width + j) as usize;
                if available[idx] {
                    if good_line {
                        for n in 0..num_angle {
                            let slot = &mut accum[n * num_rho + rho_bin(j, i, n)];
                            *slot = slot.saturating_sub(1);
                        }
                    }
                    available[idx] = false;
                }
                if (j, i) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good_line {
            segments.push(LineSegment {
                x1: line_end[0].0 as i32,
                y1: line_end[0].1 as i32,
                x2: line_end[1].0 as i32,
                y2: line_end[1].1 as i32,
            });
        }
    }

    segments
}

/// Deterministic Fisher-Yates shuffle (xorshift64), so repeated passes over
/// the same image report the same segments.
fn shuffle<T>(items: &mut [T]) {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    for i in (1..items.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}
