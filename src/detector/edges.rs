use crate::detector::hough::{LineSegment, SegmentParams, detect_segments};
use crate::models::DefectMask;
use crate::utils::geometry::{median, segment_angle};
use crate::utils::morphology::{self, KernelSize};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::edges::canny;
use tracing::trace;

/// Largest deviation (degrees) from the dominant orientation that still counts as straight
pub const MAX_ANGLE_DEVIATION: f32 = 15.0;

/// Fewest segments needed before a dominant orientation is trusted
pub const MIN_SEGMENTS: usize = 3;

/// Crooked or damaged edges in a border band.
///
/// The dominant orientation of the band is the median angle of all detected
/// segments; segments deviating from it by more than
/// [`MAX_ANGLE_DEVIATION`] are drawn 2px wide into the mask. A band with no
/// detectable lines, or fewer than [`MIN_SEGMENTS`], yields an empty mask.
pub fn detect_irregular_edges(
    gray: &[u8],
    width: usize,
    height: usize,
    canny_low: u8,
    canny_high: u8,
) -> DefectMask {
    let mut mask = DefectMask::new(width, height);
    let Some(image) = GrayImage::from_raw(width as u32, height as u32, gray.to_vec()) else {
        return mask;
    };
    if width == 0 || height == 0 {
        return mask;
    }

    let edges = canny(&image, canny_low as f32, canny_high as f32);
    let edges = morphology::dilate(&edges, KernelSize::Three);
    let segments = detect_segments(&edges, &SegmentParams::default());
    trace!(count = segments.len(), "line segments detected");

    let irregular = irregular_segments(&segments);
    if irregular.is_empty() {
        return mask;
    }

    let mut canvas = GrayImage::new(width as u32, height as u32);
    for seg in irregular {
        draw_thick_segment(&mut canvas, seg);
    }
    mask.union_with(&DefectMask::from_gray_image(&canvas));
    mask
}

/// Segments whose orientation departs from the median by more than the tolerance
pub fn irregular_segments(segments: &[LineSegment]) -> Vec<&LineSegment> {
    if segments.len() < MIN_SEGMENTS {
        return Vec::new();
    }
    let angles: Vec<f32> = segments
        .iter()
        .map(|s| segment_angle(s.x1, s.y1, s.x2, s.y2))
        .collect();
    let Some(dominant) = median(&angles) else {
        return Vec::new();
    };

    segments
        .iter()
        .zip(&angles)
        .filter(|(_, angle)| (**angle - dominant).abs() > MAX_ANGLE_DEVIATION)
        .map(|(seg, _)| seg)
        .collect()
}

// 2px wide: the segment plus a copy shifted one pixel across its minor axis.
fn draw_thick_segment(canvas: &mut GrayImage, seg: &LineSegment) {
    let (x1, y1, x2, y2) = (seg.x1 as f32, seg.y1 as f32, seg.x2 as f32, seg.y2 as f32);
    let white = Luma([255u8]);
    draw_line_segment_mut(canvas, (x1, y1), (x2, y2), white);
    if (seg.x2 - seg.x1).abs() >= (seg.y2 - seg.y1).abs() {
        draw_line_segment_mut(canvas, (x1, y1 + 1.0), (x2, y2 + 1.0), white);
    } else {
        draw_line_segment_mut(canvas, (x1 + 1.0, y1), (x2 + 1.0, y2), white);
    }
}
