//! Five-zone layout of an inspected image
//!
//! A base square of side `min(width, height) * p / 100` is centered in the
//! image. The side bands run from the image border to the base square and
//! span exactly the base square's extent, so the corners of the image belong
//! to no region.

use crate::models::{BoundingBox, Region, RegionName};
use image::GrayImage;

/// Bounding boxes of the five regions, in [`RegionName::ALL`] order
pub fn region_boxes(width: u32, height: u32, base_percent: f32) -> [(RegionName, BoundingBox); 5] {
    let p = if base_percent.is_nan() { 0.0 } else { base_percent.clamp(0.0, 100.0) };
    let side = (width.min(height) as f32 * p / 100.0) as u32;
    let half = side / 2;
    let (cx, cy) = (width / 2, height / 2);

    let x1 = cx.saturating_sub(half);
    let y1 = cy.saturating_sub(half);
    let x2 = (cx + half).min(width);
    let y2 = (cy + half).min(height);

    [
        (RegionName::Base, BoundingBox::new(x1, y1, x2, y2)),
        (RegionName::Top, BoundingBox::new(x1, 0, x2, y1)),
        (RegionName::Right, BoundingBox::new(x2, y1, width, y2)),
        (RegionName::Bottom, BoundingBox::new(x1, y2, x2, height)),
        (RegionName::Left, BoundingBox::new(0, y1, x1, y2)),
    ]
}

/// Split a grayscale image into its five regions.
///
/// A region whose box has no area comes back with `pixels == None`.
pub fn segment(gray: &GrayImage, base_percent: f32) -> Vec<Region> {
    let (width, height) = gray.dimensions();
    region_boxes(width, height, base_percent)
        .into_iter()
        .map(|(name, bbox)| Region {
            name,
            bbox,
            pixels: crop(gray, &bbox),
        })
        .collect()
}

/// Copy the pixels inside `bbox`, row-major
pub fn crop(gray: &GrayImage, bbox: &BoundingBox) -> Option<Vec<u8>> {
    if bbox.is_empty() || bbox.x2 > gray.width() || bbox.y2 > gray.height() {
        return None;
    }
    let stride = gray.width() as usize;
    let raw = gray.as_raw();
    let mut pixels = Vec::with_capacity(bbox.area() as usize);
    for y in bbox.y1..bbox.y2 {
        let start = y as usize * stride + bbox.x1 as usize;
        pixels.extend_from_slice(&raw[start..start + bbox.width() as usize]);
    }
    Some(pixels)
}
