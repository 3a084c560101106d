//! Annotated views of an inspection
//!
//! Views are plain RGB images keyed by name, ready for a display surface or
//! for [`save_views`](crate::tools::save_views).

use crate::models::{BoundingBox, DefectMask, InspectionResult, RegionKind, RegionName, RegionResult};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::collections::BTreeMap;

/// Named annotated images produced by one analysis call
pub type Views = BTreeMap<String, RgbImage>;

/// Passing region border and label
pub const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
/// Defect tint, failing region border and label
pub const RED: Rgb<u8> = Rgb([220, 0, 0]);
/// Base square outline in the segmentation view
pub const BLUE: Rgb<u8> = Rgb([0, 90, 255]);
/// Side band outline, bright-feature preview
pub const YELLOW: Rgb<u8> = Rgb([240, 210, 0]);

const OVERLAY_ALPHA: f32 = 0.6;

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;
/// Screen pixels per font dot
const TEXT_SCALE: u32 = 2;
/// Label offset from the region corner, clear of the 2px outline
const LABEL_INSET: u32 = 4;
const LABEL_PLATE: Rgb<u8> = Rgb([0, 0, 0]);

// 3x5 dot rows, most significant bit is the left column
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        _ => return None,
    };
    Some(rows)
}

/// Pixel size of `text` as drawn by [`draw_label`]
pub fn label_size(text: &str) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    (n * (GLYPH_W + 1) * TEXT_SCALE - TEXT_SCALE, GLYPH_H * TEXT_SCALE)
}

/// Draw digits, `.` and `%` with a built-in bitmap font; other characters leave a gap.
///
/// Dots falling outside the canvas are clipped.
pub fn draw_label(canvas: &mut RgbImage, text: &str, origin: (i32, i32), color: Rgb<u8>) {
    let scale = TEXT_SCALE as i32;
    let advance = ((GLYPH_W + 1) * TEXT_SCALE) as i32;
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let x0 = origin.0 + i as i32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if (bits & (0b100 >> col)) == 0 {
                    continue;
                }
                let rect = Rect::at(x0 + col as i32 * scale, origin.1 + row as i32 * scale).of_size(TEXT_SCALE, TEXT_SCALE);
                draw_filled_rect_mut(canvas, rect, color);
            }
        }
    }
}

/// Defect percentage in the region's top-left corner, on a dark plate
pub fn percentage_label(canvas: &mut RgbImage, region: &RegionResult) {
    if region.bbox.is_empty() {
        return;
    }
    let text = format!("{:.1}%", region.defect_percentage);
    let (w, h) = label_size(&text);
    let x = (region.bbox.x1 + LABEL_INSET) as i32;
    let y = (region.bbox.y1 + LABEL_INSET) as i32;
    let pad = TEXT_SCALE;
    let plate = Rect::at(x - pad as i32, y - pad as i32).of_size(w + 2 * pad, h + 2 * pad);
    draw_filled_rect_mut(canvas, plate, LABEL_PLATE);
    draw_label(canvas, &text, (x, y), verdict_color(region.is_ok));
}

/// Outline a box with a 2px border; empty boxes are skipped
pub fn outline(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for inset in 0..2u32 {
        let w = bbox.width().saturating_sub(2 * inset);
        let h = bbox.height().saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            return;
        }
        let rect = Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Blend `color` over every set mask pixel, with the mask placed at `origin`
pub fn tint_mask(canvas: &mut RgbImage, mask: &DefectMask, origin: (u32, u32), color: Rgb<u8>) {
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            if !mask.get(x, y) {
                continue;
            }
            let (cx, cy) = (origin.0 + x as u32, origin.1 + y as u32);
            if cx >= canvas.width() || cy >= canvas.height() {
                continue;
            }
            let px = canvas.get_pixel_mut(cx, cy);
            for c in 0..3 {
                let blended = px.0[c] as f32 * (1.0 - OVERLAY_ALPHA) + color.0[c] as f32 * OVERLAY_ALPHA;
                px.0[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Region layout: base in blue, sides in yellow
pub fn segmentation_overlay(original: &RgbImage, boxes: &[(RegionName, BoundingBox)]) -> RgbImage {
    let mut canvas = original.clone();
    for (name, bbox) in boxes {
        let color = match name.kind() {
            RegionKind::Base => BLUE,
            RegionKind::Side => YELLOW,
        };
        outline(&mut canvas, bbox, color);
    }
    canvas
}

/// Every region's mask in red, region borders green when OK, red when defective,
/// each labelled with its defect percentage
pub fn defect_overlay(original: &RgbImage, result: &InspectionResult) -> RgbImage {
    let mut canvas = original.clone();
    for region in &result.per_region {
        tint_mask(&mut canvas, &region.mask, (region.bbox.x1, region.bbox.y1), RED);
    }
    for region in &result.per_region {
        outline(&mut canvas, &region.bbox, verdict_color(region.is_ok));
        percentage_label(&mut canvas, region);
    }
    canvas
}

/// Crop of one region with its own mask tinted; `None` for a missing region
pub fn region_overlay(original: &RgbImage, bbox: &BoundingBox, mask: &DefectMask) -> Option<RgbImage> {
    if bbox.is_empty() || bbox.x2 > original.width() || bbox.y2 > original.height() {
        return None;
    }
    let mut crop = image::imageops::crop_imm(original, bbox.x1, bbox.y1, bbox.width(), bbox.height()).to_image();
    tint_mask(&mut crop, mask, (0, 0), RED);
    Some(crop)
}

/// Whole-image mask preview over the original
pub fn mask_preview(original: &RgbImage, mask: &DefectMask, color: Rgb<u8>) -> RgbImage {
    let mut canvas = original.clone();
    tint_mask(&mut canvas, mask, (0, 0), color);
    canvas
}

/// Green for pass, red for fail
pub fn verdict_color(is_ok: bool) -> Rgb<u8> {
    if is_ok { GREEN } else { RED }
}

/// View name of a per-region overlay
pub fn region_view_name(name: RegionName) -> String {
    format!("region_{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_skips_empty_box() {
        let mut canvas = RgbImage::new(10, 10);
        outline(&mut canvas, &BoundingBox::new(3, 3, 3, 8), RED);
        assert!(canvas.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_outline_draws_border() {
        let mut canvas = RgbImage::new(10, 10);
        outline(&mut canvas, &BoundingBox::new(2, 2, 8, 8), GREEN);
        assert_eq!(*canvas.get_pixel(2, 2), GREEN);
        assert_eq!(*canvas.get_pixel(3, 3), GREEN);
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_tint_only_masked_pixels() {
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let mut mask = DefectMask::new(2, 2);
        mask.set(1, 1, true);
        tint_mask(&mut canvas, &mask, (2, 2), RED);
        assert_ne!(*canvas.get_pixel(3, 3), Rgb([100, 100, 100]));
        assert_eq!(*canvas.get_pixel(2, 2), Rgb([100, 100, 100]));
    }

    fn region(bbox: BoundingBox, is_ok: bool, pct: f32) -> RegionResult {
        RegionResult {
            region_name: RegionName::Base,
            bbox,
            is_ok,
            defect_kinds: Default::default(),
            defect_percentage: pct,
            mask: DefectMask::new(bbox.width() as usize, bbox.height() as usize),
        }
    }

    #[test]
    fn test_label_size() {
        assert_eq!(label_size("25.0%"), (38, 10));
        assert_eq!(label_size(""), (0, 0));
    }

    #[test]
    fn test_draw_label_digit_one() {
        let mut canvas = RgbImage::new(10, 12);
        draw_label(&mut canvas, "1", (0, 0), GREEN);
        // middle column is set on every row, left column only on rows 1 and 4
        assert_eq!(*canvas.get_pixel(2, 0), GREEN);
        assert_eq!(*canvas.get_pixel(3, 9), GREEN);
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(0, 2), GREEN);
    }

    #[test]
    fn test_draw_label_clips_at_border() {
        let mut canvas = RgbImage::new(6, 6);
        draw_label(&mut canvas, "88.8%", (2, 2), RED);
        draw_label(&mut canvas, "0", (-20, -20), RED);
        assert_eq!(*canvas.get_pixel(2, 2), RED);
    }

    #[test]
    fn test_defect_overlay_labels_percentage() {
        let original = RgbImage::from_pixel(80, 60, Rgb([128, 128, 128]));
        let bbox = BoundingBox::new(10, 10, 60, 40);
        let result = InspectionResult::from_regions(vec![region(bbox, false, 25.0)]);
        let view = defect_overlay(&original, &result);

        // top-left dot of the leading '2', in the failing colour, on the plate
        let (x, y) = (bbox.x1 + LABEL_INSET, bbox.y1 + LABEL_INSET);
        assert_eq!(*view.get_pixel(x, y), RED);
        assert_eq!(*view.get_pixel(x - 1, y - 1), LABEL_PLATE);
        // below the label the region is untouched
        assert_eq!(*view.get_pixel(x, y + 20), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_missing_region_has_no_label() {
        let original = RgbImage::from_pixel(20, 20, Rgb([128, 128, 128]));
        let result = InspectionResult::from_regions(vec![region(BoundingBox::new(5, 5, 5, 15), false, 100.0)]);
        let view = defect_overlay(&original, &result);
        assert!(view.pixels().all(|p| p.0 == [128, 128, 128]));
    }

    #[test]
    fn test_region_overlay_missing() {
        let original = RgbImage::new(10, 10);
        assert!(region_overlay(&original, &BoundingBox::new(0, 0, 0, 5), &DefectMask::default()).is_none());
        let crop = region_overlay(&original, &BoundingBox::new(1, 1, 5, 4), &DefectMask::new(4, 3)).unwrap();
        assert_eq!(crop.dimensions(), (4, 3));
    }
}
