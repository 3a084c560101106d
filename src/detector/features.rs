use crate::models::DefectMask;
use crate::utils::geometry::polygon_area;
use crate::utils::morphology::{self, KernelSize};
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Turn a candidate map into a clean defect mask.
///
/// Opening removes speckle, then every outer contour whose enclosed area
/// reaches `min_area` is filled. Holes inside a kept component are filled
/// along with it; holes are never counted on their own.
pub fn extract_features(candidates: &GrayImage, kernel: KernelSize, min_area: f64) -> DefectMask {
    let (width, height) = candidates.dimensions();
    if width == 0 || height == 0 {
        return DefectMask::new(width as usize, height as usize);
    }

    let opened = morphology::open(candidates, kernel);
    let contours = find_contours::<i32>(&opened);
    let mut filled = GrayImage::new(width, height);

    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
    {
        if polygon_area(&contour.points) < min_area {
            continue;
        }

        let mut poly: Vec<Point<i32>> = contour.points.clone();
        // The polygon filler rejects an explicitly closed ring.
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() >= 3 {
            draw_polygon_mut(&mut filled, &poly, Luma([255]));
        }
        for p in &contour.points {
            filled.put_pixel(p.x as u32, p.y as u32, Luma([255]));
        }
    }

    DefectMask::from_gray_image(&filled)
}
