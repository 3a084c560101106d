//! Per-region scoring
//!
//! Every detector that applies to the region runs over its grayscale pixels;
//! the masks are OR-ed together and the defect percentage is the share of set
//! pixels. A region passes when that percentage does not exceed the
//! configured threshold.

use crate::config::InspectionConfig;
use crate::detector::{detect_bright, detect_dark, detect_irregular_edges};
use crate::models::{DefectKind, Region, RegionKind, RegionResult};
use crate::utils::morphology::KernelSize;
use std::collections::BTreeSet;
use tracing::debug;

/// Analyze one region; a missing region is always maximally defective.
pub fn analyze_region(region: &Region, config: &InspectionConfig) -> RegionResult {
    let Some(pixels) = region.pixels.as_deref() else {
        debug!(region = %region.name, "region has no area");
        return RegionResult::missing(region.name, region.bbox);
    };
    let (width, height) = (region.width(), region.height());
    if pixels.len() != width * height || pixels.is_empty() {
        return RegionResult::missing(region.name, region.bbox);
    }

    let kind = region.kind();
    let mut kinds = BTreeSet::new();

    let mut combined = detect_dark(pixels, width, height, config.dark_threshold, KernelSize::Three);
    if combined.any() {
        kinds.insert(DefectKind::dark(kind));
    }

    let bright = detect_bright(pixels, width, height, config.bright_threshold, KernelSize::Three);
    if bright.any() {
        kinds.insert(DefectKind::bright(kind));
    }
    combined.union_with(&bright);

    if kind == RegionKind::Side {
        let edges = detect_irregular_edges(pixels, width, height, config.canny_low, config.canny_high);
        if edges.any() {
            kinds.insert(DefectKind::IrregularEdges);
        }
        combined.union_with(&edges);
    }

    let defect_percentage = combined.percentage();
    let is_ok = defect_percentage <= config.defect_threshold;

    debug!(
        region = %region.name,
        percentage = defect_percentage,
        is_ok,
        "region analyzed"
    );

    RegionResult {
        region_name: region.name,
        bbox: region.bbox,
        is_ok,
        defect_kinds: kinds,
        defect_percentage,
        mask: combined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, RegionName};

    fn region(name: RegionName, w: u32, h: u32, pixels: Vec<u8>) -> Region {
        Region {
            name,
            bbox: BoundingBox::new(0, 0, w, h),
            pixels: Some(pixels),
        }
    }

    fn with_dark_block(w: usize, h: usize, size: usize) -> Vec<u8> {
        let mut px = vec![128u8; w * h];
        for y in 2..2 + size {
            for x in 2..2 + size {
                px[y * w + x] = 0;
            }
        }
        px
    }

    // Three bright horizontal rails crossed by a dark bar at 45°
    fn crooked_band(w: usize, h: usize) -> Vec<u8> {
        let mut px = vec![128u8; w * h];
        for y in 0..h {
            for x in 0..w {
                if (x as i32 - 60 - y as i32).abs() < 4 {
                    px[y * w + x] = 0;
                } else if [20, 21, 50, 51, 70, 71].contains(&y) {
                    px[y * w + x] = 255;
                }
            }
        }
        px
    }

    #[test]
    fn test_missing_region() {
        let r = Region {
            name: RegionName::Left,
            bbox: BoundingBox::new(0, 10, 0, 20),
            pixels: None,
        };
        let result = analyze_region(&r, &InspectionConfig::default());
        assert!(!result.is_ok);
        assert_eq!(result.defect_percentage, 100.0);
        assert!(result.defect_kinds.contains(&DefectKind::MissingRegion));
    }

    #[test]
    fn test_clean_region_passes() {
        let r = region(RegionName::Top, 40, 20, vec![128; 800]);
        let result = analyze_region(&r, &InspectionConfig::default());
        assert!(result.is_ok);
        assert_eq!(result.defect_percentage, 0.0);
        assert!(result.defect_kinds.is_empty());
    }

    #[test]
    fn test_labels_follow_region_kind() {
        let px = with_dark_block(40, 40, 10);
        let base = analyze_region(&region(RegionName::Base, 40, 40, px.clone()), &InspectionConfig::default());
        let side = analyze_region(&region(RegionName::Right, 40, 40, px), &InspectionConfig::default());
        assert!(base.defect_kinds.contains(&DefectKind::DarkHoles));
        assert!(side.defect_kinds.contains(&DefectKind::DarkZones));
    }

    #[test]
    fn test_pass_fail_matches_threshold() {
        // 10x10 block in 40x40 = 6.25 %
        let px = with_dark_block(40, 40, 10);
        let r = region(RegionName::Base, 40, 40, px);
        for threshold in [0.1, 5.0, 6.25, 6.3, 30.0] {
            let config = InspectionConfig {
                defect_threshold: threshold,
                ..InspectionConfig::default()
            };
            let result = analyze_region(&r, &config);
            assert!((result.defect_percentage - 6.25).abs() < 1e-4);
            assert_eq!(result.is_ok, result.defect_percentage <= threshold);
        }
    }

    #[test]
    fn test_side_reports_irregular_edges() {
        let r = region(RegionName::Top, 200, 80, crooked_band(200, 80));
        let result = analyze_region(&r, &InspectionConfig::default());
        assert!(result.defect_kinds.contains(&DefectKind::IrregularEdges));
        assert!(result.defect_kinds.contains(&DefectKind::DarkZones));
    }

    #[test]
    fn test_base_never_reports_edges() {
        let r = region(RegionName::Base, 200, 80, crooked_band(200, 80));
        let result = analyze_region(&r, &InspectionConfig::default());
        assert!(!result.defect_kinds.contains(&DefectKind::IrregularEdges));
    }

    #[test]
    fn test_exact_threshold_passes() {
        let px = with_dark_block(40, 40, 10);
        let config = InspectionConfig {
            defect_threshold: 6.25,
            ..InspectionConfig::default()
        };
        assert!(analyze_region(&region(RegionName::Base, 40, 40, px), &config).is_ok);
    }
}
