use crate::models::mask::DefectMask;
use crate::models::region::{BoundingBox, RegionKind, RegionName};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of defect a detector reported, worded for the operator.
///
/// The center square and the border bands use different wording for the
/// same detector since the operator reads them differently: a dark patch in
/// the base is a hole, on a side it is a dark zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DefectKind {
    /// Dark feature in the base square
    #[serde(rename = "dark nodes/holes")]
    DarkHoles,
    /// Bright feature in the base square
    #[serde(rename = "bright spots/scratches")]
    BrightScratches,
    /// Dark feature in a border band
    #[serde(rename = "dark zones")]
    DarkZones,
    /// Bright feature in a border band
    #[serde(rename = "bright zones")]
    BrightZones,
    /// Edge segments off the band's dominant orientation
    #[serde(rename = "irregular edges")]
    IrregularEdges,
    /// The region had no pixels
    #[serde(rename = "missing region")]
    MissingRegion,
}

impl DefectKind {
    /// Label of the dark-feature detector for a region kind
    pub fn dark(kind: RegionKind) -> Self {
        match kind {
            RegionKind::Base => DefectKind::DarkHoles,
            RegionKind::Side => DefectKind::DarkZones,
        }
    }

    /// Label of the bright-feature detector for a region kind
    pub fn bright(kind: RegionKind) -> Self {
        match kind {
            RegionKind::Base => DefectKind::BrightScratches,
            RegionKind::Side => DefectKind::BrightZones,
        }
    }

    /// Operator-facing wording, also used in the JSON report
    pub fn label(self) -> &'static str {
        match self {
            DefectKind::DarkHoles => "dark nodes/holes",
            DefectKind::BrightScratches => "bright spots/scratches",
            DefectKind::DarkZones => "dark zones",
            DefectKind::BrightZones => "bright zones",
            DefectKind::IrregularEdges => "irregular edges",
            DefectKind::MissingRegion => "missing region",
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict for one region of one image
#[derive(Debug, Clone, Serialize)]
pub struct RegionResult {
    /// Region this verdict belongs to
    pub region_name: RegionName,
    /// Placement in the source image
    pub bbox: BoundingBox,
    /// `defect_percentage <= defect_threshold`
    pub is_ok: bool,
    /// Every detector that flagged at least one pixel
    pub defect_kinds: BTreeSet<DefectKind>,
    /// Share of defective pixels, 0–100
    pub defect_percentage: f32,
    /// Union of all detector masks, in region coordinates
    #[serde(skip)]
    pub mask: DefectMask,
}

impl RegionResult {
    /// Result for a region with no pixels: always maximally defective
    pub fn missing(region_name: RegionName, bbox: BoundingBox) -> Self {
        Self {
            region_name,
            bbox,
            is_ok: false,
            defect_kinds: BTreeSet::from([DefectKind::MissingRegion]),
            defect_percentage: 100.0,
            mask: DefectMask::default(),
        }
    }
}

/// Verdicts for all five regions of one image
#[derive(Debug, Clone, Serialize)]
pub struct InspectionResult {
    /// One entry per region, in [`RegionName::ALL`] order
    pub per_region: Vec<RegionResult>,
    /// True only if every region passed
    pub overall_is_ok: bool,
}

impl InspectionResult {
    /// Combine region results; the image passes only if every region passes
    pub fn from_regions(mut per_region: Vec<RegionResult>) -> Self {
        per_region.sort_by_key(|r| r.region_name);
        let overall_is_ok = !per_region.is_empty() && per_region.iter().all(|r| r.is_ok);
        Self {
            per_region,
            overall_is_ok,
        }
    }

    /// Look up one region's result
    pub fn get(&self, name: RegionName) -> Option<&RegionResult> {
        self.per_region.iter().find(|r| r.region_name == name)
    }

    /// Names of the regions that failed
    pub fn defective_regions(&self) -> Vec<RegionName> {
        self.per_region
            .iter()
            .filter(|r| !r.is_ok)
            .map(|r| r.region_name)
            .collect()
    }
}

/// Running verdict over a sequence of inspected images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// False from the first failed image until [`reset`](SessionState::reset)
    pub all_components_ok: bool,
    /// Number of images folded in since the last reset
    pub current_index: usize,
}

impl SessionState {
    /// Fresh session: nothing inspected, nothing failed
    pub fn new() -> Self {
        Self {
            all_components_ok: true,
            current_index: 0,
        }
    }

    /// Fold one image verdict in
    pub fn record(&mut self, overall_is_ok: bool) {
        self.all_components_ok &= overall_is_ok;
        self.current_index += 1;
    }

    /// Start over with a clean verdict
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(name: RegionName, is_ok: bool) -> RegionResult {
        RegionResult {
            region_name: name,
            bbox: BoundingBox::default(),
            is_ok,
            defect_kinds: BTreeSet::new(),
            defect_percentage: if is_ok { 0.0 } else { 50.0 },
            mask: DefectMask::default(),
        }
    }

    #[test]
    fn test_single_failed_side_fails_image() {
        let regions = RegionName::ALL
            .iter()
            .map(|&n| region(n, n != RegionName::Left))
            .collect();
        let result = InspectionResult::from_regions(regions);
        assert!(!result.overall_is_ok);
        assert_eq!(result.defective_regions(), vec![RegionName::Left]);
    }

    #[test]
    fn test_all_ok_passes() {
        let regions = RegionName::ALL.iter().map(|&n| region(n, true)).collect();
        assert!(InspectionResult::from_regions(regions).overall_is_ok);
    }

    #[test]
    fn test_missing_region_floor() {
        let r = RegionResult::missing(RegionName::Top, BoundingBox::default());
        assert!(!r.is_ok);
        assert_eq!(r.defect_percentage, 100.0);
        assert!(r.defect_kinds.contains(&DefectKind::MissingRegion));
    }

    #[test]
    fn test_labels_differ_by_kind() {
        assert_eq!(DefectKind::dark(RegionKind::Base).label(), "dark nodes/holes");
        assert_eq!(DefectKind::dark(RegionKind::Side).label(), "dark zones");
        assert_ne!(
            DefectKind::bright(RegionKind::Base),
            DefectKind::bright(RegionKind::Side)
        );
    }

    #[test]
    fn test_session_is_sticky() {
        let mut s = SessionState::new();
        s.record(true);
        s.record(false);
        s.record(true);
        assert!(!s.all_components_ok);
        assert_eq!(s.current_index, 3);
        s.reset();
        assert!(s.all_components_ok);
        assert_eq!(s.current_index, 0);
    }
}
