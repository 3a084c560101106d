/// Binary defect masks
pub mod mask;
/// Region names, boxes and extracted pixels
pub mod region;
/// Per-region and per-image verdicts, session state
pub mod result;

pub use mask::DefectMask;
pub use region::{BoundingBox, Region, RegionKind, RegionName};
pub use result::{DefectKind, InspectionResult, RegionResult, SessionState};
