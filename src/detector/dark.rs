use crate::config::MIN_DEFECT_AREA;
use crate::detector::features::extract_features;
use crate::models::DefectMask;
use crate::utils::binarization::threshold_below;
use crate::utils::morphology::KernelSize;

/// Dark blemishes, holes and stains.
///
/// A pixel is a candidate when its intensity is strictly below `threshold`.
pub fn detect_dark(
    gray: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
    kernel: KernelSize,
) -> DefectMask {
    let candidates = threshold_below(gray, width, height, threshold);
    extract_features(&candidates, kernel, MIN_DEFECT_AREA)
}
