use crate::config::MIN_DEFECT_AREA;
use crate::detector::features::extract_features;
use crate::models::DefectMask;
use crate::utils::binarization::threshold_above;
use crate::utils::morphology::KernelSize;

/// Bright spots, scratches and glare.
///
/// A pixel is a candidate when its intensity is strictly above `threshold`.
pub fn detect_bright(
    gray: &[u8],
    width: usize,
    height: usize,
    threshold: u8,
    kernel: KernelSize,
) -> DefectMask {
    let candidates = threshold_above(gray, width, height, threshold);
    extract_features(&candidates, kernel, MIN_DEFECT_AREA)
}
