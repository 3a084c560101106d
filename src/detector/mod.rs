//! Defect detectors
//!
//! Each detector turns a grayscale region into a binary defect mask of the
//! same size:
//! - Dark features (holes, stains) by inverse thresholding
//! - Bright features (scratches, glare) by upper thresholding
//! - Irregular edges by comparing line orientations against the dominant one

/// Bright spot / scratch detection
pub mod bright;
/// Dark hole / stain detection
pub mod dark;
/// Edge straightness analysis for border bands
pub mod edges;
/// Shared opening + contour filtering for the intensity detectors
pub mod features;
/// Probabilistic Hough segment extraction
pub mod hough;

pub use bright::detect_bright;
pub use dark::detect_dark;
pub use edges::detect_irregular_edges;
