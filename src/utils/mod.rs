//! Utility functions for image processing
//!
//! This module provides the low-level building blocks of the detectors:
//! - Grayscale conversion (RGB/BGR to luminance)
//! - Global threshold binarization
//! - Morphology with square structuring elements
//! - Geometry (polygon area, segment orientation, median)

/// Global thresholding
pub mod binarization;
/// Polygon area, segment angles, median
pub mod geometry;
/// RGB/BGR to luminance
pub mod grayscale;
/// Opening and dilation with square kernels
pub mod morphology;
