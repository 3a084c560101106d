//! defect_scan - region-based visual defect inspection
//!
//! An image is split into a centered base square and four side bands. Each
//! region is checked for dark features (holes, stains), bright features
//! (scratches, glare) and, on the sides, irregular edges. A region passes
//! when the share of defective pixels stays within the configured threshold;
//! the image passes only when all five regions do.
//!
//! ```
//! use defect_scan::{InspectionConfig, inspect_grayscale};
//!
//! let gray = vec![128u8; 100 * 100];
//! let result = inspect_grayscale(&gray, 100, 100, &InspectionConfig::default());
//! assert!(result.overall_is_ok);
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Region scoring
pub mod analyzer;
/// Camera-style continuous capture with background analysis
pub mod capture;
/// Tunable thresholds, shared live configuration
pub mod config;
/// Dark, bright and edge-irregularity detectors
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (regions, masks, results)
pub mod models;
/// Whole-image inspection and sessions
pub mod pipeline;
/// Annotated views
pub mod render;
/// Five-zone image layout
pub mod segmenter;
/// Temporal frame smoothing
pub mod stabilizer;
/// Image loading, view saving, dataset listing
pub mod tools;
/// Utility functions (grayscale, thresholding, morphology, geometry)
pub mod utils;

pub use config::{InspectionConfig, SharedConfig};
pub use error::{InspectError, Result};
pub use models::{
    BoundingBox, DefectKind, DefectMask, InspectionResult, Region, RegionKind, RegionName, RegionResult,
    SessionState,
};
pub use pipeline::{Inspection, InspectionSession};

use image::{DynamicImage, GrayImage};
use tracing::warn;
use utils::grayscale::{bgr_to_grayscale, rgb_to_grayscale};

/// Inspect an RGB image
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `config` - Thresholds for this pass
pub fn inspect(image: &[u8], width: usize, height: usize, config: &InspectionConfig) -> InspectionResult {
    let gray = rgb_to_grayscale(image, width, height);
    inspect_grayscale(&gray, width, height, config)
}

/// Inspect a camera frame in BGR byte order (3 bytes per pixel)
pub fn inspect_bgr(image: &[u8], width: usize, height: usize, config: &InspectionConfig) -> InspectionResult {
    let gray = bgr_to_grayscale(image, width, height);
    inspect_grayscale(&gray, width, height, config)
}

/// Inspect a grayscale image (1 byte per pixel)
///
/// A buffer shorter than `width * height` is inspected as an all-black
/// image of that size, with a warning.
pub fn inspect_grayscale(image: &[u8], width: usize, height: usize, config: &InspectionConfig) -> InspectionResult {
    let gray = match GrayImage::from_raw(width as u32, height as u32, image.to_vec()) {
        Some(gray) => gray,
        None => {
            warn!(
                len = image.len(),
                expected = width * height,
                "grayscale buffer too short, inspected as black"
            );
            GrayImage::new(width as u32, height as u32)
        }
    };
    pipeline::inspect_gray(&gray, config)
}

/// Inspector bound to a live configuration
#[derive(Debug, Clone, Default)]
pub struct Inspector {
    config: SharedConfig,
}

impl Inspector {
    /// Inspector with the given starting values
    pub fn new(config: InspectionConfig) -> Self {
        Self {
            config: SharedConfig::new(config),
        }
    }

    /// Handle for live updates
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Inspect RGB bytes with the current configuration
    pub fn inspect(&self, image: &[u8], width: usize, height: usize) -> InspectionResult {
        inspect(image, width, height, &self.config.snapshot())
    }

    /// Inspect a decoded image and render its views
    pub fn inspect_image(&self, image: &DynamicImage) -> Inspection {
        pipeline::inspect_with_views(image, &self.config.snapshot())
    }

    /// Start a session sharing this inspector's configuration
    pub fn session(&self) -> InspectionSession {
        InspectionSession::new(self.config.clone())
    }
}
