//! Whole-image inspection and multi-image sessions
//!
//! An image is segmented into five regions, each region is analyzed
//! independently (in parallel), and the verdicts are combined: a single
//! defective region fails the image. A session folds successive image
//! verdicts into one sticky "all components OK" flag.

use crate::analyzer::analyze_region;
use crate::config::{InspectionConfig, SharedConfig};
use crate::detector::{detect_bright, detect_dark};
use crate::error::Result;
use crate::models::{DefectMask, InspectionResult, SessionState};
use crate::render::{self, Views};
use crate::segmenter::{region_boxes, segment};
use crate::tools::load_image;
use crate::utils::grayscale::to_grayscale;
use crate::utils::morphology::KernelSize;
use image::{DynamicImage, GrayImage};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Analysis of one image together with its annotated views
#[derive(Debug, Clone)]
pub struct Inspection {
    /// Per-region and overall verdicts
    pub result: InspectionResult,
    /// Annotated images keyed by view name
    pub views: Views,
}

/// Inspect a grayscale image
pub fn inspect_gray(gray: &GrayImage, config: &InspectionConfig) -> InspectionResult {
    let regions = segment(gray, config.base_roi_percent);
    let per_region = regions
        .par_iter()
        .map(|region| analyze_region(region, config))
        .collect();
    let result = InspectionResult::from_regions(per_region);
    info!(
        overall_is_ok = result.overall_is_ok,
        defective = ?result.defective_regions(),
        "image inspected"
    );
    result
}

/// Inspect any decoded image
pub fn inspect(image: &DynamicImage, config: &InspectionConfig) -> InspectionResult {
    inspect_gray(&to_grayscale(image), config)
}

/// Inspect an image and render every annotated view.
///
/// Views: `original`, `segmentation`, `defects`, `dark_preview`,
/// `bright_preview` and one `region_<name>` per non-missing region.
pub fn inspect_with_views(image: &DynamicImage, config: &InspectionConfig) -> Inspection {
    let gray = to_grayscale(image);
    let original = image.to_rgb8();
    let result = inspect_gray(&gray, config);

    let mut views = Views::new();
    let boxes = region_boxes(gray.width(), gray.height(), config.base_roi_percent);
    views.insert("segmentation".to_string(), render::segmentation_overlay(&original, &boxes));
    views.insert("defects".to_string(), render::defect_overlay(&original, &result));
    for region in &result.per_region {
        if let Some(view) = render::region_overlay(&original, &region.bbox, &region.mask) {
            views.insert(render::region_view_name(region.region_name), view);
        }
    }

    let (dark, bright) = preview_features(&gray, config);
    views.insert("dark_preview".to_string(), render::mask_preview(&original, &dark, render::RED));
    views.insert("bright_preview".to_string(), render::mask_preview(&original, &bright, render::YELLOW));
    views.insert("original".to_string(), original);

    Inspection { result, views }
}

/// Dark and bright masks over the whole image, cleaned with the 5×5 kernel
pub fn preview_features(gray: &GrayImage, config: &InspectionConfig) -> (DefectMask, DefectMask) {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    rayon::join(
        || detect_dark(gray.as_raw(), w, h, config.dark_threshold, KernelSize::Five),
        || detect_bright(gray.as_raw(), w, h, config.bright_threshold, KernelSize::Five),
    )
}

/// A sequence of inspected images sharing one composite verdict
pub struct InspectionSession {
    config: SharedConfig,
    state: SessionState,
    last: Option<Inspection>,
}

impl InspectionSession {
    /// Empty session reading thresholds from `config`
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            state: SessionState::new(),
            last: None,
        }
    }

    /// Inspect the next image; the configuration is read once, at the start
    pub fn inspect_next(&mut self, image: &DynamicImage) -> &Inspection {
        let config = self.config.snapshot();
        let inspection = inspect_with_views(image, &config);
        let was_ok = self.state.all_components_ok;
        self.state.record(inspection.result.overall_is_ok);
        if was_ok && !self.state.all_components_ok {
            info!(index = self.state.current_index, "session failed");
        }
        self.last.insert(inspection)
    }

    /// Load and inspect a file.
    ///
    /// A decode failure leaves the session and the last result untouched.
    pub fn inspect_path(&mut self, path: &Path) -> Result<&Inspection> {
        let image = load_image(path).inspect_err(|err| {
            warn!(path = %path.display(), error = %err, "image skipped");
        })?;
        Ok(self.inspect_next(&image))
    }

    /// Composite verdict so far
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Most recent successful inspection
    pub fn last(&self) -> Option<&Inspection> {
        self.last.as_ref()
    }

    /// Handle for live updates
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Back to "not yet analyzed"
    pub fn reset(&mut self) {
        self.state.reset();
        self.last = None;
        info!("session reset");
    }
}
