//! Inspection tunables
//!
//! Six values drive every detector call. They start at their defaults, can be
//! overridden from `DEFECT_*` environment variables or a JSON file, and are
//! mutated live through [`SharedConfig`] while capture is running.

use crate::error::{InspectError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Minimum contour area (px²) for a feature to count as a defect
pub const MIN_DEFECT_AREA: f64 = 10.0;

fn parse_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Detector thresholds and scoring policy for one analysis pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Pixels strictly below this are dark-feature candidates
    pub dark_threshold: u8,
    /// Pixels strictly above this are bright-feature candidates
    pub bright_threshold: u8,
    /// Canny hysteresis low threshold
    pub canny_low: u8,
    /// Canny hysteresis high threshold
    pub canny_high: u8,
    /// Largest defect percentage (inclusive) a region may have and still pass
    pub defect_threshold: f32,
    /// Side of the base square as a percentage of the shorter image side
    pub base_roi_percent: f32,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 50,
            bright_threshold: 200,
            canny_low: 50,
            canny_high: 150,
            defect_threshold: 5.0,
            base_roi_percent: 40.0,
        }
    }
}

impl InspectionConfig {
    /// Legal range for `defect_threshold`
    pub const DEFECT_THRESHOLD_RANGE: (f32, f32) = (0.1, 30.0);
    /// Legal range for `base_roi_percent`
    pub const BASE_ROI_RANGE: (f32, f32) = (10.0, 70.0);

    /// Defaults overridden by `DEFECT_DARK`, `DEFECT_BRIGHT`, `DEFECT_CANNY_LOW`,
    /// `DEFECT_CANNY_HIGH`, `DEFECT_THRESHOLD` and `DEFECT_BASE_PERCENT`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            dark_threshold: parse_env_u8("DEFECT_DARK", d.dark_threshold),
            bright_threshold: parse_env_u8("DEFECT_BRIGHT", d.bright_threshold),
            canny_low: parse_env_u8("DEFECT_CANNY_LOW", d.canny_low),
            canny_high: parse_env_u8("DEFECT_CANNY_HIGH", d.canny_high),
            defect_threshold: parse_env_f32("DEFECT_THRESHOLD", d.defect_threshold),
            base_roi_percent: parse_env_f32("DEFECT_BASE_PERCENT", d.base_roi_percent),
        }
        .validated()
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config.validated())
    }

    /// Write the configuration as pretty JSON
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Set one tunable by its field name from text, e.g. `("dark_threshold", "80")`.
    ///
    /// The result is re-validated, so out-of-range floats are clamped.
    pub fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || InspectError::InvalidParameter {
            parameter: name.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();
        match name {
            "dark_threshold" => self.dark_threshold = value.parse().map_err(|_| invalid())?,
            "bright_threshold" => self.bright_threshold = value.parse().map_err(|_| invalid())?,
            "canny_low" => self.canny_low = value.parse().map_err(|_| invalid())?,
            "canny_high" => self.canny_high = value.parse().map_err(|_| invalid())?,
            "defect_threshold" => self.defect_threshold = value.parse().map_err(|_| invalid())?,
            "base_roi_percent" => self.base_roi_percent = value.parse().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        }
        *self = self.validated();
        Ok(())
    }

    /// Clamp every float tunable into its legal range.
    ///
    /// The 8-bit thresholds cannot leave 0–255. Canny thresholds are swapped
    /// if low exceeds high.
    pub fn validated(mut self) -> Self {
        let (lo, hi) = Self::DEFECT_THRESHOLD_RANGE;
        let clamped = clamp_f32(self.defect_threshold, lo, hi, 5.0);
        if clamped != self.defect_threshold {
            warn!(
                requested = self.defect_threshold,
                applied = clamped,
                "defect threshold clamped"
            );
            self.defect_threshold = clamped;
        }

        let (lo, hi) = Self::BASE_ROI_RANGE;
        let clamped = clamp_f32(self.base_roi_percent, lo, hi, 40.0);
        if clamped != self.base_roi_percent {
            warn!(
                requested = self.base_roi_percent,
                applied = clamped,
                "base region percentage clamped"
            );
            self.base_roi_percent = clamped;
        }

        if self.canny_low > self.canny_high {
            warn!(
                low = self.canny_low,
                high = self.canny_high,
                "canny thresholds swapped"
            );
            std::mem::swap(&mut self.canny_low, &mut self.canny_high);
        }
        self
    }
}

fn clamp_f32(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

/// Live configuration shared between the control thread and analysis workers.
///
/// Readers take a [`snapshot`](SharedConfig::snapshot) at the start of a pass;
/// a change made mid-pass is picked up by the next one.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<InspectionConfig>>,
}

impl SharedConfig {
    /// Wrap an initial configuration
    pub fn new(config: InspectionConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config.validated())),
        }
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> InspectionConfig {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Mutate in place; the result is re-validated before it is stored.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut InspectionConfig),
    {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = *guard;
        f(&mut next);
        *guard = next.validated();
    }
}
