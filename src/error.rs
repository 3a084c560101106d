//! Error types for the inspection library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for inspection operations
pub type Result<T> = std::result::Result<T, InspectError>;

/// Failures that can abort an inspection pass or a resource setup.
///
/// Region-level conditions (an empty region, mismatched frames in the
/// stabilizer) are not represented here: they are resolved by policy inside
/// the pass and show up as degraded results instead.
#[derive(Error, Debug)]
pub enum InspectError {
    /// The image source did not produce a decodable image
    #[error("Failed to decode image {}: {source}", path.display())]
    Decode {
        /// File that failed
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// A frame source (camera, folder of frames) could not be opened
    #[error("Frame source unavailable: {reason}")]
    DeviceUnavailable {
        /// What went wrong
        reason: String,
    },

    /// Annotated views could not be written
    #[error("Output location not writable: {}", path.display())]
    OutputNotWritable {
        /// Directory or file that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A parameter was outside anything the library can work with
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Rejected value as given
        value: String,
    },

    /// Plain I/O failure (configuration files, directory listings)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl InspectError {
    /// Create a decode error for the given path
    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Create a device error with a human readable reason
    pub fn device(reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            reason: reason.into(),
        }
    }

    /// Recoverable errors abort the current pass only; the previous result stays on display.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InspectError::Decode { .. })
    }

    /// Operator-facing notification text
    pub fn user_message(&self) -> String {
        match self {
            InspectError::Decode { path, .. } => format!(
                "Could not read {} as an image. The previous result is still shown.",
                path.display()
            ),
            InspectError::DeviceUnavailable { reason } => {
                format!("Camera not available ({}). Capture was not started.", reason)
            }
            InspectError::OutputNotWritable { path, .. } => {
                format!("Cannot save results to {}.", path.display())
            }
            InspectError::InvalidParameter { parameter, value } => {
                format!("\"{}\" is not a valid value for {}.", value, parameter)
            }
            _ => "Inspection failed. Please check the settings and try again.".to_string(),
        }
    }
}
