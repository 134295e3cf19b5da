//! Error types for pitch_vision
//!
//! Error strategy:
//! - Per-frame errors (extraction, a bad frame file): recoverable, the frame is
//!   treated as empty and the loop continues
//! - Session errors (capture unavailable, invalid configuration): fatal, returned
//!   before any pipeline state exists

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for pitch_vision operations
#[derive(Debug, Error)]
pub enum PitchError {
    // =========================================================================
    // Recoverable errors - skip frame, continue loop
    // =========================================================================
    #[error("Contour extraction failed: {0}")]
    Extraction(String),

    #[error("Failed to decode frame: {0}")]
    Image(#[from] image::ImageError),

    // =========================================================================
    // Fatal errors - the session never starts
    // =========================================================================
    #[error("Capture device unavailable at '{path}': {reason}\n  Tip: Check that the frame directory exists and contains PNG or JPEG frames")]
    CaptureUnavailable { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pitch_vision operations
pub type Result<T> = std::result::Result<T, PitchError>;

impl PitchError {
    /// Returns true if the error only spoils a single frame
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PitchError::Extraction(_) | PitchError::Image(_))
    }

    /// Create a capture error for a device that could not be opened
    pub fn capture_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PitchError::CaptureUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        PitchError::Config(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_recoverable() {
        assert!(PitchError::Extraction("empty mask".into()).is_recoverable());
        assert!(!PitchError::config("alpha out of range").is_recoverable());
        assert!(!PitchError::capture_unavailable("/dev/null", "not a directory").is_recoverable());
    }
}
