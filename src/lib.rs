// THEORY:
// This file is the main entry point for the `pitch_vision` library crate. It
// exposes the `PitchPipeline` (one frame in, one `FrameReport` out), the
// `Session` that drives it from a capture device, and the configuration and
// error types around them.
//
// The per-frame stages live in `core_modules`, leaves first:
//   contour_extractor → blob_classifier → calibration_grid / tracking_window
//   → pitch_resolver → chord_deduper → tone_trigger

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use config::PipelineConfig;
pub use error::{PitchError, Result};
pub use pipeline::{FrameReport, PitchPipeline};
pub use session::{CaptureDevice, ImageSequenceCapture, Session, SessionSummary};
