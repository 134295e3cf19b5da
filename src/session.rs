// THEORY:
// A `Session` is one start/stop cycle of the controller. It pairs a capture
// device with a freshly built `PitchPipeline` and drives frames through it one
// at a time, at a fixed cadence, on a single cooperative loop.
//
// Lifecycle rules:
// 1.  **Device first**: the capture device is opened before any pipeline state
//     exists. If it cannot be opened the error goes straight back to the caller.
// 2.  **One frame at a time**: a frame is fully processed before the next one
//     is read. Tones are fire-and-forget and never awaited.
// 3.  **Bad frames are empty frames**: a frame that fails to decode or extract
//     is logged and processed as if nothing had been seen, so the chord state
//     still walks through its silence path. The loop keeps going.
// 4.  **Stop forgets**: stopping releases the device and resets every state
//     block. A restart never resumes a previous session's calibration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::core_modules::tone_trigger::ToneEngine;
use crate::error::{PitchError, Result};
use crate::pipeline::{FrameReport, PitchPipeline};

/// Source of fixed-resolution frames.
pub trait CaptureDevice: Send {
    /// Opens the device and reports the frame size.
    fn open(&mut self) -> Result<(u32, u32)>;
    /// The next frame; `None` once the device is exhausted.
    fn read_frame(&mut self) -> Option<Result<RgbaImage>>;
    fn release(&mut self);
}

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays a directory of still frames in file-name order.
#[derive(Debug)]
pub struct ImageSequenceCapture {
    directory: PathBuf,
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceCapture {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            frames: Vec::new(),
            cursor: 0,
        }
    }

    fn scan(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.directory)
            .map_err(|e| PitchError::capture_unavailable(&self.directory, e.to_string()))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        frames.sort();
        Ok(frames)
    }
}

impl CaptureDevice for ImageSequenceCapture {
    fn open(&mut self) -> Result<(u32, u32)> {
        let frames = self.scan()?;
        let first = frames
            .first()
            .ok_or_else(|| PitchError::capture_unavailable(&self.directory, "no PNG or JPEG frames"))?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| PitchError::capture_unavailable(first, e.to_string()))?;

        info!(frames = frames.len(), width, height, "Opened frame directory {:?}", self.directory);
        self.frames = frames;
        self.cursor = 0;
        Ok((width, height))
    }

    fn read_frame(&mut self) -> Option<Result<RgbaImage>> {
        let path = self.frames.get(self.cursor)?;
        self.cursor += 1;
        Some(image::open(path).map(|img| img.to_rgba8()).map_err(PitchError::from))
    }

    fn release(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub failed_frames: u64,
    pub chords_played: u64,
}

/// One start/stop cycle around a capture device.
pub struct Session<C: CaptureDevice> {
    capture: C,
    pipeline: PitchPipeline,
    running: bool,
}

impl<C: CaptureDevice> Session<C> {
    /// Checks the configuration, opens the device, then builds the pipeline for its frame size.
    pub fn start(mut capture: C, config: PipelineConfig, tone_engine: Arc<dyn ToneEngine>) -> Result<Self> {
        config.validate()?;
        let (width, height) = capture.open()?;
        let pipeline = match PitchPipeline::from_validated(config, width, height, tone_engine) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                capture.release();
                return Err(e);
            }
        };
        Ok(Self {
            capture,
            pipeline,
            running: true,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pipeline(&self) -> &PitchPipeline {
        &self.pipeline
    }

    /// Reads and processes a single frame. `None` once the device is exhausted.
    pub fn step(&mut self) -> Option<FrameReport> {
        self.next_report().map(|(report, _)| report)
    }

    /// The next frame's report and whether the frame itself failed.
    fn next_report(&mut self) -> Option<(FrameReport, bool)> {
        if !self.running {
            return None;
        }
        let processed = match self.capture.read_frame()? {
            Ok(frame) => self.pipeline.process_frame(&frame),
            Err(e) => Err(e),
        };
        Some(match processed {
            Ok(report) => (report, false),
            Err(e) => {
                warn!("Frame failed, treating it as empty: {}", e);
                (self.pipeline.process_empty_frame(), true)
            }
        })
    }

    /// Drives frames at `frame_interval` until the device runs dry or `shutdown` resolves.
    pub async fn run<F>(&mut self, frame_interval: Duration, shutdown: F) -> SessionSummary
    where
        F: std::future::Future<Output = ()>,
    {
        let mut summary = SessionSummary::default();
        let mut ticker = interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let Some((report, failed)) = self.next_report() else {
                        break;
                    };
                    summary.frames += 1;
                    if failed {
                        summary.failed_frames += 1;
                    }
                    if report.triggered() {
                        summary.chords_played += 1;
                    }
                }
            }
        }

        info!(
            frames = summary.frames,
            failed = summary.failed_frames,
            chords = summary.chords_played,
            "Session loop finished"
        );
        summary
    }

    /// Releases the device and forgets all learned state.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.capture.release();
        self.pipeline.reset();
        self.running = false;
        info!("Session stopped");
    }

    /// Re-opens the device with fresh pipeline state.
    pub fn restart(&mut self) -> Result<()> {
        self.stop();
        let (width, height) = self.capture.open()?;
        if (width, height) != self.pipeline.frame_size() {
            self.pipeline.resize(width, height);
        }
        self.running = true;
        info!("Session restarted");
        Ok(())
    }
}
