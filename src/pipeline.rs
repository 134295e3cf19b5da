// THEORY:
// The `pipeline` module is the top-level API for the pitch engine. A
// `PitchPipeline` owns every piece of per-frame state (the calibration grid,
// the tracking window and the last sounding chord) so that one explicit value,
// owned by the frame loop, replaces a scatter of process-wide globals.
//
// One call to `process_frame` runs a frame end to end:
//   contours → classification → anchor collection → grid + window update
//   → pitch resolution → chord dedup → tone trigger
// and returns a `FrameReport` describing what happened.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info};

use crate::config::{GridMode, PipelineConfig};
use crate::core_modules::blob_classifier::{BlobCandidate, BlobClassifier, ContourGeometry};
use crate::core_modules::calibration_grid::{CalibrationGrid, CalibrationOutcome, PitchRegion};
use crate::core_modules::chord_deduper::{ChordDeduper, ChordTransition};
use crate::core_modules::contour_extractor::{ContourExtractor, ImageContourExtractor};
use crate::core_modules::pitch_resolver::{self, PitchEvent};
use crate::core_modules::tone_trigger::ToneEngine;
use crate::core_modules::tracking_window::TrackingWindow;
use crate::error::{PitchError, Result};

// Re-export key data structures for the public API.
pub use crate::core_modules::chord_deduper::ChordSet;

/// The outcome of one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Contours that passed the shape tests.
    pub candidate_count: usize,
    pub calibration: CalibrationOutcome,
    /// Left edge of the tracking window after this frame's update.
    pub window_left_x: f64,
    pub events: Vec<PitchEvent>,
    pub transition: ChordTransition,
}

impl FrameReport {
    pub fn triggered(&self) -> bool {
        self.transition.is_attack()
    }
}

/// The main, top-level struct for the pitch engine.
pub struct PitchPipeline {
    config: PipelineConfig,
    extractor: Box<dyn ContourExtractor>,
    classifier: BlobClassifier,
    grid: CalibrationGrid,
    window: TrackingWindow,
    deduper: ChordDeduper,
    tone_engine: Arc<dyn ToneEngine>,
    frame_width: u32,
    frame_height: u32,
}

impl PitchPipeline {
    /// Builds a pipeline with the image contour extractor.
    pub fn new(
        config: PipelineConfig,
        frame_width: u32,
        frame_height: u32,
        tone_engine: Arc<dyn ToneEngine>,
    ) -> Result<Self> {
        config.validate()?;
        Self::from_validated(config, frame_width, frame_height, tone_engine)
    }

    pub fn with_extractor(
        config: PipelineConfig,
        frame_width: u32,
        frame_height: u32,
        extractor: Box<dyn ContourExtractor>,
        tone_engine: Arc<dyn ToneEngine>,
    ) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, frame_width, frame_height, extractor, tone_engine)
    }

    /// `new` for a configuration the caller has already validated.
    pub(crate) fn from_validated(
        config: PipelineConfig,
        frame_width: u32,
        frame_height: u32,
        tone_engine: Arc<dyn ToneEngine>,
    ) -> Result<Self> {
        let extractor = Box::new(ImageContourExtractor::new(&config.detection));
        Self::assemble(config, frame_width, frame_height, extractor, tone_engine)
    }

    fn assemble(
        config: PipelineConfig,
        frame_width: u32,
        frame_height: u32,
        extractor: Box<dyn ContourExtractor>,
        tone_engine: Arc<dyn ToneEngine>,
    ) -> Result<Self> {
        let grid_config = &config.grid;
        if grid_config.mode == GridMode::Dynamic
            && (frame_height as f64 - 2.0 * grid_config.margin) < grid_config.min_span
        {
            return Err(PitchError::config(format!(
                "frame height {} leaves no room for a dynamic grid (margin {}, min_span {})",
                frame_height, grid_config.margin, grid_config.min_span
            )));
        }

        let classifier = BlobClassifier::new(config.marker.thresholds());
        let grid = CalibrationGrid::new(&config.grid, config.note_table(), frame_height);
        let window = TrackingWindow::new(&config.window, frame_width);
        info!(
            frame_width,
            frame_height,
            regions = grid.region_count(),
            grid_mode = ?config.grid.mode,
            window_mode = ?config.window.mode,
            "Pitch pipeline ready"
        );
        Ok(Self {
            config,
            extractor,
            classifier,
            grid,
            window,
            deduper: ChordDeduper::new(),
            tone_engine,
            frame_width,
            frame_height,
        })
    }

    /// Extracts contours from the frame and processes them.
    pub fn process_frame(&mut self, frame: &RgbaImage) -> Result<FrameReport> {
        if (frame.width(), frame.height()) != (self.frame_width, self.frame_height) {
            self.resize(frame.width(), frame.height());
        }
        let contours = self.extractor.extract(frame)?;
        Ok(self.process_contours(&contours))
    }

    /// Runs the frame as if nothing had been detected.
    pub fn process_empty_frame(&mut self) -> FrameReport {
        self.process_candidates(&[])
    }

    /// Classifies raw contours and processes the survivors.
    pub fn process_contours(&mut self, contours: &[ContourGeometry]) -> FrameReport {
        let candidates = self.classifier.classify(contours);
        self.process_candidates(&candidates)
    }

    fn process_candidates(&mut self, candidates: &[BlobCandidate]) -> FrameReport {
        // Phase 1: anchors against last frame's grid and window.
        let anchors = pitch_resolver::collect_anchors(candidates, &self.grid, &self.window);
        let calibration = self.grid.update(&anchors);

        let xs: Vec<f64> = candidates.iter().map(BlobCandidate::x).collect();
        let window_left_x = self.window.update(&xs, self.deduper.is_active());

        // Phase 2: pitches against the updated grid and window.
        let events = pitch_resolver::resolve_pitches(candidates, &self.grid, &self.window);
        let transition = self.deduper.observe(&events);

        match &transition {
            ChordTransition::Attack { chord, labels } => {
                info!(chord = %labels.join(" + "), "Playing chord");
                self.tone_engine.play(chord);
            }
            ChordTransition::Release => debug!("Chord released"),
            ChordTransition::Sustain { .. } | ChordTransition::Silent => {}
        }

        debug!(
            candidates = candidates.len(),
            anchors_top = anchors.top_ys.len(),
            anchors_bottom = anchors.bottom_ys.len(),
            events = events.len(),
            window_left_x,
            "Frame processed"
        );

        FrameReport {
            candidate_count: candidates.len(),
            calibration,
            window_left_x,
            events,
            transition,
        }
    }

    /// Adapts grid and window to a new frame size.
    pub fn resize(&mut self, frame_width: u32, frame_height: u32) {
        info!(frame_width, frame_height, "Frame size changed");
        self.frame_width = frame_width;
        self.frame_height = frame_height;
        self.grid.resize(frame_height);
        self.window.resize(frame_width);
    }

    /// Restores every persistent state block to its initial value.
    pub fn reset(&mut self) {
        self.grid.reset();
        self.window.reset();
        self.deduper.reset();
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn regions(&self) -> &[PitchRegion] {
        self.grid.regions()
    }

    pub fn grid(&self) -> &CalibrationGrid {
        &self.grid
    }

    pub fn window(&self) -> &TrackingWindow {
        &self.window
    }

    pub fn active_chord(&self) -> &ChordSet {
        self.deduper.previous()
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }
}
