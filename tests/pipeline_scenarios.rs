//! End-to-end frame scenarios through `PitchPipeline`, with a recording tone engine.

use std::sync::{Arc, Mutex};

use pitch_vision::config::{GridMode, PipelineConfig, WindowMode};
use pitch_vision::core_modules::blob_classifier::{BoundingBox, ContourGeometry};
use pitch_vision::core_modules::calibration_grid::CalibrationOutcome;
use pitch_vision::core_modules::chord_deduper::{ChordSet, ChordTransition};
use pitch_vision::core_modules::contour_extractor::ContourExtractor;
use pitch_vision::core_modules::tone_trigger::ToneEngine;
use pitch_vision::{PitchError, PitchPipeline};

use image::RgbaImage;

#[derive(Default)]
struct RecordingEngine {
    played: Mutex<Vec<ChordSet>>,
}

impl RecordingEngine {
    fn played(&self) -> Vec<ChordSet> {
        self.played.lock().unwrap().clone()
    }
}

impl ToneEngine for RecordingEngine {
    fn play(&self, chord: &ChordSet) {
        self.played.lock().unwrap().push(chord.clone());
    }
}

/// An extractor that fails on every frame.
struct GlitchingSensor;

impl ContourExtractor for GlitchingSensor {
    fn extract(&self, _frame: &RgbaImage) -> pitch_vision::Result<Vec<ContourGeometry>> {
        Err(PitchError::Extraction("sensor glitch".into()))
    }
}

/// A solid 20x20 marker centered on (x, y).
fn marker(x: f64, y: f64) -> ContourGeometry {
    ContourGeometry {
        bounding_box: BoundingBox {
            x: (x - 10.0) as u32,
            y: (y - 10.0) as u32,
            width: 20,
            height: 20,
        },
        area: 300.0,
        hull_area: 310.0,
    }
}

fn pipeline(config: PipelineConfig, width: u32, height: u32) -> (PitchPipeline, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::default());
    let pipeline = PitchPipeline::new(config, width, height, engine.clone()).unwrap();
    (pipeline, engine)
}

#[test]
fn static_grid_on_a_310_pixel_frame_uses_20_pixel_steps() {
    let mut config = PipelineConfig::default();
    config.grid.mode = GridMode::Static;
    config.grid.anchors = false;
    let (pipeline, _) = pipeline(config, 640, 310);

    let regions = pipeline.regions();
    assert_eq!(regions.len(), 15);
    assert_eq!(regions[0].min_y, 10.0);
    assert_eq!(regions[0].max_y, 30.0);
    assert_eq!(regions[0].mid_y, 20.0);
}

#[test]
fn anchors_stretch_the_grid_over_two_frames() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 460);
    // Defaults: top band starts at 10, bottom band at 450.
    assert_eq!(pipeline.regions()[16].min_y, 450.0);

    let report = pipeline.process_contours(&[marker(320.0, 30.0), marker(320.0, 450.0)]);
    assert_eq!(report.calibration, CalibrationOutcome::Recalibrated { top: 30.0, bottom: 450.0 });

    let report = pipeline.process_contours(&[marker(320.0, 50.0), marker(320.0, 450.0)]);
    assert_eq!(report.calibration, CalibrationOutcome::Recalibrated { top: 50.0, bottom: 450.0 });

    let regions = pipeline.regions();
    assert_eq!(regions.len(), 17);
    assert_eq!((regions[0].min_y, regions[0].max_y), (50.0, 75.0));
    assert_eq!((regions[16].min_y, regions[16].max_y), (450.0, 475.0));
    // Anchor markers never sound.
    assert!(engine.played().is_empty());
}

#[test]
fn recalibration_applies_to_the_frame_that_measured_it() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 460);
    // Default grid (step 27.5) would put y=80 in D4; the measured span (step 26.25) puts it in C4.
    assert_eq!(pipeline.grid().region_at(80.0).unwrap().label, "D4");

    let report = pipeline.process_contours(&[marker(320.0, 30.0), marker(320.0, 450.0), marker(320.0, 80.0)]);

    assert_eq!(report.calibration, CalibrationOutcome::Recalibrated { top: 30.0, bottom: 450.0 });
    let labels: Vec<&str> = report.events.iter().map(|event| event.label.as_str()).collect();
    assert_eq!(labels, vec!["C4"]);
    assert_eq!(engine.played().len(), 1);
}

#[test]
fn dynamic_grid_needs_room_between_the_margins() {
    let engine: Arc<RecordingEngine> = Arc::new(RecordingEngine::default());
    let result = PitchPipeline::new(PipelineConfig::default(), 640, 24, engine.clone());
    assert!(matches!(result, Err(PitchError::Config(_))));

    let mut config = PipelineConfig::default();
    config.grid.mode = GridMode::Static;
    assert!(PitchPipeline::new(config, 640, 24, engine).is_ok());
}

#[test]
fn held_marker_plays_once() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 480);
    let c4 = pipeline.regions()[1].clone();
    assert_eq!(c4.label, "C4");

    let first = pipeline.process_contours(&[marker(320.0, c4.mid_y)]);
    let second = pipeline.process_contours(&[marker(320.0, c4.mid_y)]);

    assert!(first.triggered());
    assert!(matches!(second.transition, ChordTransition::Sustain { .. }));
    let played = engine.played();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].frequencies(), &[c4.frequency.unwrap()]);
}

#[test]
fn two_markers_play_one_chord() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 480);
    let c4 = pipeline.regions()[1].mid_y;
    let e4 = pipeline.regions()[3].mid_y;

    let report = pipeline.process_contours(&[marker(315.0, c4), marker(325.0, e4)]);

    assert_eq!(report.events.len(), 2);
    let played = engine.played();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].len(), 2);
}

#[test]
fn release_then_same_note_plays_again() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 480);
    let g4 = pipeline.regions()[5].mid_y;

    pipeline.process_contours(&[marker(320.0, g4)]);
    let released = pipeline.process_empty_frame();
    assert_eq!(released.transition, ChordTransition::Release);
    assert!(pipeline.active_chord().is_empty());

    pipeline.process_contours(&[marker(320.0, g4)]);
    assert_eq!(engine.played().len(), 2);
}

#[test]
fn markers_outside_the_window_are_ignored() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 480);
    let c4 = pipeline.regions()[1].mid_y;

    // Window is [310, 330).
    let report = pipeline.process_contours(&[marker(100.0, c4), marker(330.0, c4)]);

    assert_eq!(report.candidate_count, 2);
    assert!(report.events.is_empty());
    assert_eq!(report.transition, ChordTransition::Silent);
    assert!(engine.played().is_empty());
}

#[test]
fn rejected_shapes_never_reach_the_resolver() {
    let (mut pipeline, engine) = pipeline(PipelineConfig::default(), 640, 480);
    let c4 = pipeline.regions()[1].mid_y;

    let mut stroke = marker(320.0, c4);
    stroke.bounding_box.width = 80;
    let mut ragged = marker(320.0, c4);
    ragged.hull_area = 600.0;

    let report = pipeline.process_contours(&[stroke, ragged]);
    assert_eq!(report.candidate_count, 0);
    assert!(engine.played().is_empty());
}

#[test]
fn tracking_window_follows_and_stays_in_frame() {
    let mut config = PipelineConfig::default();
    config.window.mode = WindowMode::Tracking;
    config.window.alpha = 1.0;
    let (mut pipeline, _) = pipeline(config, 640, 480);
    let c4 = pipeline.regions()[1].mid_y;

    let report = pipeline.process_contours(&[marker(200.0, c4)]);
    assert_eq!(report.window_left_x, 190.0);
    // The window moved before resolution, so the marker sounds this frame.
    assert!(report.triggered());

    let report = pipeline.process_contours(&[marker(635.0, c4)]);
    assert_eq!(report.window_left_x, 620.0);
    let report = pipeline.process_contours(&[marker(2.0, c4)]);
    assert_eq!(report.window_left_x, 0.0);
}

#[test]
fn reset_forgets_calibration_and_chord() {
    let (mut pipeline, _) = pipeline(PipelineConfig::default(), 640, 460);
    let defaults = pipeline.regions().to_vec();

    pipeline.process_contours(&[marker(320.0, 30.0), marker(320.0, 450.0)]);
    let d4 = pipeline.regions()[2].mid_y;
    pipeline.process_contours(&[marker(320.0, d4)]);
    assert_ne!(pipeline.regions(), defaults.as_slice());
    assert!(!pipeline.active_chord().is_empty());

    pipeline.reset();
    assert_eq!(pipeline.regions(), defaults.as_slice());
    assert!(pipeline.active_chord().is_empty());
    assert_eq!(pipeline.grid().state().last_known_top, None);
}

#[test]
fn static_grid_ignores_anchor_markers() {
    let mut config = PipelineConfig::default();
    config.grid.mode = GridMode::Static;
    let (mut pipeline, _) = pipeline(config, 640, 480);
    let before = pipeline.regions().to_vec();

    let report = pipeline.process_contours(&[marker(320.0, before[0].mid_y)]);
    assert_eq!(report.calibration, CalibrationOutcome::Unchanged);
    assert_eq!(pipeline.regions(), before.as_slice());
}

#[test]
fn extraction_failure_is_recoverable_and_leaves_state_alone() {
    let engine = Arc::new(RecordingEngine::default());
    let mut pipeline = PitchPipeline::with_extractor(
        PipelineConfig::default(),
        640,
        480,
        Box::new(GlitchingSensor),
        engine.clone(),
    )
    .unwrap();
    let c4 = pipeline.regions()[1].mid_y;
    pipeline.process_contours(&[marker(320.0, c4)]);

    let err = pipeline.process_frame(&RgbaImage::new(640, 480)).unwrap_err();
    assert!(err.is_recoverable());
    assert!(!pipeline.active_chord().is_empty());

    let report = pipeline.process_empty_frame();
    assert_eq!(report.transition, ChordTransition::Release);
    assert_eq!(engine.played().len(), 1);
}
