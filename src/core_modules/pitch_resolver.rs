// THEORY:
// The `PitchResolver` is where geometry becomes music. It intersects the frame's
// marker candidates with the tracking window (which markers are eligible) and the
// calibration grid (which band each eligible marker sits in).
//
// It runs as two folds over the same cached candidate list:
// 1.  **Anchor Collection**: against the grid and window as they stood after the
//     previous frame, gather the Y of every eligible marker that sits in an
//     anchor band. These observations drive the grid update.
// 2.  **Pitch Resolution**: after the grid and window have been updated, scan
//     again and emit a pitch for every eligible marker in a sounding band.
//
// The second pass is what lets a recalibration take effect in the same frame
// that measured it, with no one-frame lag.

use crate::core_modules::blob_classifier::BlobCandidate;
use crate::core_modules::calibration_grid::{AnchorObservations, CalibrationGrid};
use crate::core_modules::tracking_window::TrackingWindow;

/// A sounding marker in the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEvent {
    pub frequency: f64,
    pub label: String,
    pub position: (f64, f64),
}

/// Phase 1: anchor observations from eligible candidates.
pub fn collect_anchors(
    candidates: &[BlobCandidate],
    grid: &CalibrationGrid,
    window: &TrackingWindow,
) -> AnchorObservations {
    candidates
        .iter()
        .filter(|candidate| window.contains(candidate.x()))
        .fold(AnchorObservations::default(), |mut observations, candidate| {
            if let Some(kind) = grid.region_at(candidate.y()).and_then(|region| region.anchor) {
                observations.record(kind, candidate.y());
            }
            observations
        })
}

/// Phase 2: pitch events from eligible candidates in sounding regions.
pub fn resolve_pitches(
    candidates: &[BlobCandidate],
    grid: &CalibrationGrid,
    window: &TrackingWindow,
) -> Vec<PitchEvent> {
    candidates
        .iter()
        .filter(|candidate| window.contains(candidate.x()))
        .filter_map(|candidate| {
            let region = grid.region_at(candidate.y())?;
            let frequency = region.frequency?;
            Some(PitchEvent {
                frequency,
                label: region.label.clone(),
                position: candidate.centroid,
            })
        })
        .collect()
}
