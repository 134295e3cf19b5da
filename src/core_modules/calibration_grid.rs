// THEORY:
// The `CalibrationGrid` owns the mapping from a vertical pixel position to a
// pitch. It slices the frame into N contiguous horizontal bands, one per entry
// of the `NoteTable`, top of the frame first.
//
// Key architectural principles:
// 1.  **Self-Healing Span**: In dynamic mode the first and last bands are anchor
//     regions. Physical reference markers sitting in those bands tell the grid
//     where its top and bottom really are, so the scale follows the camera when
//     it moves or zooms.
// 2.  **Stubborn Memory**: A reference is only remembered when BOTH anchors are
//     seen in the same frame. A lone anchor still moves the grid for that frame,
//     but it cannot drag the remembered calibration with it.
// 3.  **Atomic Replacement**: The region table is rebuilt in full and swapped in
//     as one value. A degenerate measurement leaves the previous table intact;
//     readers never see a half-built grid.
// 4.  **Exhaustive Bands**: Regions are half-open [min_y, max_y) and share their
//     edges, so any y inside the grid belongs to exactly one region.

use crate::config::{GridConfig, GridMode};
use crate::core_modules::note_table::{AnchorKind, NoteTable};
use tracing::{debug, warn};

/// One band of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchRegion {
    pub index: usize,
    pub label: String,
    /// `None` marks a non-sounding anchor region.
    pub frequency: Option<f64>,
    pub anchor: Option<AnchorKind>,
    pub min_y: f64,
    pub max_y: f64,
    pub mid_y: f64,
}

impl PitchRegion {
    pub fn contains(&self, y: f64) -> bool {
        y >= self.min_y && y < self.max_y
    }

    pub fn is_anchor(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Anchor Y positions observed inside the current window this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorObservations {
    pub top_ys: Vec<f64>,
    pub bottom_ys: Vec<f64>,
}

impl AnchorObservations {
    pub fn record(&mut self, kind: AnchorKind, y: f64) {
        match kind {
            AnchorKind::Top => self.top_ys.push(y),
            AnchorKind::Bottom => self.bottom_ys.push(y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top_ys.is_empty() && self.bottom_ys.is_empty()
    }
}

/// What a grid update did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// The table was rebuilt for this span.
    Recalibrated { top: f64, bottom: f64 },
    /// Static grid; nothing to do.
    Unchanged,
    /// The resolved span was too small; the previous table is kept.
    Degenerate { top: f64, bottom: f64 },
}

/// The grid's persistent state. Replaced, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationState {
    pub regions: Vec<PitchRegion>,
    pub last_known_top: Option<f64>,
    pub last_known_bottom: Option<f64>,
}

pub struct CalibrationGrid {
    mode: GridMode,
    table: NoteTable,
    margin: f64,
    min_span: f64,
    frame_height: f64,
    state: CalibrationState,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl CalibrationGrid {
    pub fn new(config: &GridConfig, table: NoteTable, frame_height: u32) -> Self {
        let mut grid = Self {
            mode: config.mode,
            table,
            margin: config.margin,
            min_span: config.min_span,
            frame_height: frame_height as f64,
            state: CalibrationState {
                regions: Vec::new(),
                last_known_top: None,
                last_known_bottom: None,
            },
        };
        grid.state.regions = grid.initial_regions();
        grid
    }

    pub fn mode(&self) -> GridMode {
        self.mode
    }

    pub fn regions(&self) -> &[PitchRegion] {
        &self.state.regions
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Region total, anchors included.
    pub fn region_count(&self) -> usize {
        self.table.len()
    }

    pub fn default_top(&self) -> f64 {
        self.margin
    }

    pub fn default_bottom(&self) -> f64 {
        self.frame_height - self.margin
    }

    /// The unique region whose band contains `y`, if `y` is on the grid.
    pub fn region_at(&self, y: f64) -> Option<&PitchRegion> {
        self.state.regions.iter().find(|region| region.contains(y))
    }

    /// Feeds one frame's anchor observations into the grid.
    pub fn update(&mut self, observations: &AnchorObservations) -> CalibrationOutcome {
        if self.mode == GridMode::Static {
            return CalibrationOutcome::Unchanged;
        }

        let measured_top = mean(&observations.top_ys);
        let measured_bottom = mean(&observations.bottom_ys);

        let top = measured_top
            .or(self.state.last_known_top)
            .unwrap_or_else(|| self.default_top());
        let bottom = measured_bottom
            .or(self.state.last_known_bottom)
            .unwrap_or_else(|| self.default_bottom());

        if bottom - top < self.min_span {
            debug!(top, bottom, "Degenerate anchor span, keeping previous grid");
            return CalibrationOutcome::Degenerate { top, bottom };
        }

        let (last_known_top, last_known_bottom) = if measured_top.is_some() && measured_bottom.is_some() {
            (Some(top), Some(bottom))
        } else {
            (self.state.last_known_top, self.state.last_known_bottom)
        };

        self.state = CalibrationState {
            regions: self.layout_between_anchors(top, bottom),
            last_known_top,
            last_known_bottom,
        };
        CalibrationOutcome::Recalibrated { top, bottom }
    }

    /// Re-derives defaults for a new frame height. Learned anchors are kept.
    pub fn resize(&mut self, frame_height: u32) {
        self.frame_height = frame_height as f64;
        match self.mode {
            GridMode::Static => self.state.regions = self.static_layout(),
            GridMode::Dynamic => {
                let top = self.state.last_known_top.unwrap_or_else(|| self.default_top());
                let bottom = self.state.last_known_bottom.unwrap_or_else(|| self.default_bottom());
                if bottom - top >= self.min_span {
                    self.state.regions = self.layout_between_anchors(top, bottom);
                }
            }
        }
    }

    /// Forgets everything learned; back to the default margins.
    pub fn reset(&mut self) {
        self.state = CalibrationState {
            regions: self.initial_regions(),
            last_known_top: None,
            last_known_bottom: None,
        };
    }

    fn initial_regions(&self) -> Vec<PitchRegion> {
        match self.mode {
            GridMode::Static => self.static_layout(),
            GridMode::Dynamic => {
                let (top, bottom) = (self.default_top(), self.default_bottom());
                if bottom - top >= self.min_span {
                    self.layout_between_anchors(top, bottom)
                } else {
                    warn!(
                        frame_height = self.frame_height,
                        margin = self.margin,
                        "Frame too short for a dynamic grid; no regions until it grows"
                    );
                    Vec::new()
                }
            }
        }
    }

    /// Static layout: N equal bands from the top margin down to the frame bottom.
    fn static_layout(&self) -> Vec<PitchRegion> {
        let count = self.table.len();
        if count == 0 {
            return Vec::new();
        }
        let step = (self.frame_height - self.margin) / count as f64;
        if step <= 0.0 {
            return Vec::new();
        }
        self.build_regions(self.margin, step)
    }

    /// Dynamic layout: the first band starts at `top`, the last band starts at `bottom`.
    fn layout_between_anchors(&self, top: f64, bottom: f64) -> Vec<PitchRegion> {
        let count = self.table.len();
        if count < 2 {
            return self.build_regions(top, bottom - top);
        }
        let step = (bottom - top) / (count - 1) as f64;
        self.build_regions(top, step)
    }

    fn build_regions(&self, top: f64, step: f64) -> Vec<PitchRegion> {
        self.table
            .slots()
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let min_y = top + index as f64 * step;
                PitchRegion {
                    index,
                    label: slot.label.clone(),
                    frequency: slot.frequency,
                    anchor: slot.anchor,
                    min_y,
                    max_y: min_y + step,
                    mid_y: min_y + step / 2.0,
                }
            })
            .collect()
    }
}
