// THEORY:
// The `NoteTable` is the musical vocabulary of the controller. It is the ordered,
// top-to-bottom list of regions the calibration grid lays out on screen. Each
// entry is a label plus a MIDI note number; the two optional anchor entries that
// bracket the table carry no pitch and exist only so the grid can find its own
// vertical span in the image.
//
// The table is static configuration. It never changes while the pipeline runs;
// only the pixel positions the grid assigns to each entry do.

use serde::{Deserialize, Serialize};

pub const ANCHOR_TOP_LABEL: &str = "ANCHOR_TOP";
pub const ANCHOR_BOTTOM_LABEL: &str = "ANCHOR_BOTTOM";

/// Concert pitch reference: A4 = MIDI 69 = 440 Hz.
const A4_MIDI: f64 = 69.0;
const A4_FREQUENCY: f64 = 440.0;

/// Converts a MIDI note number to its equal-tempered frequency in Hz.
pub fn midi_to_frequency(midi: u8) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((midi as f64 - A4_MIDI) / 12.0)
}

/// Which end of the grid an anchor entry marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    Top,
    Bottom,
}

/// One sounding note of the configured scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub label: String,
    pub midi: u8,
}

impl NoteEntry {
    pub fn new(label: impl Into<String>, midi: u8) -> Self {
        Self {
            label: label.into(),
            midi,
        }
    }
}

/// A resolved table slot: either a sounding note or an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSlot {
    pub label: String,
    /// `None` for anchors.
    pub frequency: Option<f64>,
    pub anchor: Option<AnchorKind>,
}

/// The ordered list of grid slots, top of the frame first.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteTable {
    slots: Vec<TableSlot>,
}

impl NoteTable {
    /// Builds a table from notes, bracketing it with anchors when asked.
    pub fn new(notes: &[NoteEntry], with_anchors: bool) -> Self {
        let mut slots = Vec::with_capacity(notes.len() + 2);
        if with_anchors {
            slots.push(TableSlot {
                label: ANCHOR_TOP_LABEL.to_string(),
                frequency: None,
                anchor: Some(AnchorKind::Top),
            });
        }
        slots.extend(notes.iter().map(|note| TableSlot {
            label: note.label.clone(),
            frequency: Some(midi_to_frequency(note.midi)),
            anchor: None,
        }));
        if with_anchors {
            slots.push(TableSlot {
                label: ANCHOR_BOTTOM_LABEL.to_string(),
                frequency: None,
                anchor: Some(AnchorKind::Bottom),
            });
        }
        Self { slots }
    }

    pub fn slots(&self) -> &[TableSlot] {
        &self.slots
    }

    /// Total region count, anchors included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The scale the controller ships with: C4 up to B6, fifteen notes.
pub fn default_notes() -> Vec<NoteEntry> {
    [
        ("C4", 60),
        ("D4", 62),
        ("E4", 64),
        ("F4", 65),
        ("G4", 67),
        ("A4", 69),
        ("B4", 71),
        ("C5", 72),
        ("D5", 74),
        ("E5", 76),
        ("F5", 77),
        ("G5", 79),
        ("A5", 81),
        ("C6", 84),
        ("B6", 95),
    ]
    .into_iter()
    .map(|(label, midi)| NoteEntry::new(label, midi))
    .collect()
}
