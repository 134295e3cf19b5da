// THEORY:
// The `ChordDeduper` turns a per-frame stream of pitch events into discrete
// musical transitions. The camera delivers frames at display rate; a marker held
// still for a second would otherwise retrigger its note sixty times.
//
// A frame's events collapse into a `ChordSet` (distinct frequencies, order
// irrelevant). Only a change of set is news: a new non-empty set is an attack, a
// repeated set sustains, and the first empty frame after a chord is a release.

use crate::core_modules::pitch_resolver::PitchEvent;

/// A set of distinct frequencies, kept sorted so equality ignores order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChordSet(Vec<f64>);

impl ChordSet {
    pub fn new(frequencies: impl IntoIterator<Item = f64>) -> Self {
        let mut frequencies: Vec<f64> = frequencies.into_iter().collect();
        frequencies.sort_by(f64::total_cmp);
        frequencies.dedup();
        Self(frequencies)
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What this frame means for the sounding chord.
#[derive(Debug, Clone, PartialEq)]
pub enum ChordTransition {
    /// A new chord started; the tone engine must play it.
    Attack { chord: ChordSet, labels: Vec<String> },
    /// The same chord is still held.
    Sustain { labels: Vec<String> },
    /// The previous chord ended.
    Release,
    /// Nothing sounded before or now.
    Silent,
}

impl ChordTransition {
    pub fn is_attack(&self) -> bool {
        matches!(self, ChordTransition::Attack { .. })
    }
}

#[derive(Debug, Default)]
pub struct ChordDeduper {
    previous: ChordSet,
}

impl ChordDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a chord was sounding after the last observed frame.
    pub fn is_active(&self) -> bool {
        !self.previous.is_empty()
    }

    pub fn previous(&self) -> &ChordSet {
        &self.previous
    }

    /// Compares this frame's events against the previous chord.
    pub fn observe(&mut self, events: &[PitchEvent]) -> ChordTransition {
        let chord = ChordSet::new(events.iter().map(|event| event.frequency));

        if chord.is_empty() {
            if self.previous.is_empty() {
                return ChordTransition::Silent;
            }
            self.previous = ChordSet::default();
            return ChordTransition::Release;
        }

        let labels = distinct_labels(events);
        if chord == self.previous {
            ChordTransition::Sustain { labels }
        } else {
            self.previous = chord.clone();
            ChordTransition::Attack { chord, labels }
        }
    }

    pub fn reset(&mut self) {
        self.previous = ChordSet::default();
    }
}

fn distinct_labels(events: &[PitchEvent]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(events.len());
    for event in events {
        if !labels.contains(&event.label) {
            labels.push(event.label.clone());
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(label: &str, frequency: f64) -> PitchEvent {
        PitchEvent {
            frequency,
            label: label.to_string(),
            position: (0.0, 0.0),
        }
    }

    #[test]
    fn chord_set_ignores_order_and_duplicates() {
        assert_eq!(ChordSet::new([329.6, 261.6, 261.6]), ChordSet::new([261.6, 329.6]));
        assert_eq!(ChordSet::new([261.6, 261.6]).len(), 1);
    }

    #[test]
    fn same_chord_twice_attacks_once() {
        let mut deduper = ChordDeduper::new();
        let frame = [event("C4", 261.6), event("E4", 329.6)];
        assert!(deduper.observe(&frame).is_attack());
        assert!(matches!(deduper.observe(&frame), ChordTransition::Sustain { .. }));
    }

    #[test]
    fn reordered_chord_is_a_sustain() {
        let mut deduper = ChordDeduper::new();
        deduper.observe(&[event("C4", 261.6), event("E4", 329.6)]);
        let transition = deduper.observe(&[event("E4", 329.6), event("C4", 261.6)]);
        assert!(matches!(transition, ChordTransition::Sustain { .. }));
    }

    #[test]
    fn changed_chord_attacks_again() {
        let mut deduper = ChordDeduper::new();
        deduper.observe(&[event("C4", 261.6)]);
        match deduper.observe(&[event("C4", 261.6), event("G4", 392.0)]) {
            ChordTransition::Attack { chord, labels } => {
                assert_eq!(chord.len(), 2);
                assert_eq!(labels, vec!["C4".to_string(), "G4".to_string()]);
            }
            other => panic!("expected attack, got {other:?}"),
        }
    }

    #[test]
    fn silence_releases_once() {
        let mut deduper = ChordDeduper::new();
        assert_eq!(deduper.observe(&[]), ChordTransition::Silent);
        deduper.observe(&[event("A4", 440.0)]);
        assert!(deduper.is_active());
        assert_eq!(deduper.observe(&[]), ChordTransition::Release);
        assert!(!deduper.is_active());
        assert_eq!(deduper.observe(&[]), ChordTransition::Silent);
        // The same chord after a release is news again.
        assert!(deduper.observe(&[event("A4", 440.0)]).is_attack());
    }

    #[test]
    fn duplicate_markers_collapse() {
        let mut deduper = ChordDeduper::new();
        match deduper.observe(&[event("A4", 440.0), event("A4", 440.0)]) {
            ChordTransition::Attack { chord, labels } => {
                assert_eq!(chord.frequencies(), &[440.0]);
                assert_eq!(labels.len(), 1);
            }
            other => panic!("expected attack, got {other:?}"),
        }
    }
}
