// THEORY:
// The `ToneTrigger` is the pipeline's only way out into sound. The frame loop
// calls `play` with a chord and moves on; it never waits for audio.
//
// `SynthToneEngine` is an actor: a tokio task owns the synthesis state and
// receives messages over an unbounded channel, so `play` is a non-blocking
// send. Like a browser audio context, the engine starts suspended. While
// suspended it holds on to the most recent chord only and renders it on
// resume; older chords are stale by then. A suspended engine is never an
// error for the caller.
//
// Each chord renders as a mix of short sine voices with a fast linear attack
// and a linear decay, then goes to a `ToneSink`.

use crate::config::ToneConfig;
use crate::core_modules::chord_deduper::ChordSet;
use std::f64::consts::TAU;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Anything that can sound a chord. Must not block the caller.
pub trait ToneEngine: Send + Sync {
    fn play(&self, chord: &ChordSet);
}

/// Linear attack/decay envelope, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneEnvelope {
    pub attack: f64,
    pub decay: f64,
    pub duration: f64,
    pub peak_gain: f32,
}

impl ToneEnvelope {
    pub fn from_config(config: &ToneConfig) -> Self {
        Self {
            attack: config.attack_ms / 1000.0,
            decay: config.decay_ms / 1000.0,
            duration: config.duration_ms / 1000.0,
            peak_gain: config.peak_gain,
        }
    }

    /// Gain at time `t` seconds after the note starts.
    pub fn gain_at(&self, t: f64) -> f32 {
        let peak = self.peak_gain as f64;
        let gain = if t < 0.0 || t >= self.decay {
            0.0
        } else if t < self.attack {
            peak * t / self.attack
        } else {
            peak * (1.0 - (t - self.attack) / (self.decay - self.attack))
        };
        gain as f32
    }
}

impl Default for ToneEnvelope {
    fn default() -> Self {
        Self::from_config(&ToneConfig::default())
    }
}

/// Renders one enveloped sine voice.
pub fn render_tone(frequency: f64, sample_rate: u32, envelope: &ToneEnvelope) -> Vec<f32> {
    let sample_rate = sample_rate as f64;
    let length = (envelope.duration * sample_rate).round() as usize;
    (0..length)
        .map(|i| {
            let t = i as f64 / sample_rate;
            envelope.gain_at(t) * (TAU * frequency * t).sin() as f32
        })
        .collect()
}

/// Mixes one voice per frequency into a single buffer.
pub fn render_chord(chord: &ChordSet, sample_rate: u32, envelope: &ToneEnvelope) -> Vec<f32> {
    let mut mix = vec![0.0f32; (envelope.duration * sample_rate as f64).round() as usize];
    for &frequency in chord.frequencies() {
        for (out, sample) in mix.iter_mut().zip(render_tone(frequency, sample_rate, envelope)) {
            *out += sample;
        }
    }
    mix
}

/// A rendered chord ready for output.
#[derive(Debug, Clone)]
pub struct RenderedChord {
    pub frequencies: Vec<f64>,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl RenderedChord {
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

/// Destination for rendered audio.
pub trait ToneSink: Send + 'static {
    fn submit(&mut self, rendered: RenderedChord);
}

/// Logs every rendered chord instead of playing it.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ToneSink for TracingSink {
    fn submit(&mut self, rendered: RenderedChord) {
        info!(
            frequencies = ?rendered.frequencies,
            duration_ms = rendered.duration_ms(),
            peak = rendered.peak(),
            "Rendered chord"
        );
    }
}

/// Message type for the synthesis actor
enum ToneMessage {
    Play(ChordSet),
    Resume,
    Suspend,
    Shutdown,
}

/// Sine synthesizer running on its own tokio task.
pub struct SynthToneEngine {
    sender: mpsc::UnboundedSender<ToneMessage>,
}

impl SynthToneEngine {
    /// Spawns the actor task, suspended. Must be called inside a tokio runtime.
    pub fn spawn<S: ToneSink>(config: &ToneConfig, mut sink: S) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ToneMessage>();
        let sample_rate = config.sample_rate;
        let envelope = ToneEnvelope::from_config(config);

        tokio::spawn(async move {
            let mut active = false;
            let mut pending: Option<ChordSet> = None;
            let render = |chord: ChordSet, sink: &mut S| {
                let samples = render_chord(&chord, sample_rate, &envelope);
                sink.submit(RenderedChord {
                    frequencies: chord.frequencies().to_vec(),
                    sample_rate,
                    samples,
                });
            };

            while let Some(message) = receiver.recv().await {
                match message {
                    ToneMessage::Play(chord) if active => render(chord, &mut sink),
                    ToneMessage::Play(chord) => {
                        debug!(voices = chord.len(), "Engine suspended, deferring chord");
                        pending = Some(chord);
                    }
                    ToneMessage::Resume => {
                        active = true;
                        if let Some(chord) = pending.take() {
                            render(chord, &mut sink);
                        }
                    }
                    ToneMessage::Suspend => active = false,
                    ToneMessage::Shutdown => break,
                }
            }
            debug!("Tone engine stopped");
        });

        Self { sender }
    }

    /// Starts rendering, beginning with the last chord deferred while suspended.
    pub fn resume(&self) {
        self.send(ToneMessage::Resume);
    }

    /// Stops rendering; later chords are deferred until `resume`.
    pub fn suspend(&self) {
        self.send(ToneMessage::Suspend);
    }

    pub fn shutdown(&self) {
        self.send(ToneMessage::Shutdown);
    }

    fn send(&self, message: ToneMessage) {
        if self.sender.send(message).is_err() {
            warn!("Tone engine task is gone; message dropped");
        }
    }
}

impl ToneEngine for SynthToneEngine {
    fn play(&self, chord: &ChordSet) {
        self.send(ToneMessage::Play(chord.clone()));
    }
}

impl Drop for SynthToneEngine {
    fn drop(&mut self) {
        // Best effort shutdown on drop
        let _ = self.sender.send(ToneMessage::Shutdown);
    }
}
