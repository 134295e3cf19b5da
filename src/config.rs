//! Runtime configuration for the pitch pipeline
//!
//! Every field has a default so an empty TOML file is a valid configuration.
//! The three strategy axes (detection, grid, window) are independent enums.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_modules::blob_classifier::ClassifierThresholds;
use crate::core_modules::note_table::{NoteEntry, NoteTable, default_notes};
use crate::error::{PitchError, Result};

/// Physical marker shape; selects the classifier's default thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerProfile {
    #[default]
    Round,
    Square,
}

/// How foreground pixels are separated from the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStrategy {
    /// Dark marker on a light background.
    #[default]
    Grayscale,
    /// Saturated marker of a known hue.
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GridMode {
    /// Fixed layout from the frame height.
    Static,
    /// Re-derived every frame from the anchor markers.
    #[default]
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Centered on the frame.
    #[default]
    Fixed,
    /// Smoothed toward the detected markers.
    Tracking,
}

/// Marker shape profile plus optional per-threshold overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MarkerConfig {
    pub profile: MarkerProfile,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    pub aspect_min: Option<f64>,
    pub aspect_max: Option<f64>,
    pub solidity_min: Option<f64>,
}

impl MarkerConfig {
    /// Profile defaults with any overrides applied.
    pub fn thresholds(&self) -> ClassifierThresholds {
        let base = ClassifierThresholds::for_profile(self.profile);
        ClassifierThresholds {
            area_min: self.area_min.unwrap_or(base.area_min),
            area_max: self.area_max.unwrap_or(base.area_max),
            aspect_min: self.aspect_min.unwrap_or(base.aspect_min),
            aspect_max: self.aspect_max.unwrap_or(base.aspect_max),
            solidity_min: self.solidity_min.unwrap_or(base.solidity_min),
        }
    }
}

/// Preprocessing parameters for the image contour extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub strategy: DetectionStrategy,
    /// Luma below this value is foreground in grayscale mode.
    pub gray_threshold: u8,
    /// Hue band center on the 0..180 scale.
    pub hue_center: u8,
    /// Half-width of the hue band.
    pub hue_tolerance: u8,
    /// Minimum HSV saturation (0..255) for color mode.
    pub saturation_min: u8,
    /// Minimum HSV value (0..255) for color mode.
    pub value_min: u8,
    /// L-infinity radius of the erosion; 0 disables it.
    pub erode_radius: u8,
    /// L-infinity radius of the dilation after erosion in color mode; 0 disables it.
    pub dilate_radius: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::Grayscale,
            gray_threshold: 120,
            hue_center: 0,
            hue_tolerance: 10,
            saturation_min: 100,
            value_min: 80,
            erode_radius: 1,
            dilate_radius: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub mode: GridMode,
    /// Default distance of the grid from the frame's top and bottom edges.
    pub margin: f64,
    /// Anchor spans smaller than this are rejected as degenerate.
    pub min_span: f64,
    /// Bracket the note table with the two anchor regions.
    pub anchors: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            mode: GridMode::Dynamic,
            margin: 10.0,
            min_span: 5.0,
            anchors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub mode: WindowMode,
    pub width: f64,
    /// Smoothing factor toward the detected markers, in (0, 1].
    pub alpha: f64,
    /// Much smaller factor used to drift back to the center while idle.
    pub idle_relax: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            mode: WindowMode::Fixed,
            width: 20.0,
            alpha: 0.1,
            idle_relax: 0.005,
        }
    }
}

/// Envelope and sample rate for the sine tone engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub sample_rate: u32,
    pub attack_ms: f64,
    pub decay_ms: f64,
    pub duration_ms: f64,
    pub peak_gain: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            attack_ms: 5.0,
            decay_ms: 100.0,
            duration_ms: 150.0,
            peak_gain: 0.5,
        }
    }
}

/// Top-level configuration for a `PitchPipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub marker: MarkerConfig,
    pub detection: DetectionConfig,
    pub grid: GridConfig,
    pub window: WindowConfig,
    pub tone: ToneConfig,
    /// Sounding notes, top of the frame first.
    pub notes: Vec<NoteEntry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            marker: MarkerConfig::default(),
            detection: DetectionConfig::default(),
            grid: GridConfig::default(),
            window: WindowConfig::default(),
            tone: ToneConfig::default(),
            notes: default_notes(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The region table this configuration lays out.
    pub fn note_table(&self) -> NoteTable {
        NoteTable::new(&self.notes, self.grid.anchors)
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.notes.is_empty() {
            return Err(PitchError::config("note table is empty"));
        }
        if self.grid.mode == GridMode::Dynamic && !self.grid.anchors {
            return Err(PitchError::config(
                "dynamic grid mode needs anchor regions (grid.anchors = true)",
            ));
        }
        if !(self.grid.margin >= 0.0) {
            return Err(PitchError::config("grid.margin must be non-negative"));
        }
        if !(self.grid.min_span > 0.0) {
            return Err(PitchError::config("grid.min_span must be positive"));
        }
        if !(self.window.width > 0.0) {
            return Err(PitchError::config("window.width must be positive"));
        }
        if !(self.window.alpha > 0.0 && self.window.alpha <= 1.0) {
            return Err(PitchError::config(format!(
                "window.alpha must be in (0, 1], got {}",
                self.window.alpha
            )));
        }
        if !(self.window.idle_relax >= 0.0 && self.window.idle_relax <= 1.0) {
            return Err(PitchError::config("window.idle_relax must be in [0, 1]"));
        }
        if self.detection.hue_center > 180 || self.detection.hue_tolerance > 90 {
            return Err(PitchError::config(
                "hue_center must be in 0..=180 and hue_tolerance in 0..=90",
            ));
        }

        let t = self.marker.thresholds();
        if !(t.area_min >= 0.0 && t.area_min <= t.area_max) {
            return Err(PitchError::config(format!(
                "marker area range [{}, {}] is inverted",
                t.area_min, t.area_max
            )));
        }
        if !(t.aspect_min > 0.0 && t.aspect_min <= t.aspect_max) {
            return Err(PitchError::config(format!(
                "marker aspect range [{}, {}] is invalid",
                t.aspect_min, t.aspect_max
            )));
        }
        if !(0.0..=1.0).contains(&t.solidity_min) {
            return Err(PitchError::config("marker.solidity_min must be in [0, 1]"));
        }

        let tone = &self.tone;
        if tone.sample_rate == 0 {
            return Err(PitchError::config("tone.sample_rate must be positive"));
        }
        if !(tone.attack_ms >= 0.0 && tone.attack_ms <= tone.decay_ms && tone.decay_ms <= tone.duration_ms) {
            return Err(PitchError::config(
                "tone envelope must satisfy attack_ms <= decay_ms <= duration_ms",
            ));
        }
        Ok(())
    }
}
