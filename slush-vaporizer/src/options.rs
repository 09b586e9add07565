//! Processing options and the preset catalog
//!
//! Every knob is optional. Three layers are combined per knob with
//! [`ProcessingOptions::merge`]: explicit caller options win over
//! style-transfer options, which win over the preset.

use crate::error::{Result, VaporError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default loop length when loop detection is enabled
pub const DEFAULT_LOOP_SECONDS: f64 = 10.0;

/// Loop detection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopDetection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_loop_seconds")]
    pub duration_seconds: f64,
}

fn default_loop_seconds() -> f64 {
    DEFAULT_LOOP_SECONDS
}

impl Default for LoopDetection {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_seconds: DEFAULT_LOOP_SECONDS,
        }
    }
}

/// Named processing knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Bass boost gain (dB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bass_boost: Option<f64>,
    /// Pitch shift (cents)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_shift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oops: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phaser: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_db: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compand: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_ratio: Option<f64>,
    /// Lowpass cutoff (Hz)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowpass_cutoff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_reverb: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_detection: Option<LoopDetection>,
}

impl ProcessingOptions {
    /// Options selecting a preset and nothing else
    pub fn with_preset(name: impl Into<String>) -> Self {
        Self {
            preset: Some(name.into()),
            ..Default::default()
        }
    }

    /// Per-knob `explicit`, else `derived`, else `preset`
    pub fn merge(preset: &Self, derived: &Self, explicit: &Self) -> Self {
        fn pick<T: Clone>(e: &Option<T>, d: &Option<T>, p: &Option<T>) -> Option<T> {
            e.clone().or_else(|| d.clone()).or_else(|| p.clone())
        }

        Self {
            preset: pick(&explicit.preset, &derived.preset, &preset.preset),
            bass_boost: pick(&explicit.bass_boost, &derived.bass_boost, &preset.bass_boost),
            pitch_shift: pick(&explicit.pitch_shift, &derived.pitch_shift, &preset.pitch_shift),
            oops: pick(&explicit.oops, &derived.oops, &preset.oops),
            tremolo: pick(&explicit.tremolo, &derived.tremolo, &preset.tremolo),
            phaser: pick(&explicit.phaser, &derived.phaser, &preset.phaser),
            gain_db: pick(&explicit.gain_db, &derived.gain_db, &preset.gain_db),
            compand: pick(&explicit.compand, &derived.compand, &preset.compand),
            speed_ratio: pick(&explicit.speed_ratio, &derived.speed_ratio, &preset.speed_ratio),
            lowpass_cutoff: pick(
                &explicit.lowpass_cutoff,
                &derived.lowpass_cutoff,
                &preset.lowpass_cutoff,
            ),
            no_reverb: pick(&explicit.no_reverb, &derived.no_reverb, &preset.no_reverb),
            loop_detection: pick(
                &explicit.loop_detection,
                &derived.loop_detection,
                &preset.loop_detection,
            ),
        }
    }

    /// Loop detection settings, if enabled
    pub fn active_loop_detection(&self) -> Option<LoopDetection> {
        self.loop_detection.filter(|l| l.enabled)
    }
}

/// A named options template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub options: ProcessingOptions,
}

/// Immutable name → preset table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetCatalog {
    presets: BTreeMap<String, Preset>,
}

impl PresetCatalog {
    pub fn new(presets: BTreeMap<String, Preset>) -> Self {
        Self { presets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML (one table per preset)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let presets: BTreeMap<String, Preset> = toml::from_str(content)
            .map_err(|e| VaporError::Common(slush_common::Error::from(e)))?;
        Ok(Self::new(presets))
    }

    /// Catalog shipped with the service
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("../presets.toml"))
    }

    /// Load a catalog file; a missing file yields an empty catalog
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let catalog = Self::from_toml_str(&content)?;
                tracing::info!(
                    path = %path.display(),
                    count = catalog.len(),
                    "Loaded preset catalog"
                );
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "Preset file not found, no presets available"
                );
                Ok(Self::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Options for `name`, or empty options when the preset is unknown
    pub fn options_for(&self, name: Option<&str>) -> ProcessingOptions {
        name.and_then(|n| self.get(n))
            .map(|p| p.options.clone())
            .unwrap_or_default()
    }

    /// Name → description
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.presets
            .iter()
            .map(|(name, preset)| (name.clone(), preset.description.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}
