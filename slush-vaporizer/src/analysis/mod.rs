//! Feature analysis
//!
//! Produces an [`AudioFingerprint`] (tempo, key, brightness, spectral width,
//! loudness) for one audio file. The per-frame feature extraction is behind
//! the [`AnalysisToolkit`] trait; [`SpectralToolkit`] is the native
//! implementation.

mod spectral;

pub use spectral::{SpectralToolkit, HOP_LENGTH, N_FFT};

use crate::audio::DecodedAudio;
use crate::error::{Result, VaporError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pitch class (C through B, sharps only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl PitchClass {
    /// Chroma index order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acoustic summary of one audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFingerprint {
    /// Beats per minute, rounded
    pub tempo: f64,
    /// Pitch class with the largest mean chroma energy
    pub key: PitchClass,
    /// Mean spectral centroid (Hz), rounded
    pub brightness: f64,
    /// Mean spectral bandwidth (Hz), rounded
    pub spectral_width: f64,
    /// Mean frame RMS
    pub avg_loudness: f64,
}

/// Per-frame feature extraction primitives
///
/// Every method reports failure as `VaporError::AnalysisFailed`.
pub trait AnalysisToolkit: Send + Sync {
    /// Decode a file to mono samples
    fn load(&self, path: &Path) -> Result<DecodedAudio>;

    /// Global tempo estimate (BPM)
    fn tempo(&self, audio: &DecodedAudio) -> Result<f64>;

    /// Per-frame 12-bin chroma, C first
    fn chroma(&self, audio: &DecodedAudio) -> Result<Vec<[f64; 12]>>;

    /// Per-frame spectral centroid (Hz)
    fn spectral_centroid(&self, audio: &DecodedAudio) -> Result<Vec<f64>>;

    /// Per-frame spectral bandwidth (Hz)
    fn spectral_bandwidth(&self, audio: &DecodedAudio) -> Result<Vec<f64>>;

    /// Per-frame RMS
    fn rms(&self, audio: &DecodedAudio) -> Result<Vec<f64>>;
}

/// Reduces toolkit output to a fingerprint
#[derive(Clone)]
pub struct FeatureAnalyzer {
    toolkit: Arc<dyn AnalysisToolkit>,
}

impl FeatureAnalyzer {
    pub fn new(toolkit: Arc<dyn AnalysisToolkit>) -> Self {
        Self { toolkit }
    }

    /// Analyzer backed by [`SpectralToolkit`]
    pub fn native() -> Self {
        Self::new(Arc::new(SpectralToolkit::new()))
    }

    pub fn analyze(&self, path: &Path) -> Result<AudioFingerprint> {
        let audio = self.toolkit.load(path)?;

        let tempo = finite("tempo", self.toolkit.tempo(&audio)?)?;
        if tempo <= 0.0 {
            return Err(VaporError::AnalysisFailed(format!(
                "Non-positive tempo estimate: {}",
                tempo
            )));
        }

        let chroma = self.toolkit.chroma(&audio)?;
        let key = dominant_pitch_class(&chroma)?;

        let brightness = mean("spectral centroid", &self.toolkit.spectral_centroid(&audio)?)?;
        let spectral_width = mean("spectral bandwidth", &self.toolkit.spectral_bandwidth(&audio)?)?;
        let avg_loudness = mean("rms", &self.toolkit.rms(&audio)?)?;

        let fingerprint = AudioFingerprint {
            tempo: tempo.round(),
            key,
            brightness: brightness.round(),
            spectral_width: spectral_width.round(),
            avg_loudness,
        };

        tracing::debug!(
            path = %path.display(),
            tempo = fingerprint.tempo,
            key = %fingerprint.key,
            brightness = fingerprint.brightness,
            "Fingerprint computed"
        );

        Ok(fingerprint)
    }
}

fn finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(VaporError::AnalysisFailed(format!("Non-finite {}: {}", what, value)))
    }
}

fn mean(what: &str, values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(VaporError::AnalysisFailed(format!("No frames for {}", what)));
    }
    finite(what, values.iter().sum::<f64>() / values.len() as f64)
}

/// Argmax of mean chroma; the lower index wins ties
fn dominant_pitch_class(chroma: &[[f64; 12]]) -> Result<PitchClass> {
    if chroma.is_empty() {
        return Err(VaporError::AnalysisFailed("No chroma frames".into()));
    }

    let mut sums = [0.0f64; 12];
    for frame in chroma {
        for (sum, value) in sums.iter_mut().zip(frame.iter()) {
            *sum += value;
        }
    }

    let mut best = 0;
    for (index, sum) in sums.iter().enumerate() {
        finite("chroma", *sum)?;
        if *sum > sums[best] {
            best = index;
        }
    }

    PitchClass::from_index(best)
        .ok_or_else(|| VaporError::AnalysisFailed(format!("Bad chroma index {}", best)))
}
