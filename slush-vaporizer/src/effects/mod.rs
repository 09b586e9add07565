//! Effect definitions
//!
//! The ten supported effects form a closed enum. Each variant carries its
//! typed parameters and maps to exactly one SoX invocation shape. Effects are
//! built from a name plus a flat `name → number` parameter map; unknown names
//! and unknown parameter keys are rejected when the effect is constructed.

mod executor;

pub use executor::{EffectExecutor, SoxExecutor};

use crate::error::{Result, VaporError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default bass boost gain (dB)
pub const DEFAULT_BASS_GAIN: f64 = 5.0;
/// Default pitch shift (cents)
pub const DEFAULT_PITCH_SHIFT: f64 = -75.0;
/// Default tremolo speed (Hz) and depth (%)
pub const DEFAULT_TREMOLO_FREQ: f64 = 500.0;
pub const DEFAULT_TREMOLO_DEPTH: f64 = 50.0;
/// Default gain (dB)
pub const DEFAULT_GAIN_DB: f64 = 0.0;
/// Default speed ratio
pub const DEFAULT_SPEED_RATIO: f64 = 0.75;
/// Default lowpass cutoff (Hz)
pub const DEFAULT_LOWPASS_CUTOFF: f64 = 3500.0;

/// Fixed phaser coefficients: gain-in, gain-out, delay (ms), decay, speed (Hz)
const PHASER_ARGS: [&str; 6] = ["0.9", "0.8", "2", "0.2", "0.5", "-s"];
/// Fixed compander: attack,decay  soft-knee:transfer  gain  initial-volume  delay
const COMPAND_ARGS: [&str; 5] = ["0.3,1", "6:-70,-60,-20", "-5", "-90", "0.2"];

/// Effect name, without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    BassBoost,
    PitchShift,
    Oops,
    Tremolo,
    Phaser,
    Gain,
    Compand,
    Speed,
    Lowpass,
    Reverb,
}

impl EffectKind {
    /// All kinds, in chain order
    pub const ALL: [EffectKind; 10] = [
        EffectKind::BassBoost,
        EffectKind::PitchShift,
        EffectKind::Oops,
        EffectKind::Tremolo,
        EffectKind::Phaser,
        EffectKind::Gain,
        EffectKind::Compand,
        EffectKind::Speed,
        EffectKind::Lowpass,
        EffectKind::Reverb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::BassBoost => "bass_boost",
            EffectKind::PitchShift => "pitch_shift",
            EffectKind::Oops => "oops",
            EffectKind::Tremolo => "tremolo",
            EffectKind::Phaser => "phaser",
            EffectKind::Gain => "gain",
            EffectKind::Compand => "compand",
            EffectKind::Speed => "speed",
            EffectKind::Lowpass => "lowpass",
            EffectKind::Reverb => "reverb",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = VaporError;

    fn from_str(s: &str) -> Result<Self> {
        EffectKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| VaporError::InvalidRequest(format!("Unknown effect: {}", s)))
    }
}

/// Reverb parameters (SoX `reverb` positional arguments)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReverbParams {
    pub reverberance: f64,
    pub hf_damping: f64,
    pub room_scale: f64,
    pub stereo_depth: f64,
    pub pre_delay: f64,
    pub wet_gain: f64,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            reverberance: 50.0,
            hf_damping: 50.0,
            room_scale: 100.0,
            stereo_depth: 100.0,
            pre_delay: 20.0,
            wet_gain: 0.0,
        }
    }
}

/// One effect invocation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Effect {
    BassBoost { gain: f64 },
    PitchShift { shift: f64 },
    Oops,
    Tremolo { freq: f64, depth: f64 },
    Phaser,
    Gain { db: f64 },
    Compand,
    Speed { ratio: f64 },
    Lowpass { cutoff: f64 },
    Reverb(ReverbParams),
}

impl Effect {
    /// Build an effect from its name and a flat parameter map
    ///
    /// Missing parameters take their defaults. Unknown names, unknown keys and
    /// non-finite values are rejected as `InvalidRequest`.
    pub fn from_name_and_params(name: &str, params: &HashMap<String, f64>) -> Result<Self> {
        let kind: EffectKind = name.parse()?;
        let mut reader = ParamReader::new(kind, params);

        let effect = match kind {
            EffectKind::BassBoost => Effect::BassBoost {
                gain: reader.take("gain", DEFAULT_BASS_GAIN)?,
            },
            EffectKind::PitchShift => Effect::PitchShift {
                shift: reader.take("shift", DEFAULT_PITCH_SHIFT)?,
            },
            EffectKind::Oops => Effect::Oops,
            EffectKind::Tremolo => Effect::Tremolo {
                freq: reader.take("freq", DEFAULT_TREMOLO_FREQ)?,
                depth: reader.take("depth", DEFAULT_TREMOLO_DEPTH)?,
            },
            EffectKind::Phaser => Effect::Phaser,
            EffectKind::Gain => Effect::Gain {
                db: reader.take("db", DEFAULT_GAIN_DB)?,
            },
            EffectKind::Compand => Effect::Compand,
            EffectKind::Speed => Effect::Speed {
                ratio: reader.take("ratio", DEFAULT_SPEED_RATIO)?,
            },
            EffectKind::Lowpass => Effect::Lowpass {
                cutoff: reader.take("cutoff", DEFAULT_LOWPASS_CUTOFF)?,
            },
            EffectKind::Reverb => {
                let d = ReverbParams::default();
                Effect::Reverb(ReverbParams {
                    reverberance: reader.take("reverberance", d.reverberance)?,
                    hf_damping: reader.take("hf_damping", d.hf_damping)?,
                    room_scale: reader.take("room_scale", d.room_scale)?,
                    stereo_depth: reader.take("stereo_depth", d.stereo_depth)?,
                    pre_delay: reader.take("pre_delay", d.pre_delay)?,
                    wet_gain: reader.take("wet_gain", d.wet_gain)?,
                })
            }
        };

        reader.finish()?;
        Ok(effect)
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::BassBoost { .. } => EffectKind::BassBoost,
            Effect::PitchShift { .. } => EffectKind::PitchShift,
            Effect::Oops => EffectKind::Oops,
            Effect::Tremolo { .. } => EffectKind::Tremolo,
            Effect::Phaser => EffectKind::Phaser,
            Effect::Gain { .. } => EffectKind::Gain,
            Effect::Compand => EffectKind::Compand,
            Effect::Speed { .. } => EffectKind::Speed,
            Effect::Lowpass { .. } => EffectKind::Lowpass,
            Effect::Reverb(_) => EffectKind::Reverb,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// SoX effect arguments (everything after `sox <in> <out>`)
    pub fn sox_args(&self) -> Vec<String> {
        match self {
            Effect::BassBoost { gain } => vec!["bass".into(), num(*gain)],
            Effect::PitchShift { shift } => vec!["pitch".into(), num(*shift)],
            Effect::Oops => vec!["oops".into()],
            Effect::Tremolo { freq, depth } => vec!["tremolo".into(), num(*freq), num(*depth)],
            Effect::Phaser => std::iter::once("phaser")
                .chain(PHASER_ARGS)
                .map(String::from)
                .collect(),
            Effect::Gain { db } => vec!["gain".into(), num(*db)],
            Effect::Compand => std::iter::once("compand")
                .chain(COMPAND_ARGS)
                .map(String::from)
                .collect(),
            Effect::Speed { ratio } => vec!["speed".into(), num(*ratio)],
            Effect::Lowpass { cutoff } => vec!["lowpass".into(), num(*cutoff), "0.707q".into()],
            Effect::Reverb(p) => vec![
                "reverb".into(),
                num(p.reverberance),
                num(p.hf_damping),
                num(p.room_scale),
                num(p.stereo_depth),
                num(p.pre_delay),
                num(p.wet_gain),
            ],
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sox_args().join(" "))
    }
}

fn num(value: f64) -> String {
    format!("{}", value)
}

/// Consumes known keys from a parameter map and reports the leftovers
struct ParamReader<'a> {
    kind: EffectKind,
    params: &'a HashMap<String, f64>,
    consumed: Vec<&'static str>,
}

impl<'a> ParamReader<'a> {
    fn new(kind: EffectKind, params: &'a HashMap<String, f64>) -> Self {
        Self {
            kind,
            params,
            consumed: Vec::new(),
        }
    }

    fn take(&mut self, key: &'static str, default: f64) -> Result<f64> {
        self.consumed.push(key);
        match self.params.get(key) {
            None => Ok(default),
            Some(v) if v.is_finite() => Ok(*v),
            Some(v) => Err(VaporError::InvalidRequest(format!(
                "Parameter {} of {} must be finite, got {}",
                key, self.kind, v
            ))),
        }
    }

    fn finish(self) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .params
            .keys()
            .map(String::as_str)
            .filter(|k| !self.consumed.contains(k))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(VaporError::InvalidRequest(format!(
            "Unknown parameter(s) for {}: {}",
            self.kind,
            unknown.join(", ")
        )))
    }
}
