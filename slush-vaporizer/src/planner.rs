//! Effect chain planning
//!
//! Turns resolved [`ProcessingOptions`] into the ordered effect list. The
//! order is fixed; an option only decides whether its effect is present.

use crate::effects::{Effect, ReverbParams, DEFAULT_TREMOLO_DEPTH, DEFAULT_TREMOLO_FREQ};
use crate::options::ProcessingOptions;

/// Ordered effects, applied left to right
pub type EffectChain = Vec<Effect>;

/// Build the chain for already-merged options
pub fn plan(options: &ProcessingOptions) -> EffectChain {
    let mut chain = Vec::new();

    if let Some(gain) = non_zero(options.bass_boost) {
        chain.push(Effect::BassBoost { gain });
    }
    if let Some(shift) = non_zero(options.pitch_shift) {
        chain.push(Effect::PitchShift { shift });
    }
    if enabled(options.oops) {
        chain.push(Effect::Oops);
    }
    if enabled(options.tremolo) {
        chain.push(Effect::Tremolo {
            freq: DEFAULT_TREMOLO_FREQ,
            depth: DEFAULT_TREMOLO_DEPTH,
        });
    }
    if enabled(options.phaser) {
        chain.push(Effect::Phaser);
    }
    if let Some(db) = non_zero(options.gain_db) {
        chain.push(Effect::Gain { db });
    }
    if enabled(options.compand) {
        chain.push(Effect::Compand);
    }
    if let Some(ratio) = non_zero(options.speed_ratio) {
        chain.push(Effect::Speed { ratio });
    }
    if let Some(cutoff) = non_zero(options.lowpass_cutoff) {
        chain.push(Effect::Lowpass { cutoff });
    }
    if !enabled(options.no_reverb) {
        chain.push(Effect::Reverb(ReverbParams::default()));
    }

    chain
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn enabled(flag: Option<bool>) -> bool {
    flag.unwrap_or(false)
}
