//! Style transfer: effect parameters derived from two fingerprints

use crate::analysis::AudioFingerprint;
use crate::options::ProcessingOptions;

/// Brightness at or above this maps to the lowest cutoff
pub const BRIGHTNESS_CEILING: f64 = 4000.0;
/// Cutoff range produced for brightness in `[BRIGHTNESS_CEILING, 0]`
pub const MIN_CUTOFF: f64 = 2000.0;
pub const CUTOFF_SPAN: f64 = 6000.0;

/// Derive speed, lowpass and gain so `target` moves toward `reference`
///
/// Only `speed_ratio`, `lowpass_cutoff` and `gain_db` are ever set. Speed is
/// skipped for a non-positive target tempo; gain is skipped for a
/// non-positive target loudness or a non-finite result.
pub fn resolve(target: &AudioFingerprint, reference: &AudioFingerprint) -> ProcessingOptions {
    let mut derived = ProcessingOptions::default();

    if target.tempo > 0.0 {
        derived.speed_ratio = Some(reference.tempo / target.tempo);
    }

    let brightness = reference.brightness.min(BRIGHTNESS_CEILING) / BRIGHTNESS_CEILING;
    let darkness = 1.0 - brightness.clamp(0.0, 1.0);
    derived.lowpass_cutoff = Some(MIN_CUTOFF + darkness * CUTOFF_SPAN);

    if target.avg_loudness > 0.0 {
        let gain = 20.0 * (reference.avg_loudness / target.avg_loudness).log10();
        if gain.is_finite() {
            derived.gain_db = Some(gain);
        }
    }

    tracing::info!(
        speed_ratio = ?derived.speed_ratio,
        lowpass_cutoff = ?derived.lowpass_cutoff,
        gain_db = ?derived.gain_db,
        "Style transfer options derived"
    );

    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PitchClass;

    fn fingerprint(tempo: f64, brightness: f64, avg_loudness: f64) -> AudioFingerprint {
        AudioFingerprint {
            tempo,
            key: PitchClass::C,
            brightness,
            spectral_width: 0.0,
            avg_loudness,
        }
    }

    #[test]
    fn test_derives_speed_cutoff_and_gain() {
        let derived = resolve(&fingerprint(100.0, 1000.0, 0.5), &fingerprint(150.0, 3000.0, 0.25));

        assert_eq!(derived.speed_ratio, Some(1.5));
        assert_eq!(derived.lowpass_cutoff, Some(3500.0));
        let gain = derived.gain_db.unwrap();
        assert!((gain - (-6.0206)).abs() < 1e-3, "gain {}", gain);
        assert_eq!(derived.bass_boost, None);
        assert_eq!(derived.no_reverb, None);
    }

    #[test]
    fn test_very_bright_reference_clamps_cutoff() {
        let derived = resolve(&fingerprint(100.0, 1000.0, 0.5), &fingerprint(100.0, 9000.0, 0.5));
        assert_eq!(derived.lowpass_cutoff, Some(2000.0));
        assert_eq!(derived.gain_db, Some(0.0));
    }

    #[test]
    fn test_zero_target_tempo_and_loudness_skip_fields() {
        let derived = resolve(&fingerprint(0.0, 1000.0, 0.0), &fingerprint(120.0, 0.0, 0.3));
        assert_eq!(derived.speed_ratio, None);
        assert_eq!(derived.gain_db, None);
        assert_eq!(derived.lowpass_cutoff, Some(8000.0));
    }

    #[test]
    fn test_silent_reference_skips_gain() {
        let derived = resolve(&fingerprint(100.0, 1000.0, 0.5), &fingerprint(100.0, 1000.0, 0.0));
        assert_eq!(derived.gain_db, None);
    }
}
