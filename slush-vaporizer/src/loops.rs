//! Loop extraction
//!
//! Picks the loudest window of a requested length, preferring windows that
//! start after the first 30 seconds (skipping intros), and writes it out as a
//! new working file.

use crate::audio::{decode_audio_file, write_wav_mono};
use crate::error::{Result, VaporError};
use crate::types::BestEffort;
use std::ops::Range;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Windows starting before this offset are only used as a fallback
pub const INTRO_SKIP_SECONDS: f64 = 30.0;

/// Sample range of the loudest `duration_seconds` window
///
/// RMS is taken over centred, zero-padded frames of `L = duration × sr`
/// samples with hop `L / 2`. The winning frame index `t` maps to
/// `[t·hop, min(t·hop + L, n))`.
pub fn select_loop_window(
    samples: &[f32],
    sample_rate: u32,
    duration_seconds: f64,
) -> Result<Range<usize>> {
    if samples.is_empty() {
        return Err(VaporError::AnalysisFailed("No samples to search for a loop".into()));
    }
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return Err(VaporError::InvalidRequest(format!(
            "Loop duration must be positive, got {}",
            duration_seconds
        )));
    }

    let frame_length = (duration_seconds * sample_rate as f64) as usize;
    let hop = frame_length / 2;
    if hop == 0 {
        return Err(VaporError::InvalidRequest(format!(
            "Loop duration {}s is too short at {} Hz",
            duration_seconds, sample_rate
        )));
    }

    let rms = frame_rms(samples, frame_length, hop);
    let search_start = (INTRO_SKIP_SECONDS * sample_rate as f64 / hop as f64).floor() as usize;

    let best = if rms.len() > search_start {
        search_start + argmax(&rms[search_start..])
    } else {
        argmax(&rms)
    };

    let start = (best * hop).min(samples.len());
    let end = (start + frame_length).min(samples.len());
    Ok(start..end)
}

/// Extract the loudest window of `input` into `output_dir/loop_{uuid}.wav`
///
/// Never fails: any problem is reported as `Degraded` and the caller keeps
/// working on the original input.
pub fn extract_loop(input: &Path, output_dir: &Path, duration_seconds: f64) -> BestEffort<PathBuf> {
    let outcome: BestEffort<PathBuf> = try_extract(input, output_dir, duration_seconds).into();
    match &outcome {
        BestEffort::Applied(path) => {
            tracing::info!(input = %input.display(), loop_path = %path.display(), "Loop extracted")
        }
        BestEffort::Degraded { reason } => {
            tracing::warn!(input = %input.display(), reason = %reason, "Loop detection skipped")
        }
    }
    outcome
}

fn try_extract(input: &Path, output_dir: &Path, duration_seconds: f64) -> Result<PathBuf> {
    let audio = decode_audio_file(input)
        .map_err(|e| VaporError::AnalysisFailed(format!("{:#}", e)))?;
    let window = select_loop_window(&audio.samples, audio.sample_rate, duration_seconds)?;

    let loop_path = output_dir.join(format!("loop_{}.wav", Uuid::new_v4()));
    if let Err(e) = write_wav_mono(&loop_path, &audio.samples[window], audio.sample_rate) {
        let _ = std::fs::remove_file(&loop_path);
        return Err(VaporError::AnalysisFailed(format!("{:#}", e)));
    }
    Ok(loop_path)
}

fn frame_rms(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f64> {
    let pad = frame_length / 2;
    let frame_count = 1 + samples.len() / hop;

    (0..frame_count)
        .map(|t| {
            // Window in padded coordinates is [t·hop, t·hop + L)
            let lo = (t * hop).saturating_sub(pad);
            let hi = (t * hop + frame_length).saturating_sub(pad).min(samples.len());
            let energy: f64 = samples[lo.min(hi)..hi]
                .iter()
                .map(|s| (*s as f64) * (*s as f64))
                .sum();
            (energy / frame_length as f64).sqrt()
        })
        .collect()
}

/// First index of the maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_uses_global_max() {
        // 4 s at 1 kHz, loud second between 2 s and 3 s
        let mut samples = vec![0.01f32; 4000];
        samples[2000..3000].iter_mut().for_each(|s| *s = 0.9);

        // Frame 5 (centred on 2.5 s) is loudest; the window starts at its centre
        let window = select_loop_window(&samples, 1000, 1.0).unwrap();
        assert_eq!(window, 2500..3500);
    }

    #[test]
    fn test_window_clipped_at_end() {
        let mut samples = vec![0.0f32; 2500];
        samples[2400..].iter_mut().for_each(|s| *s = 1.0);

        let window = select_loop_window(&samples, 1000, 1.0).unwrap();
        assert_eq!(window.end, 2500);
        assert!(window.len() <= 1000);
        assert!(window.contains(&2400));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let samples = vec![0.5f32; 100];
        assert!(select_loop_window(&samples, 1000, 0.0).is_err());
        assert!(select_loop_window(&samples, 1000, f64::NAN).is_err());
        assert!(select_loop_window(&[], 1000, 1.0).is_err());
    }

    #[test]
    fn test_frame_count_matches_centered_framing() {
        let samples = vec![0.1f32; 10_000];
        assert_eq!(frame_rms(&samples, 1000, 500).len(), 21);
    }

    #[test]
    fn test_unreadable_input_degrades() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let outcome = extract_loop(Path::new("/nonexistent/song.mp3"), temp_dir.path(), 10.0);
        assert!(!outcome.is_applied());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
