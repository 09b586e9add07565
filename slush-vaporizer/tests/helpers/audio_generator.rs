//! Audio Test Fixture Generator
//!
//! Writes 16-bit mono WAV files: a quiet sine bed with an optional loud burst.

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    /// Amplitude of the 440 Hz bed (0.0 for silence)
    pub bed_amplitude: f32,
    /// Constant-level burst as (start seconds, length seconds, level)
    pub burst: Option<(f64, f64, f32)>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            sample_rate: 8000,
            bed_amplitude: 0.25,
            burst: None,
        }
    }
}

/// Generate a test WAV file with the given configuration
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    let (burst_start, burst_end, burst_level) = match config.burst {
        Some((start, length, level)) => {
            let start_sample = (start * config.sample_rate as f64) as usize;
            let end_sample = start_sample + (length * config.sample_rate as f64) as usize;
            (start_sample, end_sample, level)
        }
        None => (total_samples + 1, total_samples + 1, 0.0),
    };

    for i in 0..total_samples {
        let sample = if (burst_start..burst_end).contains(&i) {
            burst_level
        } else {
            let t = i as f32 / config.sample_rate as f32;
            config.bed_amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        };
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}
