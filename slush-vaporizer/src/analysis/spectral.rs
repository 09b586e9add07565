//! Native analysis toolkit (symphonia decode + rustfft STFT)

use super::AnalysisToolkit;
use crate::audio::{decode_audio_file, DecodedAudio};
use crate::error::{Result, VaporError};
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::path::Path;
use std::sync::Arc;

/// STFT window length (samples)
pub const N_FFT: usize = 2048;
/// STFT hop (samples)
pub const HOP_LENGTH: usize = 512;

const MIN_CHROMA_FREQ: f64 = 20.0;
const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 300.0;
const PRIOR_BPM: f64 = 120.0;
/// Width of the tempo prior, in octaves
const PRIOR_OCTAVES: f64 = 1.0;

/// Magnitude spectrogram, one row per frame
struct Spectrogram {
    frames: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Spectrogram {
    fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / N_FFT as f64
    }
}

/// STFT-based feature extraction
pub struct SpectralToolkit {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl SpectralToolkit {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(N_FFT),
            window: compute_hann(N_FFT),
        }
    }

    /// Centred STFT magnitudes, `1 + n / hop` frames
    fn spectrogram(&self, audio: &DecodedAudio) -> Spectrogram {
        let padded = center_pad(&audio.samples, N_FFT / 2);
        let frame_count = 1 + audio.samples.len() / HOP_LENGTH;
        let bins = N_FFT / 2 + 1;

        let mut buffer = vec![Complex32::new(0.0, 0.0); N_FFT];
        let mut frames = Vec::with_capacity(frame_count);

        for fr in 0..frame_count {
            let start = fr * HOP_LENGTH;
            let chunk = &padded[start..start + N_FFT];
            for (slot, (sample, w)) in buffer.iter_mut().zip(chunk.iter().zip(&self.window)) {
                *slot = Complex32::new(sample * w, 0.0);
            }
            self.fft.process(&mut buffer);
            frames.push(buffer[..bins].iter().map(|c| c.norm()).collect());
        }

        Spectrogram {
            frames,
            sample_rate: audio.sample_rate,
        }
    }
}

impl Default for SpectralToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisToolkit for SpectralToolkit {
    fn load(&self, path: &Path) -> Result<DecodedAudio> {
        let audio = decode_audio_file(path)
            .map_err(|e| VaporError::AnalysisFailed(format!("{:#}", e)))?;
        if audio.samples.is_empty() || audio.sample_rate == 0 {
            return Err(VaporError::AnalysisFailed(format!(
                "No audio samples in {}",
                path.display()
            )));
        }
        Ok(audio)
    }

    fn tempo(&self, audio: &DecodedAudio) -> Result<f64> {
        let spec = self.spectrogram(audio);
        let envelope = onset_envelope(&spec.frames);
        let frame_rate = audio.sample_rate as f64 / HOP_LENGTH as f64;
        estimate_tempo(&envelope, frame_rate)
    }

    fn chroma(&self, audio: &DecodedAudio) -> Result<Vec<[f64; 12]>> {
        let spec = self.spectrogram(audio);

        // Pitch class of every bin at or above the cutoff
        let classes: Vec<Option<usize>> = (0..N_FFT / 2 + 1)
            .map(|bin| {
                let freq = spec.bin_frequency(bin);
                if freq < MIN_CHROMA_FREQ {
                    return None;
                }
                let midi = 69.0 + 12.0 * (freq / 440.0).log2();
                Some((midi.round() as i64).rem_euclid(12) as usize)
            })
            .collect();

        Ok(spec
            .frames
            .iter()
            .map(|frame| {
                let mut chroma = [0.0f64; 12];
                for (mag, class) in frame.iter().zip(&classes) {
                    if let Some(c) = class {
                        chroma[*c] += (*mag as f64) * (*mag as f64);
                    }
                }
                let peak = chroma.iter().cloned().fold(0.0, f64::max);
                if peak > 0.0 {
                    chroma.iter_mut().for_each(|v| *v /= peak);
                }
                chroma
            })
            .collect())
    }

    fn spectral_centroid(&self, audio: &DecodedAudio) -> Result<Vec<f64>> {
        let spec = self.spectrogram(audio);
        Ok(spec
            .frames
            .iter()
            .map(|frame| frame_centroid(&spec, frame))
            .collect())
    }

    fn spectral_bandwidth(&self, audio: &DecodedAudio) -> Result<Vec<f64>> {
        let spec = self.spectrogram(audio);
        Ok(spec
            .frames
            .iter()
            .map(|frame| {
                let total: f64 = frame.iter().map(|m| *m as f64).sum();
                if total <= 0.0 {
                    return 0.0;
                }
                let centroid = frame_centroid(&spec, frame);
                let spread: f64 = frame
                    .iter()
                    .enumerate()
                    .map(|(bin, m)| {
                        let d = spec.bin_frequency(bin) - centroid;
                        (*m as f64) * d * d
                    })
                    .sum();
                (spread / total).sqrt()
            })
            .collect())
    }

    fn rms(&self, audio: &DecodedAudio) -> Result<Vec<f64>> {
        let padded = center_pad(&audio.samples, N_FFT / 2);
        let frame_count = 1 + audio.samples.len() / HOP_LENGTH;
        Ok((0..frame_count)
            .map(|fr| {
                let start = fr * HOP_LENGTH;
                let energy: f64 = padded[start..start + N_FFT]
                    .iter()
                    .map(|s| (*s as f64) * (*s as f64))
                    .sum();
                (energy / N_FFT as f64).sqrt()
            })
            .collect())
    }
}

fn compute_hann(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0];
    }
    // Periodic window
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
        .collect()
}

fn center_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);
    padded
}

fn frame_centroid(spec: &Spectrogram, frame: &[f32]) -> f64 {
    let total: f64 = frame.iter().map(|m| *m as f64).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = frame
        .iter()
        .enumerate()
        .map(|(bin, m)| spec.bin_frequency(bin) * *m as f64)
        .sum();
    weighted / total
}

/// Half-wave rectified spectral flux of log-compressed magnitudes
fn onset_envelope(frames: &[Vec<f32>]) -> Vec<f64> {
    let mut envelope = Vec::with_capacity(frames.len());
    envelope.push(0.0);
    for pair in frames.windows(2) {
        let flux: f64 = pair[1]
            .iter()
            .zip(&pair[0])
            .map(|(cur, prev)| ((*cur as f64).ln_1p() - (*prev as f64).ln_1p()).max(0.0))
            .sum();
        envelope.push(flux);
    }
    envelope
}

/// Autocorrelation tempo estimate weighted toward `PRIOR_BPM`
fn estimate_tempo(envelope: &[f64], frame_rate: f64) -> Result<f64> {
    let min_lag = (60.0 * frame_rate / MAX_BPM).ceil().max(1.0) as usize;
    let max_lag =
        ((60.0 * frame_rate / MIN_BPM).floor() as usize).min(envelope.len().saturating_sub(2));
    if max_lag <= min_lag {
        return Err(VaporError::AnalysisFailed(
            "Audio too short for tempo estimation".into(),
        ));
    }

    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|v| v - mean).collect();

    // Normalized autocorrelation for lags min_lag-1 ..= max_lag+1
    let autocorr = |lag: usize| -> f64 {
        let n = centered.len() - lag;
        centered[..n]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64
    };

    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        let ac = autocorr(lag);
        if ac <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f64;
        let weight = (-0.5 * ((bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES).powi(2)).exp();
        let score = ac * weight;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let (lag, _) = best.ok_or_else(|| {
        VaporError::AnalysisFailed("No periodic onsets found".into())
    })?;

    // Parabolic refinement of the peak lag
    let (prev, cur, next) = (autocorr(lag - 1), autocorr(lag), autocorr(lag + 1));
    let denom = prev - 2.0 * cur + next;
    let offset = if denom.abs() > f64::EPSILON {
        (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };

    Ok(60.0 * frame_rate / (lag as f64 + offset))
}
