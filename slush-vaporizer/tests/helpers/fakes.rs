//! Stand-ins for the SoX executor and the analysis toolkit

use slush_vaporizer::analysis::AnalysisToolkit;
use slush_vaporizer::audio::DecodedAudio;
use slush_vaporizer::effects::{Effect, EffectExecutor};
use slush_vaporizer::error::{Result, VaporError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One `apply` call as seen by [`RecordingExecutor`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub effect: Effect,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Whether `input` existed when the call was made
    pub input_existed: bool,
}

/// Copies input to output and records every call
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn effect_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.effect.name()).collect()
    }
}

impl EffectExecutor for RecordingExecutor {
    fn apply(&self, effect: &Effect, input: &Path, output: &Path) -> Result<()> {
        let input_existed = input.is_file();
        self.calls.lock().unwrap().push(RecordedCall {
            effect: effect.clone(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            input_existed,
        });
        std::fs::copy(input, output)?;
        Ok(())
    }
}

/// Succeeds like [`RecordingExecutor`] until call number `fail_at` (0-based)
#[derive(Debug)]
pub struct FailingExecutor {
    fail_at: usize,
    inner: RecordingExecutor,
}

impl FailingExecutor {
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            inner: RecordingExecutor::new(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls()
    }
}

impl EffectExecutor for FailingExecutor {
    fn apply(&self, effect: &Effect, input: &Path, output: &Path) -> Result<()> {
        if self.inner.calls().len() == self.fail_at {
            self.inner.calls.lock().unwrap().push(RecordedCall {
                effect: effect.clone(),
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                input_existed: input.is_file(),
            });
            // Leave a partial file behind like a crashing tool would
            std::fs::write(output, b"partial")?;
            return Err(VaporError::ToolExecution(format!(
                "{} rejected its parameters",
                effect.name()
            )));
        }
        self.inner.apply(effect, input, output)
    }
}

/// Fingerprint values served by [`FakeToolkit`]
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub tempo: f64,
    pub brightness: f64,
    pub loudness: f64,
}

/// Analysis toolkit keyed by file name suffix
///
/// Files whose name ends with a registered suffix get that profile; any other
/// file fails to load.
#[derive(Debug, Clone, Default)]
pub struct FakeToolkit {
    profiles: HashMap<String, Profile>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, suffix: &str, profile: Profile) -> Self {
        self.profiles.insert(suffix.to_string(), profile);
        self
    }

    fn profile(audio: &DecodedAudio) -> Profile {
        Profile {
            tempo: audio.samples[0] as f64,
            brightness: audio.samples[1] as f64,
            loudness: audio.samples[2] as f64,
        }
    }
}

impl AnalysisToolkit for FakeToolkit {
    fn load(&self, path: &Path) -> Result<DecodedAudio> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let profile = self
            .profiles
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix.as_str()))
            .map(|(_, profile)| *profile)
            .ok_or_else(|| VaporError::AnalysisFailed(format!("No profile for {}", name)))?;

        Ok(DecodedAudio {
            samples: vec![
                profile.tempo as f32,
                profile.brightness as f32,
                profile.loudness as f32,
            ],
            sample_rate: 22050,
            channels: 1,
        })
    }

    fn tempo(&self, audio: &DecodedAudio) -> Result<f64> {
        Ok(Self::profile(audio).tempo)
    }

    fn chroma(&self, _audio: &DecodedAudio) -> Result<Vec<[f64; 12]>> {
        let mut frame = [0.0; 12];
        frame[9] = 1.0;
        Ok(vec![frame])
    }

    fn spectral_centroid(&self, audio: &DecodedAudio) -> Result<Vec<f64>> {
        Ok(vec![Self::profile(audio).brightness])
    }

    fn spectral_bandwidth(&self, _audio: &DecodedAudio) -> Result<Vec<f64>> {
        Ok(vec![1500.0])
    }

    fn rms(&self, audio: &DecodedAudio) -> Result<Vec<f64>> {
        Ok(vec![Self::profile(audio).loudness])
    }
}
