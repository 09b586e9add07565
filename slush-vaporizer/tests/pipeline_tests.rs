//! Pipeline runner and vaporizer tests
//!
//! The SoX executor is replaced by a recorder that copies input to output,
//! so these tests check sequencing and file handling, not audio.

mod helpers;

use helpers::{test_vaporizer, FailingExecutor, FakeToolkit, Profile, RecordingExecutor, TestDirs};
use slush_vaporizer::effects::{Effect, EffectKind};
use slush_vaporizer::options::ProcessingOptions;
use slush_vaporizer::pipeline::PipelineRunner;
use slush_vaporizer::VaporError;
use std::path::Path;
use std::sync::Arc;

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn kinds(executor: &RecordingExecutor) -> Vec<EffectKind> {
    executor.calls().iter().map(|c| c.effect.kind()).collect()
}

#[test]
fn test_empty_chain_copies_input() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"RIFF-not-really-audio");
    let output = dirs.outputs.join("out.wav");

    let executor = Arc::new(RecordingExecutor::new());
    let runner = PipelineRunner::new(executor.clone());
    let options = ProcessingOptions {
        no_reverb: Some(true),
        ..Default::default()
    };

    let result = runner.run(&input, &output, &options).unwrap();

    assert_eq!(result, output);
    assert!(executor.calls().is_empty());
    assert_eq!(std::fs::read(&output).unwrap(), b"RIFF-not-really-audio");
    assert!(input.exists(), "Input must never be modified or removed");
}

#[test]
fn test_chain_threads_outputs_and_cleans_temps() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"audio");
    let output = dirs.outputs.join("out.wav");

    let executor = Arc::new(RecordingExecutor::new());
    let runner = PipelineRunner::new(executor.clone());
    let options = ProcessingOptions {
        bass_boost: Some(3.0),
        compand: Some(true),
        ..Default::default()
    };

    runner.run(&input, &output, &options).unwrap();

    let calls = executor.calls();
    assert_eq!(
        kinds(&executor),
        vec![EffectKind::BassBoost, EffectKind::Compand, EffectKind::Reverb]
    );
    assert_eq!(calls[0].input, input);
    for pair in calls.windows(2) {
        assert_eq!(pair[1].input, pair[0].output, "Each step reads the previous output");
    }
    assert!(calls.iter().all(|c| c.input_existed));
    assert_eq!(calls.last().unwrap().output, output);

    // Only the final output remains next to it
    assert_eq!(file_names(&dirs.outputs), vec!["out.wav".to_string()]);
}

#[test]
fn test_failure_mid_chain_removes_intermediates() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"audio");
    let output = dirs.outputs.join("out.wav");

    let executor = Arc::new(FailingExecutor::new(1));
    let runner = PipelineRunner::new(executor.clone());
    let options = ProcessingOptions {
        bass_boost: Some(3.0),
        compand: Some(true),
        ..Default::default()
    };

    let err = runner.run(&input, &output, &options).unwrap_err();

    assert!(matches!(err, VaporError::ToolExecution(_)));
    assert_eq!(executor.calls().len(), 2, "Chain stops at the failing step");
    assert!(file_names(&dirs.outputs).is_empty());
    assert!(input.exists());
}

#[test]
fn test_preset_with_reference_adds_style_gain() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"audio");
    let reference = dirs.upload("ref.wav", b"audio");
    let output = dirs.outputs.join("out.wav");

    let toolkit = FakeToolkit::new()
        .with_profile(
            "song.wav",
            Profile {
                tempo: 100.0,
                brightness: 2000.0,
                loudness: 0.2,
            },
        )
        .with_profile(
            "ref.wav",
            Profile {
                tempo: 150.0,
                brightness: 4000.0,
                loudness: 0.1,
            },
        );
    let executor = Arc::new(RecordingExecutor::new());
    let vaporizer = test_vaporizer(executor.clone(), toolkit);

    vaporizer
        .process(&input, &output, &ProcessingOptions::with_preset("slushwave"), Some(&reference))
        .unwrap();

    assert_eq!(
        kinds(&executor),
        vec![
            EffectKind::PitchShift,
            EffectKind::Phaser,
            EffectKind::Gain,
            EffectKind::Compand,
            EffectKind::Speed,
            EffectKind::Lowpass,
            EffectKind::Reverb,
        ]
    );

    let calls = executor.calls();
    // Derived options override the preset
    assert_eq!(calls[4].effect, Effect::Speed { ratio: 1.5 });
    assert_eq!(calls[5].effect, Effect::Lowpass { cutoff: 2000.0 });
    match &calls[2].effect {
        Effect::Gain { db } => assert!((db + 6.0206).abs() < 0.01, "gain was {}", db),
        other => panic!("Expected gain, got {:?}", other),
    }
    assert_eq!(calls.last().unwrap().output, output);
}

#[test]
fn test_explicit_options_beat_style_transfer() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"audio");
    let reference = dirs.upload("ref.wav", b"audio");
    let output = dirs.outputs.join("out.wav");

    let toolkit = FakeToolkit::new()
        .with_profile(
            "song.wav",
            Profile {
                tempo: 100.0,
                brightness: 2000.0,
                loudness: 0.2,
            },
        )
        .with_profile(
            "ref.wav",
            Profile {
                tempo: 150.0,
                brightness: 4000.0,
                loudness: 0.2,
            },
        );
    let executor = Arc::new(RecordingExecutor::new());
    let vaporizer = test_vaporizer(executor.clone(), toolkit);

    let explicit = ProcessingOptions {
        speed_ratio: Some(0.7),
        no_reverb: Some(true),
        ..Default::default()
    };
    vaporizer
        .process(&input, &output, &explicit, Some(&reference))
        .unwrap();

    // Equal loudness derives a zero gain, which is not applied
    assert_eq!(kinds(&executor), vec![EffectKind::Speed, EffectKind::Lowpass]);
    assert_eq!(executor.calls()[0].effect, Effect::Speed { ratio: 0.7 });
}

#[test]
fn test_reference_analysis_failure_keeps_preset() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"audio");
    let reference = dirs.upload("unknown.wav", b"audio");
    let output = dirs.outputs.join("out.wav");

    let toolkit = FakeToolkit::new().with_profile(
        "song.wav",
        Profile {
            tempo: 100.0,
            brightness: 2000.0,
            loudness: 0.2,
        },
    );
    let executor = Arc::new(RecordingExecutor::new());
    let vaporizer = test_vaporizer(executor.clone(), toolkit);

    vaporizer
        .process(&input, &output, &ProcessingOptions::with_preset("slushwave"), Some(&reference))
        .unwrap();

    assert_eq!(executor.calls().len(), 6);
    assert!(executor
        .calls()
        .iter()
        .any(|c| c.effect == Effect::Speed { ratio: 0.8 }));
}

#[test]
fn test_unknown_preset_applies_nothing_but_reverb() {
    let dirs = TestDirs::new();
    let input = dirs.upload("song.wav", b"audio");
    let output = dirs.outputs.join("out.wav");

    let executor = Arc::new(RecordingExecutor::new());
    let vaporizer = test_vaporizer(executor.clone(), FakeToolkit::new());

    vaporizer
        .process(&input, &output, &ProcessingOptions::with_preset("no-such-preset"), None)
        .unwrap();

    assert_eq!(kinds(&executor), vec![EffectKind::Reverb]);
}
