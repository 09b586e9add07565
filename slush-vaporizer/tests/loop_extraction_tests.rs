//! Loop extraction over generated WAV files

mod helpers;

use helpers::{generate_test_wav, AudioConfig, RecordingExecutor, TestDirs};
use slush_vaporizer::audio::decode_audio_file;
use slush_vaporizer::loops::{extract_loop, select_loop_window};
use slush_vaporizer::options::{LoopDetection, ProcessingOptions};
use slush_vaporizer::pipeline::PipelineRunner;
use std::sync::Arc;

/// 40 s at 8 kHz, silent apart from one loud second at 35 s
fn late_burst() -> AudioConfig {
    AudioConfig {
        duration_seconds: 40.0,
        sample_rate: 8000,
        bed_amplitude: 0.0,
        burst: Some((35.0, 1.0, 0.5)),
    }
}

#[test]
fn test_window_lands_on_late_burst() {
    let dirs = TestDirs::new();
    let path = generate_test_wav(&dirs.uploads.join("burst.wav"), &late_burst()).unwrap();
    let audio = decode_audio_file(&path).unwrap();
    assert_eq!(audio.samples.len(), 320_000);

    // Frames 14 and 15 both cover the burst fully; the earlier one wins
    let window = select_loop_window(&audio.samples, audio.sample_rate, 5.0).unwrap();
    assert_eq!(window, 280_000..320_000);
}

#[test]
fn test_short_track_searches_from_start() {
    let dirs = TestDirs::new();
    let config = AudioConfig {
        duration_seconds: 12.0,
        sample_rate: 8000,
        bed_amplitude: 0.0,
        burst: Some((4.0, 1.0, 0.5)),
    };
    let path = generate_test_wav(&dirs.uploads.join("short.wav"), &config).unwrap();
    let audio = decode_audio_file(&path).unwrap();

    // L = 16000, hop = 8000; frames 4 and 5 both cover [32000, 40000)
    let window = select_loop_window(&audio.samples, audio.sample_rate, 2.0).unwrap();
    assert_eq!(window, 32_000..48_000);
}

#[test]
fn test_extract_loop_writes_window() {
    let dirs = TestDirs::new();
    let path = generate_test_wav(&dirs.uploads.join("burst.wav"), &late_burst()).unwrap();

    let loop_path = extract_loop(&path, &dirs.outputs, 5.0)
        .applied()
        .expect("Loop extraction should succeed");

    let name = loop_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("loop_") && name.ends_with(".wav"), "name was {}", name);

    let reader = hound::WavReader::open(&loop_path).unwrap();
    assert_eq!(reader.spec().sample_rate, 8000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len(), 40_000);
}

#[test]
fn test_loop_detection_in_pipeline_feeds_first_effect() {
    let dirs = TestDirs::new();
    let input = generate_test_wav(&dirs.uploads.join("burst.wav"), &late_burst()).unwrap();
    let output = dirs.outputs.join("out.wav");

    let executor = Arc::new(RecordingExecutor::new());
    let runner = PipelineRunner::new(executor.clone());
    let options = ProcessingOptions {
        loop_detection: Some(LoopDetection {
            enabled: true,
            duration_seconds: 5.0,
        }),
        ..Default::default()
    };

    runner.run(&input, &output, &options).unwrap();

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    let first_input = calls[0].input.file_name().unwrap().to_string_lossy().into_owned();
    assert!(first_input.starts_with("loop_"));
    assert!(!calls[0].input.exists(), "Loop file is removed after the run");

    let reader = hound::WavReader::open(&output).unwrap();
    assert_eq!(reader.len(), 40_000);
}

#[test]
fn test_undecodable_input_skips_loop_detection() {
    let dirs = TestDirs::new();
    let input = dirs.upload("broken.wav", b"definitely not audio");
    let output = dirs.outputs.join("out.wav");

    let executor = Arc::new(RecordingExecutor::new());
    let runner = PipelineRunner::new(executor.clone());
    let options = ProcessingOptions {
        loop_detection: Some(LoopDetection {
            enabled: true,
            duration_seconds: 5.0,
        }),
        ..Default::default()
    };

    runner.run(&input, &output, &options).unwrap();

    assert_eq!(executor.calls()[0].input, input);
    assert_eq!(std::fs::read(&output).unwrap(), b"definitely not audio");
}
