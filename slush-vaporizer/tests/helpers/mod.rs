//! Test Helper Utilities
//!
//! Shared utilities for testing slush-vaporizer

#![allow(dead_code)]

pub mod audio_generator;
pub mod fakes;

pub use audio_generator::{generate_test_wav, AudioConfig};
pub use fakes::{FailingExecutor, FakeToolkit, Profile, RecordedCall, RecordingExecutor};

use slush_common::events::EventBus;
use slush_vaporizer::analysis::FeatureAnalyzer;
use slush_vaporizer::effects::EffectExecutor;
use slush_vaporizer::jobs::{Job, JobOrchestrator};
use slush_vaporizer::options::PresetCatalog;
use slush_vaporizer::pipeline::{PipelineRunner, Vaporizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Uploads and outputs folders under one temp root
pub struct TestDirs {
    pub root: tempfile::TempDir,
    pub uploads: PathBuf,
    pub outputs: PathBuf,
}

impl TestDirs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let uploads = root.path().join("uploads");
        let outputs = root.path().join("outputs");
        std::fs::create_dir_all(&uploads).expect("Failed to create uploads dir");
        std::fs::create_dir_all(&outputs).expect("Failed to create outputs dir");
        Self {
            root,
            uploads,
            outputs,
        }
    }

    /// Write `bytes` as an upload and return its path
    pub fn upload(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.uploads.join(format!("{}_{}", Uuid::new_v4(), name));
        std::fs::write(&path, bytes).expect("Failed to write upload");
        path
    }
}

/// Vaporizer over the built-in presets
pub fn test_vaporizer(executor: Arc<dyn EffectExecutor>, toolkit: FakeToolkit) -> Vaporizer {
    Vaporizer::new(
        PipelineRunner::new(executor),
        FeatureAnalyzer::new(Arc::new(toolkit)),
        Arc::new(PresetCatalog::builtin().expect("Built-in presets must parse")),
    )
}

/// Orchestrator writing to `outputs`
pub fn test_orchestrator(
    executor: Arc<dyn EffectExecutor>,
    toolkit: FakeToolkit,
    outputs: &Path,
) -> (JobOrchestrator, EventBus) {
    let event_bus = EventBus::new(100);
    let orchestrator = JobOrchestrator::new(
        test_vaporizer(Arc::clone(&executor), toolkit),
        executor,
        outputs.to_path_buf(),
        2,
        event_bus.clone(),
    );
    (orchestrator, event_bus)
}

/// Poll until the job is terminal or the timeout passes
pub async fn wait_for_terminal(orchestrator: &JobOrchestrator, job_id: &Uuid) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = orchestrator.status(job_id).expect("Job must exist");
        if job.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Job {} did not finish in time (state {:?})",
            job_id,
            job.state
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
