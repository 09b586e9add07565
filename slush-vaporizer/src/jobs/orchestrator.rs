//! Job orchestration
//!
//! Accepts transform and adjustment requests, records them as `Pending`
//! jobs, and runs them on tokio tasks gated by a semaphore (the worker pool).
//! The audio work itself runs on the blocking pool.

use super::{Job, JobKind, JobState, JobStore, StateTransition};
use crate::effects::{Effect, EffectExecutor};
use crate::error::{Result, VaporError};
use crate::options::ProcessingOptions;
use crate::pipeline::{TempFiles, Vaporizer};
use chrono::Utc;
use slush_common::events::{EventBus, SlushEvent};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Saved upload(s) and options for one transform
#[derive(Debug, Clone)]
pub struct TransformRequest {
    /// Saved upload; deleted when the job ends
    pub input: PathBuf,
    /// Client-side filename, used for the output extension
    pub original_filename: String,
    pub options: ProcessingOptions,
    /// Saved reference upload; deleted when the job ends
    pub reference: Option<PathBuf>,
}

struct Inner {
    store: JobStore,
    vaporizer: Vaporizer,
    executor: Arc<dyn EffectExecutor>,
    output_dir: PathBuf,
    slots: Arc<Semaphore>,
    event_bus: EventBus,
}

/// Owns every job and schedules its execution
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

impl JobOrchestrator {
    pub fn new(
        vaporizer: Vaporizer,
        executor: Arc<dyn EffectExecutor>,
        output_dir: PathBuf,
        worker_slots: usize,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: JobStore::new(),
                vaporizer,
                executor,
                output_dir,
                slots: Arc::new(Semaphore::new(worker_slots.max(1))),
                event_bus,
            }),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.inner.output_dir
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }

    /// Snapshot of a job, `None` if the id is unknown
    pub fn status(&self, job_id: &Uuid) -> Option<Job> {
        self.inner.store.get(job_id)
    }

    /// Preset name → description
    pub fn list_presets(&self) -> BTreeMap<String, String> {
        self.inner.vaporizer.presets().descriptions()
    }

    /// Validate and queue a transform job
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the job
    /// is recorded as `Pending`.
    pub fn submit_transform(&self, request: TransformRequest) -> Result<Uuid> {
        if request.original_filename.trim().is_empty() {
            return Err(VaporError::InvalidRequest("No selected file".into()));
        }
        match std::fs::metadata(&request.input) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            Ok(_) => {
                return Err(VaporError::InvalidRequest(format!(
                    "Uploaded file is empty: {}",
                    request.original_filename
                )))
            }
            Err(_) => {
                return Err(VaporError::InvalidRequest(format!(
                    "Uploaded file missing: {}",
                    request.input.display()
                )))
            }
        }

        let job = Job::new(JobKind::Transform);
        let job_id = job.id;
        self.enqueue(job);

        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run_transform(job_id, request).await;
        });

        Ok(job_id)
    }

    /// Validate and queue a single-effect adjustment of an earlier output
    pub fn submit_adjust(
        &self,
        base_id: &str,
        effect_name: Option<String>,
        effect_params: Option<HashMap<String, f64>>,
    ) -> Result<Uuid> {
        let (name, params) = match (effect_name, effect_params) {
            (Some(name), Some(params)) => (name, params),
            _ => {
                return Err(VaporError::InvalidRequest(
                    "Invalid adjustment data provided: effect_name and effect_params are required"
                        .into(),
                ))
            }
        };
        let effect = Effect::from_name_and_params(&name, &params)?;
        let base = self.resolve_base(base_id)?;

        let job = Job::new(JobKind::Adjust);
        let job_id = job.id;
        let output = base
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{}{}", job_id, extension_of(&base)));
        self.enqueue(job);

        tracing::info!(
            job_id = %job_id,
            base = %base.display(),
            effect = %effect,
            "Adjustment queued"
        );

        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run_adjust(job_id, effect, base, output).await;
        });

        Ok(job_id)
    }

    /// Locate the output of `base_id`
    ///
    /// The id → path mapping recorded by this process wins; otherwise the
    /// lexicographically first output file whose name starts with `base_id`.
    /// In-flight intermediates (`temp_*`, `loop_*`) are never candidates.
    pub fn resolve_base(&self, base_id: &str) -> Result<PathBuf> {
        let base_id = base_id.trim();
        if base_id.is_empty() || base_id.contains(|c: char| c == '/' || c == '\\') {
            return Err(VaporError::NotFound("Original processed file not found.".into()));
        }

        if let Ok(id) = Uuid::parse_str(base_id) {
            if let Some(path) = self.inner.store.output_path(&id).filter(|p| p.is_file()) {
                return Ok(path);
            }
        }

        let entries = match std::fs::read_dir(&self.inner.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    dir = %self.inner.output_dir.display(),
                    error = %e,
                    "Output directory unreadable during base lookup"
                );
                return Err(VaporError::NotFound("Original processed file not found.".into()));
            }
        };

        let mut candidates: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !is_intermediate(name) && name.starts_with(base_id))
            .collect();
        candidates.sort();

        candidates
            .into_iter()
            .next()
            .map(|name| self.inner.output_dir.join(name))
            .ok_or_else(|| VaporError::NotFound("Original processed file not found.".into()))
    }

    fn enqueue(&self, job: Job) {
        let job_id = job.id;
        let kind = job.kind;
        self.inner.store.insert(job);
        self.inner.event_bus.emit_lossy(SlushEvent::JobQueued {
            job_id,
            kind: kind.as_str().to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(job_id = %job_id, kind = kind.as_str(), "Job queued");
    }

    async fn run_transform(&self, job_id: Uuid, request: TransformRequest) {
        // Uploads are removed when this guard drops: success, failure or panic
        let mut uploads = TempFiles::new();
        uploads.track(request.input.clone());
        if let Some(reference) = &request.reference {
            uploads.track(reference.clone());
        }

        let _permit = match self.inner.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                self.finish(job_id, Err(format!("Worker pool closed: {}", e)));
                return;
            }
        };

        self.start(job_id);
        self.progress(job_id, "Processing audio...");

        let output = self.inner.output_dir.join(format!(
            "{}{}",
            job_id,
            extension_of(Path::new(&request.original_filename))
        ));

        let inner = Arc::clone(&self.inner);
        let joined = tokio::task::spawn_blocking(move || {
            let _uploads = uploads;
            inner.vaporizer.process(
                &request.input,
                &output,
                &request.options,
                request.reference.as_deref(),
            )
        })
        .await;

        let outcome = match joined {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("Worker task failed: {}", e)),
        };
        self.finish(job_id, outcome);
    }

    async fn run_adjust(&self, job_id: Uuid, effect: Effect, base: PathBuf, output: PathBuf) {
        let _permit = match self.inner.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                self.finish(job_id, Err(format!("Worker pool closed: {}", e)));
                return;
            }
        };

        self.start(job_id);

        let executor = Arc::clone(&self.inner.executor);
        let joined = tokio::task::spawn_blocking(move || {
            executor.apply(&effect, &base, &output).map(|()| output)
        })
        .await;

        let outcome = match joined {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("Worker task failed: {}", e)),
        };
        self.finish(job_id, outcome);
    }

    fn start(&self, job_id: Uuid) {
        let transition = self.inner.store.update(&job_id, |job| {
            job.transition_to(JobState::InProgress).map(|transition| {
                job.progress_note = String::from("Initializing...");
                transition
            })
        });
        if self.accepted(job_id, transition).is_some() {
            tracing::info!(job_id = %job_id, "Job started");
            self.emit_progress(job_id, "Initializing...");
        }
    }

    fn progress(&self, job_id: Uuid, note: &str) {
        self.inner.store.set_progress(&job_id, note);
        self.emit_progress(job_id, note);
    }

    fn emit_progress(&self, job_id: Uuid, note: &str) {
        self.inner.event_bus.emit_lossy(SlushEvent::JobProgress {
            job_id,
            note: note.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn finish(&self, job_id: Uuid, outcome: std::result::Result<PathBuf, String>) {
        let transition = self.inner.store.update(&job_id, |job| match &outcome {
            Ok(path) => job.succeed(path.clone()),
            Err(error) => job.fail(error.clone()),
        });
        if self.accepted(job_id, transition).is_none() {
            return;
        }

        match outcome {
            Ok(path) => {
                tracing::info!(job_id = %job_id, result = %path.display(), "Job succeeded");
                self.inner.store.record_output(job_id, path.clone());
                self.inner.event_bus.emit_lossy(SlushEvent::JobSucceeded {
                    job_id,
                    result_path: path.display().to_string(),
                    timestamp: Utc::now(),
                });
            }
            Err(error) => {
                tracing::error!(job_id = %job_id, error = %error, "Job failed");
                self.inner.event_bus.emit_lossy(SlushEvent::JobFailed {
                    job_id,
                    error,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Log rejected or unknown-job transitions
    fn accepted(
        &self,
        job_id: Uuid,
        transition: Option<std::result::Result<StateTransition, super::IllegalTransition>>,
    ) -> Option<StateTransition> {
        match transition {
            Some(Ok(transition)) => Some(transition),
            Some(Err(illegal)) => {
                tracing::warn!(job_id = %job_id, error = %illegal, "Rejected job transition");
                None
            }
            None => {
                tracing::warn!(job_id = %job_id, "Transition for unknown job");
                None
            }
        }
    }
}

/// Scratch files the pipeline writes next to finished outputs
fn is_intermediate(name: &str) -> bool {
    INTERMEDIATE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

const INTERMEDIATE_PREFIXES: [&str; 2] = ["temp_", "loop_"];

/// `.ext` of a path, or empty
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}
