//! Job model and in-memory job table
//!
//! Jobs move `Pending → InProgress → Succeeded | Failed`. A job that never
//! starts may go straight from `Pending` to `Failed`. Terminal states never
//! change.

mod orchestrator;

pub use orchestrator::{JobOrchestrator, TransformRequest};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// Kind of work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Full pipeline over an uploaded file
    Transform,
    /// One effect over a previous output
    Adjust,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Transform => "transform",
            JobKind::Adjust => "adjust",
        }
    }
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PROGRESS")]
    InProgress,
    #[serde(rename = "SUCCESS")]
    Succeeded,
    #[serde(rename = "FAILURE")]
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    fn can_become(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::InProgress)
                | (JobState::Pending, JobState::Failed)
                | (JobState::InProgress, JobState::Succeeded)
                | (JobState::InProgress, JobState::Failed)
        )
    }
}

/// Rejected state change
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Illegal transition for job {job_id}: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub job_id: Uuid,
    pub from: JobState,
    pub to: JobState,
}

/// Accepted state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: Uuid,
    pub old_state: JobState,
    pub new_state: JobState,
    pub transitioned_at: DateTime<Utc>,
}

/// One unit of asynchronous work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub state: JobState,
    pub progress_note: String,
    pub result_path: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: JobState::Pending,
            progress_note: String::from("Pending..."),
            result_path: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Move to `new_state` if the lifecycle allows it
    pub fn transition_to(
        &mut self,
        new_state: JobState,
    ) -> Result<StateTransition, IllegalTransition> {
        if !self.state.can_become(new_state) {
            return Err(IllegalTransition {
                job_id: self.id,
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            job_id: self.id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        if new_state.is_terminal() {
            self.finished_at = Some(transition.transitioned_at);
        }

        Ok(transition)
    }

    /// Succeed with the produced file
    pub fn succeed(&mut self, result_path: PathBuf) -> Result<StateTransition, IllegalTransition> {
        let transition = self.transition_to(JobState::Succeeded)?;
        self.progress_note = String::from("Task completed!");
        self.result_path = Some(result_path);
        Ok(transition)
    }

    /// Fail with a description
    pub fn fail(&mut self, error: impl Into<String>) -> Result<StateTransition, IllegalTransition> {
        let transition = self.transition_to(JobState::Failed)?;
        let error = error.into();
        self.progress_note = error.clone();
        self.error = Some(error);
        Ok(transition)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Job table plus the id → output file mapping
///
/// One writer per job (its worker) and any number of pollers.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    outputs: RwLock<HashMap<Uuid, PathBuf>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.id, job);
    }

    /// Snapshot of a job
    pub fn get(&self, id: &Uuid) -> Option<Job> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Mutate a job in place
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
            .map(f)
    }

    pub fn set_progress(&self, id: &Uuid, note: impl Into<String>) {
        let note = note.into();
        self.update(id, |job| {
            if !job.is_terminal() {
                job.progress_note = note;
            }
        });
    }

    pub fn record_output(&self, id: Uuid, path: PathBuf) {
        self.outputs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, path);
    }

    /// Output file recorded for `id` in this process
    pub fn output_path(&self, id: &Uuid) -> Option<PathBuf> {
        self.outputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Drop mappings whose file is gone (e.g. swept)
    pub fn forget_missing_outputs(&self) -> usize {
        let mut outputs = self.outputs.write().unwrap_or_else(PoisonError::into_inner);
        let before = outputs.len();
        outputs.retain(|_, path| Path::new(path).exists());
        before - outputs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
