//! Retention sweeper
//!
//! Deletes output artifacts older than the retention window.

use crate::jobs::JobOrchestrator;
use chrono::Utc;
use slush_common::events::{EventBus, SlushEvent};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

/// Default maximum artifact age
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct RetentionSweeper {
    output_dir: PathBuf,
    retention: Duration,
    /// Jobs whose output mappings are pruned after each sweep
    jobs: Option<JobOrchestrator>,
}

impl RetentionSweeper {
    pub fn new(output_dir: PathBuf, retention: Duration) -> Self {
        Self {
            output_dir,
            retention,
            jobs: None,
        }
    }

    /// Forget output mappings of `jobs` once their files are swept
    pub fn with_jobs(mut self, jobs: JobOrchestrator) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Delete every regular file modified strictly before `now - retention`
    ///
    /// Returns the number of files deleted. A missing directory counts as
    /// zero; files that cannot be inspected or removed are logged and skipped.
    pub fn sweep(&self, now: SystemTime) -> usize {
        let cutoff = match now.checked_sub(self.retention) {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::info!(
                    dir = %self.output_dir.display(),
                    error = %e,
                    "Output directory not found, nothing to sweep"
                );
                return 0;
            }
        };

        let mut deleted = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();

            let modified = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                Err(e) => Err(e),
            };
            let modified = match modified {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read modification time"
                    );
                    continue;
                }
            };

            if modified < cutoff {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::debug!(path = %path.display(), "Deleted expired artifact");
                        deleted += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to delete expired artifact"
                        )
                    }
                }
            }
        }

        tracing::info!(dir = %self.output_dir.display(), deleted, "Retention sweep finished");
        deleted
    }

    /// Sweep every `interval` on the blocking pool, announcing each run
    pub fn spawn(self, interval: Duration, event_bus: EventBus) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let sweeper = self.clone();
                let swept = tokio::task::spawn_blocking(move || {
                    let deleted = sweeper.sweep(SystemTime::now());
                    if let Some(jobs) = &sweeper.jobs {
                        let forgotten = jobs.store().forget_missing_outputs();
                        if forgotten > 0 {
                            tracing::debug!(forgotten, "Dropped output mappings of swept files");
                        }
                    }
                    deleted
                });
                match swept.await {
                    Ok(deleted) => event_bus.emit_lossy(SlushEvent::ArtifactsSwept {
                        deleted,
                        timestamp: Utc::now(),
                    }),
                    Err(e) => tracing::error!(error = %e, "Retention sweep task failed"),
                }
            }
        })
    }
}
