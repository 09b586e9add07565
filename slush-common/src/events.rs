//! Event types for Slushwave services
//!
//! Provides the shared event definitions and the EventBus used to publish job
//! lifecycle changes to SSE clients and other in-process listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Slushwave event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SlushEvent {
    /// Job accepted and waiting for a worker slot
    JobQueued {
        job_id: Uuid,
        /// "transform" or "adjust"
        kind: String,
        timestamp: DateTime<Utc>,
    },

    /// Job picked up by a worker, or moved to a new processing step
    JobProgress {
        job_id: Uuid,
        note: String,
        timestamp: DateTime<Utc>,
    },

    /// Job finished and produced an output artifact
    JobSucceeded {
        job_id: Uuid,
        result_path: String,
        timestamp: DateTime<Utc>,
    },

    /// Job terminated with an error
    JobFailed {
        job_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Retention sweep completed
    ArtifactsSwept {
        deleted: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SlushEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SlushEvent::JobQueued { .. } => "JobQueued",
            SlushEvent::JobProgress { .. } => "JobProgress",
            SlushEvent::JobSucceeded { .. } => "JobSucceeded",
            SlushEvent::JobFailed { .. } => "JobFailed",
            SlushEvent::ArtifactsSwept { .. } => "ArtifactsSwept",
        }
    }

    /// Job the event belongs to, if any
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            SlushEvent::JobQueued { job_id, .. }
            | SlushEvent::JobProgress { job_id, .. }
            | SlushEvent::JobSucceeded { job_id, .. }
            | SlushEvent::JobFailed { job_id, .. } => Some(*job_id),
            SlushEvent::ArtifactsSwept { .. } => None,
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use slush_common::events::{EventBus, SlushEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SlushEvent::ArtifactsSwept {
///     deleted: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SlushEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SlushEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SlushEvent,
    ) -> Result<usize, broadcast::error::SendError<SlushEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SlushEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        let result = bus.emit(SlushEvent::ArtifactsSwept {
            deleted: 0,
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_job_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let job_id = Uuid::new_v4();
        bus.emit(SlushEvent::JobProgress {
            job_id,
            note: "Processing audio...".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "JobProgress");
        assert_eq!(event.job_id(), Some(job_id));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SlushEvent::JobFailed {
            job_id: Uuid::nil(),
            error: "sox exited with status 2".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "JobFailed");
        assert_eq!(json["error"], "sox exited with status 2");
    }
}
