//! Event types for the bomcat enrichment event system
//!
//! Provides the shared event definitions and EventBus used by the
//! enrichment orchestrator, the progress broadcast hub, and the SSE layer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Job-level status for a BOM enrichment job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Enriching,
    Paused,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    /// Terminal statuses end the job's progress stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Enriching => "enriching",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }
}

/// Aggregate progress counters for one BOM job
///
/// Every progress event carries a full snapshot of these counters, so a
/// subscriber joining mid-job never needs to reconstruct state from deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub total_items: usize,
    pub enriched_items: usize,
    pub failed_items: usize,
    pub pending_items: usize,
    /// 0.0..=100.0, monotonically non-decreasing within a job
    pub percent_complete: f64,
    pub status: JobStatus,
}

impl JobProgress {
    /// Fresh progress snapshot for a job that has not started any items
    pub fn pending(job_id: Uuid, total_items: usize) -> Self {
        Self {
            job_id,
            total_items,
            enriched_items: 0,
            failed_items: 0,
            pending_items: total_items,
            percent_complete: 0.0,
            status: JobStatus::Pending,
        }
    }

    /// Recompute derived fields from the counters
    pub fn recompute(&mut self) {
        self.pending_items = self
            .total_items
            .saturating_sub(self.enriched_items + self.failed_items);
        self.percent_complete = if self.total_items == 0 {
            100.0
        } else {
            (self.enriched_items + self.failed_items) as f64 / self.total_items as f64 * 100.0
        };
    }
}

/// bomcat enrichment event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Every variant carries the full JobProgress snapshot (wire contract:
/// payload always includes the aggregate counters).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnrichEvent {
    /// Initial snapshot sent when an observer attaches to a job stream
    Connected {
        job_id: Uuid,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job started processing line items
    Started {
        job_id: Uuid,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic counter update (one per line-item completion)
    Progress {
        job_id: Uuid,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One line item enriched successfully
    ComponentCompleted {
        job_id: Uuid,
        line_id: Uuid,
        mpn: String,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One line item failed enrichment
    ///
    /// Carries no error detail; per-item error messages live only in the
    /// audit trail for operator inspection.
    ComponentFailed {
        job_id: Uuid,
        line_id: Uuid,
        mpn: String,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every line item has produced a terminal enrichment run
    Completed {
        job_id: Uuid,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Non-recoverable orchestration-level failure
    Error {
        job_id: Uuid,
        /// Generic failure description, never a per-line stack trace
        message: String,
        progress: JobProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl EnrichEvent {
    pub fn connected(progress: JobProgress) -> Self {
        EnrichEvent::Connected {
            job_id: progress.job_id,
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn started(progress: JobProgress) -> Self {
        EnrichEvent::Started {
            job_id: progress.job_id,
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn progress_update(progress: JobProgress) -> Self {
        EnrichEvent::Progress {
            job_id: progress.job_id,
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn component_completed(progress: JobProgress, line_id: Uuid, mpn: String) -> Self {
        EnrichEvent::ComponentCompleted {
            job_id: progress.job_id,
            line_id,
            mpn,
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn component_failed(progress: JobProgress, line_id: Uuid, mpn: String) -> Self {
        EnrichEvent::ComponentFailed {
            job_id: progress.job_id,
            line_id,
            mpn,
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn completed(progress: JobProgress) -> Self {
        EnrichEvent::Completed {
            job_id: progress.job_id,
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(progress: JobProgress, message: impl Into<String>) -> Self {
        EnrichEvent::Error {
            job_id: progress.job_id,
            message: message.into(),
            progress,
            timestamp: chrono::Utc::now(),
        }
    }

    /// SSE event name for this variant (wire contract)
    pub fn event_type(&self) -> &'static str {
        match self {
            EnrichEvent::Connected { .. } => "connected",
            EnrichEvent::Started { .. } => "enrichment.started",
            EnrichEvent::Progress { .. } => "enrichment.progress",
            EnrichEvent::ComponentCompleted { .. } => "enrichment.component.completed",
            EnrichEvent::ComponentFailed { .. } => "enrichment.component.failed",
            EnrichEvent::Completed { .. } => "enrichment.completed",
            EnrichEvent::Error { .. } => "enrichment.error",
        }
    }

    /// Job this event belongs to
    pub fn job_id(&self) -> Uuid {
        match self {
            EnrichEvent::Connected { job_id, .. }
            | EnrichEvent::Started { job_id, .. }
            | EnrichEvent::Progress { job_id, .. }
            | EnrichEvent::ComponentCompleted { job_id, .. }
            | EnrichEvent::ComponentFailed { job_id, .. }
            | EnrichEvent::Completed { job_id, .. }
            | EnrichEvent::Error { job_id, .. } => *job_id,
        }
    }

    /// Counter snapshot carried by this event
    pub fn progress(&self) -> &JobProgress {
        match self {
            EnrichEvent::Connected { progress, .. }
            | EnrichEvent::Started { progress, .. }
            | EnrichEvent::Progress { progress, .. }
            | EnrichEvent::ComponentCompleted { progress, .. }
            | EnrichEvent::ComponentFailed { progress, .. }
            | EnrichEvent::Completed { progress, .. }
            | EnrichEvent::Error { progress, .. } => progress,
        }
    }

    /// True for events that end a job's stream (completed/error)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnrichEvent::Completed { .. } | EnrichEvent::Error { .. }
        )
    }
}

/// Central event distribution bus for enrichment events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EnrichEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EnrichEvent,
    ) -> Result<usize, broadcast::error::SendError<EnrichEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EnrichEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(job_id: Uuid) -> JobProgress {
        JobProgress::pending(job_id, 10)
    }

    #[test]
    fn test_event_type_names_match_wire_contract() {
        let job_id = Uuid::new_v4();
        let p = progress(job_id);
        let now = chrono::Utc::now();

        let cases: Vec<(EnrichEvent, &str)> = vec![
            (
                EnrichEvent::Connected { job_id, progress: p.clone(), timestamp: now },
                "connected",
            ),
            (
                EnrichEvent::Started { job_id, progress: p.clone(), timestamp: now },
                "enrichment.started",
            ),
            (
                EnrichEvent::Progress { job_id, progress: p.clone(), timestamp: now },
                "enrichment.progress",
            ),
            (
                EnrichEvent::ComponentCompleted {
                    job_id,
                    line_id: Uuid::new_v4(),
                    mpn: "GRM188R71C104KA01D".to_string(),
                    progress: p.clone(),
                    timestamp: now,
                },
                "enrichment.component.completed",
            ),
            (
                EnrichEvent::ComponentFailed {
                    job_id,
                    line_id: Uuid::new_v4(),
                    mpn: "GRM188R71C104KA01D".to_string(),
                    progress: p.clone(),
                    timestamp: now,
                },
                "enrichment.component.failed",
            ),
            (
                EnrichEvent::Completed { job_id, progress: p.clone(), timestamp: now },
                "enrichment.completed",
            ),
            (
                EnrichEvent::Error {
                    job_id,
                    message: "orchestration fault".to_string(),
                    progress: p,
                    timestamp: now,
                },
                "enrichment.error",
            ),
        ];

        for (event, expected) in cases {
            assert_eq!(event.event_type(), expected);
            assert_eq!(event.job_id(), job_id);
        }
    }

    #[test]
    fn test_terminal_events() {
        let job_id = Uuid::new_v4();
        let p = progress(job_id);
        let now = chrono::Utc::now();

        assert!(EnrichEvent::Completed { job_id, progress: p.clone(), timestamp: now }
            .is_terminal());
        assert!(EnrichEvent::Error {
            job_id,
            message: "x".to_string(),
            progress: p.clone(),
            timestamp: now
        }
        .is_terminal());
        assert!(!EnrichEvent::Progress { job_id, progress: p, timestamp: now }.is_terminal());
    }

    #[test]
    fn test_progress_recompute() {
        let mut p = JobProgress::pending(Uuid::new_v4(), 10);
        assert_eq!(p.pending_items, 10);
        assert_eq!(p.percent_complete, 0.0);

        p.enriched_items = 3;
        p.failed_items = 1;
        p.recompute();
        assert_eq!(p.pending_items, 6);
        assert!((p.percent_complete - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_recompute_empty_job() {
        let mut p = JobProgress::pending(Uuid::new_v4(), 0);
        p.recompute();
        assert_eq!(p.percent_complete, 100.0);
        assert_eq!(p.pending_items, 0);
    }

    #[test]
    fn test_eventbus_emit_and_subscribe() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let job_id = Uuid::new_v4();
        bus.emit(EnrichEvent::Started {
            job_id,
            progress: progress(job_id),
            timestamp: chrono::Utc::now(),
        })
        .expect("emit should succeed");

        let received = rx.try_recv().expect("should receive event");
        assert_eq!(received.event_type(), "enrichment.started");
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let job_id = Uuid::new_v4();
        bus.emit_lossy(EnrichEvent::Progress {
            job_id,
            progress: progress(job_id),
            timestamp: chrono::Utc::now(),
        });

        assert_eq!(rx1.try_recv().unwrap().event_type(), "enrichment.progress");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "enrichment.progress");
    }

    #[test]
    fn test_eventbus_emit_lossy_no_subscribers() {
        let bus = EventBus::new(2);
        let job_id = Uuid::new_v4();
        // No subscribers, must not panic
        bus.emit_lossy(EnrichEvent::Completed {
            job_id,
            progress: progress(job_id),
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let job_id = Uuid::new_v4();
        let event = EnrichEvent::ComponentCompleted {
            job_id,
            line_id: Uuid::new_v4(),
            mpn: "STM32F103C8T6".to_string(),
            progress: progress(job_id),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"ComponentCompleted\""));
        assert!(json.contains("\"total_items\":10"));

        let back: EnrichEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.event_type(), "enrichment.component.completed");
    }
}
