//! Engine event bus
//!
//! Every significant scheduling action emits an `EngineEvent` to a tokio
//! broadcast channel. This is the notification-sink boundary: the daemon's
//! logging sink and tests subscribe, the engine never waits on consumers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Lifecycle events emitted by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A job was registered and scheduled
    JobCreated { job_id: String, name: String },

    /// A job and its history were removed
    JobDeleted { job_id: String },

    /// A job passed the dependency gate and entered the queue
    JobQueued { job_id: String },

    /// Admission was skipped because a dependency is not Completed
    DependencyDeferred { job_id: String, dependency: String },

    /// An attempt was dispatched to a worker
    ExecutionStarted {
        job_id: String,
        execution_id: String,
        worker_id: String,
    },

    /// An attempt reached a terminal state
    ExecutionFinished {
        job_id: String,
        execution_id: String,
        success: bool,
        duration_ms: i64,
    },

    /// A failed job will be re-offered after the backoff delay
    RetryScheduled {
        job_id: String,
        retry_count: u32,
        delay_ms: u64,
    },

    /// Retries exhausted, the job is terminally Failed
    JobFailed { job_id: String, retry_count: u32 },
}

impl EngineEvent {
    /// Event type name for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JobCreated { .. } => "JobCreated",
            Self::JobDeleted { .. } => "JobDeleted",
            Self::JobQueued { .. } => "JobQueued",
            Self::DependencyDeferred { .. } => "DependencyDeferred",
            Self::ExecutionStarted { .. } => "ExecutionStarted",
            Self::ExecutionFinished { .. } => "ExecutionFinished",
            Self::RetryScheduled { .. } => "RetryScheduled",
            Self::JobFailed { .. } => "JobFailed",
        }
    }

    /// The job this event concerns
    pub fn job_id(&self) -> &str {
        match self {
            Self::JobCreated { job_id, .. }
            | Self::JobDeleted { job_id }
            | Self::JobQueued { job_id }
            | Self::DependencyDeferred { job_id, .. }
            | Self::ExecutionStarted { job_id, .. }
            | Self::ExecutionFinished { job_id, .. }
            | Self::RetryScheduled { job_id, .. }
            | Self::JobFailed { job_id, .. } => job_id,
        }
    }
}

/// Broadcast bus for engine events
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: no subscribers is fine, slow subscribers lag.
    pub fn emit(&self, event: EngineEvent) {
        debug!(event_type = event.event_type(), job_id = event.job_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_event_bus_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.emit(EngineEvent::JobQueued {
            job_id: "job-1".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(EngineEvent::JobCreated {
            job_id: "job-1".to_string(),
            name: "Backup".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "JobCreated");
        assert_eq!(event.job_id(), "job-1");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(EngineEvent::JobDeleted {
            job_id: "job-1".to_string(),
        });

        assert_eq!(rx1.recv().await.unwrap().job_id(), "job-1");
        assert_eq!(rx2.recv().await.unwrap().job_id(), "job-1");
        assert!(matches!(rx1.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_event_serde_round_trip() {
        let event = EngineEvent::ExecutionFinished {
            job_id: "job-1".to_string(),
            execution_id: "exec-1".to_string(),
            success: true,
            duration_ms: 1200,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "ExecutionFinished");
    }
}
