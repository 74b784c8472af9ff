//! Execution queue
//!
//! Holds jobs that passed the dependency gate but are not yet bound to a
//! worker. Ordering is by priority (High before Medium before Low) with
//! FIFO stability among equal priorities, re-established by a stable sort
//! on every drain rather than maintained incrementally.

use crate::domain::Priority;

/// One queued job awaiting dispatch
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: String,
    pub priority: Priority,
    /// Admission order, monotonically increasing; the FIFO tie-breaker
    seq: u64,
}

/// Priority queue of admitted jobs
#[derive(Default)]
pub struct ExecutionQueue {
    entries: Vec<QueuedJob>,
    next_seq: u64,
}

impl ExecutionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a job; refuses duplicates
    pub fn push(&mut self, job_id: impl Into<String>, priority: Priority) -> bool {
        let job_id = job_id.into();
        if self.contains(&job_id) {
            return false;
        }
        self.entries.push(QueuedJob {
            job_id,
            priority,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        true
    }

    /// Whether a job is already queued
    pub fn contains(&self, job_id: &str) -> bool {
        self.entries.iter().any(|e| e.job_id == job_id)
    }

    /// Drop a job's entry, e.g. on delete or pause
    pub fn remove(&mut self, job_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.job_id != job_id);
        self.entries.len() != before
    }

    /// Re-establish drain order: priority descending, admission order within
    pub fn sort_for_drain(&mut self) {
        self.entries
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
    }

    /// Head of the queue in current order
    pub fn front(&self) -> Option<&QueuedJob> {
        self.entries.first()
    }

    /// Remove and return the head of the queue
    pub fn pop_front(&mut self) -> Option<QueuedJob> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
