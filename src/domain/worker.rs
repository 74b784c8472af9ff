//! Worker domain type
//!
//! A Worker is a bounded execution slot, not a remote machine: it caps how
//! many attempts may run through it simultaneously. Utilization figures are
//! externally reported and never drive allocation.

use serde::{Deserialize, Serialize};

/// Worker availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Has spare capacity
    #[default]
    Active,
    /// At capacity, skipped by acquire
    Busy,
    /// Administratively removed from allocation
    Offline,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Busy => write!(f, "busy"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A bounded execution resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Host the slot notionally lives on
    pub host: String,

    /// Derived from load and the administrative offline flag
    pub status: WorkerStatus,

    /// Attempts currently bound to this worker
    pub active_jobs: u32,

    /// Maximum simultaneous attempts
    pub max_jobs: u32,

    /// Reported CPU utilization percentage, cosmetic only
    pub cpu_usage: f64,

    /// Reported memory utilization percentage, cosmetic only
    pub memory_usage: f64,
}

impl Worker {
    /// Create an idle Active worker
    pub fn new(id: impl Into<String>, name: impl Into<String>, host: impl Into<String>, max_jobs: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            status: WorkerStatus::Active,
            active_jobs: 0,
            max_jobs,
            cpu_usage: 0.0,
            memory_usage: 0.0,
        }
    }

    /// Whether acquire may select this worker
    pub fn has_capacity(&self) -> bool {
        self.status != WorkerStatus::Offline && self.active_jobs < self.max_jobs
    }

    /// Re-derive status from load; Offline is sticky until cleared
    pub fn recompute_status(&mut self) {
        if self.status == WorkerStatus::Offline {
            return;
        }
        self.status = if self.active_jobs >= self.max_jobs {
            WorkerStatus::Busy
        } else {
            WorkerStatus::Active
        };
    }

    /// Set or clear the administrative offline flag
    pub fn set_offline(&mut self, offline: bool) {
        if offline {
            self.status = WorkerStatus::Offline;
        } else {
            self.status = WorkerStatus::Active;
            self.recompute_status();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_new() {
        let worker = Worker::new("worker-1", "Worker Node 1", "192.168.1.10", 5);
        assert_eq!(worker.status, WorkerStatus::Active);
        assert_eq!(worker.active_jobs, 0);
        assert_eq!(worker.max_jobs, 5);
        assert!(worker.has_capacity());
    }

    #[test]
    fn test_worker_status_recompute() {
        let mut worker = Worker::new("worker-1", "w1", "localhost", 2);
        worker.active_jobs = 1;
        worker.recompute_status();
        assert_eq!(worker.status, WorkerStatus::Active);

        worker.active_jobs = 2;
        worker.recompute_status();
        assert_eq!(worker.status, WorkerStatus::Busy);
        assert!(!worker.has_capacity());
    }

    #[test]
    fn test_worker_offline_sticky() {
        let mut worker = Worker::new("worker-1", "w1", "localhost", 2);
        worker.set_offline(true);
        assert_eq!(worker.status, WorkerStatus::Offline);
        assert!(!worker.has_capacity());

        // Load changes must not resurrect an offline worker
        worker.recompute_status();
        assert_eq!(worker.status, WorkerStatus::Offline);

        worker.set_offline(false);
        assert_eq!(worker.status, WorkerStatus::Active);
    }

    #[test]
    fn test_worker_offline_clear_respects_load() {
        let mut worker = Worker::new("worker-1", "w1", "localhost", 1);
        worker.active_jobs = 1;
        worker.set_offline(true);
        worker.set_offline(false);
        assert_eq!(worker.status, WorkerStatus::Busy);
    }
}
