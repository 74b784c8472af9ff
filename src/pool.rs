//! Worker pool
//!
//! Owns the Worker records and is the sole mutator of their load fields.
//! Allocation is least-loaded: acquire picks the eligible worker with the
//! fewest active jobs, ties broken by registration order. The pool lives
//! inside the scheduler actor, so none of this needs its own locking.

use rand::Rng;
use tracing::{debug, warn};

use crate::domain::{Worker, WorkerStatus};

/// A fixed fleet of execution slots
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Create a pool from pre-built workers, preserving registration order
    pub fn new(workers: Vec<Worker>) -> Self {
        Self { workers }
    }

    /// The fleet the source system ships with
    pub fn with_default_fleet() -> Self {
        let mut pool = Self::new(vec![
            Worker::new("worker-1", "Worker Node 1", "192.168.1.10", 5),
            Worker::new("worker-2", "Worker Node 2", "192.168.1.11", 3),
            Worker::new("worker-3", "Worker Node 3", "192.168.1.12", 4),
        ]);
        pool.seed_utilization();
        pool
    }

    /// Snapshot of all workers
    pub fn list(&self) -> Vec<Worker> {
        self.workers.clone()
    }

    /// Look up a worker by id
    pub fn get(&self, worker_id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == worker_id)
    }

    /// Number of registered workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool has no workers
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Allocate the least-loaded eligible worker
    ///
    /// Eligible means status != Offline and active_jobs < max_jobs. Returns
    /// the worker id, or None when every worker is at capacity or offline.
    pub fn acquire(&mut self) -> Option<String> {
        let idx = self
            .workers
            .iter()
            .enumerate()
            .filter(|(_, w)| w.has_capacity())
            .min_by_key(|(_, w)| w.active_jobs)
            .map(|(idx, _)| idx)?;

        let worker = &mut self.workers[idx];
        worker.active_jobs += 1;
        worker.recompute_status();
        debug!(
            worker_id = %worker.id,
            active_jobs = worker.active_jobs,
            max_jobs = worker.max_jobs,
            "WorkerPool::acquire: slot allocated"
        );
        Some(worker.id.clone())
    }

    /// Return a slot to the pool
    pub fn release(&mut self, worker_id: &str) {
        let Some(worker) = self.workers.iter_mut().find(|w| w.id == worker_id) else {
            warn!(%worker_id, "WorkerPool::release: unknown worker");
            return;
        };
        worker.active_jobs = worker.active_jobs.saturating_sub(1);
        worker.recompute_status();
        debug!(
            %worker_id,
            active_jobs = worker.active_jobs,
            "WorkerPool::release: slot returned"
        );
    }

    /// Count of workers not administratively offline
    pub fn active_count(&self) -> usize {
        self.workers.iter().filter(|w| w.status != WorkerStatus::Offline).count()
    }

    /// Set or clear a worker's administrative offline flag
    pub fn set_offline(&mut self, worker_id: &str, offline: bool) -> bool {
        match self.workers.iter_mut().find(|w| w.id == worker_id) {
            Some(worker) => {
                worker.set_offline(offline);
                true
            }
            None => false,
        }
    }

    /// Seed plausible starting utilization figures
    pub fn seed_utilization(&mut self) {
        let mut rng = rand::rng();
        for worker in &mut self.workers {
            worker.cpu_usage = rng.random_range(20.0..60.0);
            worker.memory_usage = rng.random_range(30.0..70.0);
        }
    }

    /// Random-walk the reported utilization of non-offline workers
    ///
    /// Cosmetic only: allocation never reads these fields.
    pub fn refresh_utilization(&mut self) {
        let mut rng = rand::rng();
        for worker in &mut self.workers {
            if worker.status == WorkerStatus::Offline {
                continue;
            }
            worker.cpu_usage = (worker.cpu_usage + rng.random_range(-10.0..10.0)).clamp(10.0, 90.0);
            worker.memory_usage = (worker.memory_usage + rng.random_range(-5.0..5.0)).clamp(20.0, 85.0);
        }
    }
}
