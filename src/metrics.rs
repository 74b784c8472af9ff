//! Aggregate stats and metrics derived from registry and pool state
//!
//! Pure read-side computation: the scheduler actor calls these against the
//! registry and pool it owns, so every result is a consistent snapshot.
//! Nothing here is cached.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionStatus, JobStatus};
use crate::pool::WorkerPool;
use crate::registry::JobRegistry;

/// Job counts by status plus worker availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_jobs: usize,
    pub running_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub active_workers: usize,
}

/// Execution-level aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Seconds since the engine started
    pub uptime_secs: u64,

    /// Attempts recorded across all jobs, any status
    pub total_executions: usize,

    /// Rounded percentage of completed attempts, 0 when none exist
    pub success_rate: u32,

    /// Mean duration over completed attempts only
    pub avg_execution_time_ms: f64,
}

/// Derive job/worker counts from current state
pub fn compute_stats(registry: &JobRegistry, pool: &WorkerPool) -> SystemStats {
    SystemStats {
        total_jobs: registry.len(),
        running_jobs: registry.count_by_status(JobStatus::Running),
        completed_jobs: registry.count_by_status(JobStatus::Completed),
        failed_jobs: registry.count_by_status(JobStatus::Failed),
        active_workers: pool.active_count(),
    }
}

/// Derive execution aggregates from history
pub fn compute_metrics(registry: &JobRegistry, uptime: Duration) -> SystemMetrics {
    let mut total = 0usize;
    let mut completed = 0usize;
    let mut completed_duration_ms = 0i64;

    for execution in registry.all_executions() {
        total += 1;
        if execution.status == ExecutionStatus::Completed {
            completed += 1;
            completed_duration_ms += execution.duration_ms.unwrap_or(0);
        }
    }

    let success_rate = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };
    let avg_execution_time_ms = if completed == 0 {
        0.0
    } else {
        completed_duration_ms as f64 / completed as f64
    };

    SystemMetrics {
        uptime_secs: uptime.as_secs(),
        total_executions: total,
        success_rate,
        avg_execution_time_ms,
    }
}
