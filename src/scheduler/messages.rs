//! Scheduler messages
//!
//! Commands and errors for the actor pattern: every external operation and
//! every internal timer-driven event arrives at the SchedulerCore as one of
//! these, so all shared state mutates on a single task.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Job, JobExecution, JobPatch, JobSpec, JobStatus, Worker};
use crate::metrics::{SystemMetrics, SystemStats};

/// Errors surfaced to callers of the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid job definition: {0}")]
    Validation(String),

    #[error("Job is already running: {0}")]
    NotRunnable(String),

    #[error("Scheduler channel closed")]
    ChannelClosed,
}

/// Response from scheduler operations
pub type SchedulerResponse<T> = Result<T, SchedulerError>;

/// Commands processed by the SchedulerCore actor
#[derive(Debug)]
pub enum SchedulerCommand {
    // External operations
    CreateJob {
        spec: JobSpec,
        reply: oneshot::Sender<SchedulerResponse<Job>>,
    },
    UpdateJob {
        id: String,
        patch: JobPatch,
        reply: oneshot::Sender<SchedulerResponse<Job>>,
    },
    DeleteJob {
        id: String,
        reply: oneshot::Sender<SchedulerResponse<()>>,
    },
    GetJob {
        id: String,
        reply: oneshot::Sender<SchedulerResponse<Job>>,
    },
    ListJobs {
        reply: oneshot::Sender<Vec<Job>>,
    },
    ToggleJob {
        id: String,
        status: JobStatus,
        reply: oneshot::Sender<SchedulerResponse<Job>>,
    },
    RunJobNow {
        id: String,
        reply: oneshot::Sender<SchedulerResponse<()>>,
    },
    GetJobHistory {
        id: String,
        reply: oneshot::Sender<SchedulerResponse<Vec<JobExecution>>>,
    },
    GetSystemStats {
        reply: oneshot::Sender<SystemStats>,
    },
    GetSystemMetrics {
        reply: oneshot::Sender<SystemMetrics>,
    },
    ListWorkers {
        reply: oneshot::Sender<Vec<Worker>>,
    },

    // Internal events
    /// A schedule trigger fired or a backoff elapsed: offer the job to the queue
    Offer { job_id: String },

    /// A spawned attempt finished; Err carries the failure detail
    AttemptFinished {
        job_id: String,
        exec_id: String,
        worker_id: String,
        outcome: Result<(), String>,
    },

    /// Periodic drain tick
    DrainTick,

    /// Periodic worker utilization refresh
    RefreshUtilization,

    /// Stop triggers, cancel backoffs, end the actor
    Shutdown,
}
