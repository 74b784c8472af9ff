//! JobExecution domain type
//!
//! One timestamped attempt to run a Job. Created when the scheduler
//! dispatches the job to a worker, mutated exactly once to a terminal
//! state when the attempt finishes, never deleted while the job lives.

use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::now_ms;

/// Attempt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Attempt in flight
    #[default]
    Running,
    /// Attempt succeeded
    Completed,
    /// Attempt failed
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One attempt of a Job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    /// Unique identifier
    pub id: String,

    /// Owning job ID
    pub job_id: String,

    /// Current status
    pub status: ExecutionStatus,

    /// Attempt start (Unix milliseconds)
    pub started_at: i64,

    /// Attempt end (Unix milliseconds), set once on finish
    pub ended_at: Option<i64>,

    /// Derived ended_at - started_at
    pub duration_ms: Option<i64>,

    /// Error detail, present iff status is Failed
    pub error: Option<String>,

    /// Worker slot the attempt ran on
    pub worker_id: Option<String>,
}

impl JobExecution {
    /// Create a Running execution bound to a worker
    pub fn new(job_id: impl Into<String>, job_name: &str, worker_id: impl Into<String>) -> Self {
        Self {
            id: generate_id("exec", job_name),
            job_id: job_id.into(),
            status: ExecutionStatus::Running,
            started_at: now_ms(),
            ended_at: None,
            duration_ms: None,
            error: None,
            worker_id: Some(worker_id.into()),
        }
    }

    /// Mark the attempt successful
    pub fn finish_success(&mut self) {
        let now = now_ms();
        self.status = ExecutionStatus::Completed;
        self.ended_at = Some(now);
        self.duration_ms = Some(now - self.started_at);
    }

    /// Mark the attempt failed with an error detail
    pub fn finish_failure(&mut self, error: impl Into<String>) {
        let now = now_ms();
        self.status = ExecutionStatus::Failed;
        self.ended_at = Some(now);
        self.duration_ms = Some(now - self.started_at);
        self.error = Some(error.into());
    }

    /// Whether the attempt has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}
