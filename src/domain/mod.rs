//! Domain types for jobdaemon
//!
//! Core domain types: Job, JobExecution, Worker, Priority.
//! All records timestamp with Unix milliseconds via `now_ms`.

mod execution;
mod id;
mod job;
mod priority;
mod worker;

pub use execution::{ExecutionStatus, JobExecution};
pub use id::generate_id;
pub use job::{Job, JobPatch, JobSpec, JobStatus};
pub use priority::Priority;
pub use worker::{Worker, WorkerStatus};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
