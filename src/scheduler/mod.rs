//! Scheduling engine
//!
//! The engine runs as a single actor owning all scheduling state:
//! - **Admission:** trigger firings, retries, and run-now requests pass
//!   the dependency gate into the execution queue
//! - **Drain:** queued jobs bind to least-loaded workers in priority order
//! - **Retry:** failed attempts back off linearly up to the job's limit

mod config;
mod core;
mod handle;
mod messages;
mod queue;

pub use config::SchedulerConfig;
pub use core::SchedulerCore;
pub use handle::Scheduler;
pub use messages::{SchedulerCommand, SchedulerError, SchedulerResponse};
pub use queue::{ExecutionQueue, QueuedJob};
