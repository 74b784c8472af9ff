//! Jobdaemon - single-node recurring job scheduling engine
//!
//! Jobdaemon manages a registry of recurring jobs, fires schedule triggers,
//! gates admission on named dependencies, queues eligible jobs by priority,
//! and dispatches them to a fixed fleet of bounded workers with automatic
//! retry on failure.
//!
//! # Core Concepts
//!
//! - **Single-writer state**: one actor owns every scheduling structure
//! - **Admission before dispatch**: the dependency gate runs at queue time
//! - **Least-loaded allocation**: drains bind jobs to the emptiest worker
//! - **Linear backoff**: retry N waits N times the base delay
//!
//! # Modules
//!
//! - [`scheduler`] - the engine actor, its handle, queue, and config
//! - [`domain`] - Job, JobExecution, Worker, and Priority types
//! - [`trigger`] - recurrence expressions and firing loops
//! - [`executor`] - the execution contract and simulated implementation
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod executor;
pub mod metrics;
pub mod pool;
pub mod registry;
pub mod scheduler;
pub mod trigger;

// Re-export commonly used types
pub use config::{Config, ExecutorConfig, WorkerSpec, WorkersConfig};
pub use domain::{
    ExecutionStatus, Job, JobExecution, JobPatch, JobSpec, JobStatus, Priority, Worker, WorkerStatus,
};
pub use events::{EngineEvent, EventBus};
pub use executor::{ExecutorError, JobExecutor, SimulatedExecutor};
pub use metrics::{SystemMetrics, SystemStats};
pub use pool::WorkerPool;
pub use registry::JobRegistry;
pub use scheduler::{ExecutionQueue, Scheduler, SchedulerConfig, SchedulerError, SchedulerResponse};
pub use trigger::{ScheduleTrigger, resolve_cadence};
