//! Scheduler handle
//!
//! Cloneable client for the SchedulerCore actor. Each request puts a
//! command and a oneshot reply channel on the actor's queue; a closed
//! channel in either direction surfaces as `ChannelClosed`.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::domain::{Job, JobExecution, JobPatch, JobSpec, JobStatus, Worker};
use crate::events::{EngineEvent, EventBus};
use crate::executor::JobExecutor;
use crate::metrics::{SystemMetrics, SystemStats};
use crate::pool::WorkerPool;

use super::config::SchedulerConfig;
use super::core::SchedulerCore;
use super::messages::{SchedulerCommand, SchedulerError, SchedulerResponse};

/// Handle to a running scheduling engine
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::Sender<SchedulerCommand>,
    bus: Arc<EventBus>,
}

impl Scheduler {
    /// Spawn the engine actor and return a handle to it
    pub fn spawn(config: SchedulerConfig, pool: WorkerPool, executor: Arc<dyn JobExecutor>) -> Self {
        let bus = Arc::new(EventBus::with_default_capacity());
        let core = SchedulerCore::new(config, pool, executor, bus.clone());
        let tx = core.sender();
        tokio::spawn(core.run());
        Self { tx, bus }
    }

    /// Register a new job; it becomes Active with a trigger installed
    pub async fn create_job(&self, spec: JobSpec) -> SchedulerResponse<Job> {
        debug!(name = %spec.name, "Scheduler::create_job: called");
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::CreateJob { spec, reply }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Patch fields of an existing job
    pub async fn update_job(&self, id: &str, patch: JobPatch) -> SchedulerResponse<Job> {
        debug!(job_id = %id, "Scheduler::update_job: called");
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::UpdateJob {
            id: id.to_string(),
            patch,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Remove a job, its trigger, and its history
    pub async fn delete_job(&self, id: &str) -> SchedulerResponse<()> {
        debug!(job_id = %id, "Scheduler::delete_job: called");
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::DeleteJob {
            id: id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Fetch one job by id
    pub async fn get_job(&self, id: &str) -> SchedulerResponse<Job> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::GetJob {
            id: id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Snapshot of all jobs, ordered by creation time
    pub async fn list_jobs(&self) -> SchedulerResponse<Vec<Job>> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::ListJobs { reply }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    /// Move a job between Active and Paused
    pub async fn toggle_job(&self, id: &str, status: JobStatus) -> SchedulerResponse<Job> {
        debug!(job_id = %id, %status, "Scheduler::toggle_job: called");
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::ToggleJob {
            id: id.to_string(),
            status,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Offer a job for immediate execution, bypassing its schedule
    pub async fn run_job_now(&self, id: &str) -> SchedulerResponse<()> {
        debug!(job_id = %id, "Scheduler::run_job_now: called");
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::RunJobNow {
            id: id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Execution history for one job, oldest first
    pub async fn get_job_history(&self, id: &str) -> SchedulerResponse<Vec<JobExecution>> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::GetJobHistory {
            id: id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)?
    }

    /// Current job and worker counts
    pub async fn get_system_stats(&self) -> SchedulerResponse<SystemStats> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::GetSystemStats { reply }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    /// Aggregate execution metrics since startup
    pub async fn get_system_metrics(&self) -> SchedulerResponse<SystemMetrics> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::GetSystemMetrics { reply }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    /// Snapshot of the worker fleet
    pub async fn list_workers(&self) -> SchedulerResponse<Vec<Worker>> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerCommand::ListWorkers { reply }).await?;
        rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    /// Subscribe to engine lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Stop the engine; in-flight attempts are abandoned
    pub async fn shutdown(&self) -> SchedulerResponse<()> {
        debug!("Scheduler::shutdown: called");
        self.send(SchedulerCommand::Shutdown).await
    }

    async fn send(&self, cmd: SchedulerCommand) -> SchedulerResponse<()> {
        self.tx.send(cmd).await.map_err(|_| SchedulerError::ChannelClosed)
    }
}
