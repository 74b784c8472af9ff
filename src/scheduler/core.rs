//! SchedulerCore - the orchestration actor
//!
//! One task owns the registry, the worker pool, the execution queue, the
//! per-job triggers, and the pending backoffs. Every entry point (schedule
//! trigger firings, external requests, attempt completions, periodic ticks)
//! arrives as a `SchedulerCommand` on one channel, so a drain can never run
//! concurrently with another drain and no shared structure needs a lock.
//! The only work that happens outside this task is the attempt itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Job, JobExecution, JobPatch, JobSpec, JobStatus, now_ms};
use crate::events::{EngineEvent, EventBus};
use crate::executor::JobExecutor;
use crate::metrics::{compute_metrics, compute_stats};
use crate::pool::WorkerPool;
use crate::registry::JobRegistry;
use crate::trigger::ScheduleTrigger;

use super::config::SchedulerConfig;
use super::messages::{SchedulerCommand, SchedulerError, SchedulerResponse};
use super::queue::ExecutionQueue;

/// Command channel depth
const CHANNEL_BUFFER: usize = 256;

/// The scheduling engine actor
pub struct SchedulerCore {
    config: SchedulerConfig,
    registry: JobRegistry,
    pool: WorkerPool,
    queue: ExecutionQueue,
    /// Installed schedule triggers, keyed by job id; a job has an entry
    /// here iff its status is Active
    triggers: HashMap<String, ScheduleTrigger>,
    /// Pending backoff re-offers, keyed by job id
    backoffs: HashMap<String, JoinHandle<()>>,
    executor: Arc<dyn JobExecutor>,
    bus: Arc<EventBus>,
    started_at: Instant,
    tx: mpsc::Sender<SchedulerCommand>,
    rx: mpsc::Receiver<SchedulerCommand>,
}

impl SchedulerCore {
    /// Create the actor; call `run` to start processing
    pub fn new(config: SchedulerConfig, pool: WorkerPool, executor: Arc<dyn JobExecutor>, bus: Arc<EventBus>) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        Self {
            config,
            registry: JobRegistry::new(),
            pool,
            queue: ExecutionQueue::new(),
            triggers: HashMap::new(),
            backoffs: HashMap::new(),
            executor,
            bus,
            started_at: Instant::now(),
            tx,
            rx,
        }
    }

    /// Get a sender for creating handles
    pub fn sender(&self) -> mpsc::Sender<SchedulerCommand> {
        self.tx.clone()
    }

    /// Run the actor until shutdown
    pub async fn run(mut self) {
        let drain_tick = spawn_tick(self.tx.clone(), self.config.drain_interval(), || {
            SchedulerCommand::DrainTick
        });
        let refresh_tick = spawn_tick(self.tx.clone(), self.config.metrics_refresh(), || {
            SchedulerCommand::RefreshUtilization
        });

        info!(workers = self.pool.len(), "Scheduler started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                SchedulerCommand::CreateJob { spec, reply } => {
                    let _ = reply.send(self.create_job(spec));
                }
                SchedulerCommand::UpdateJob { id, patch, reply } => {
                    let _ = reply.send(self.update_job(&id, patch));
                }
                SchedulerCommand::DeleteJob { id, reply } => {
                    let _ = reply.send(self.delete_job(&id));
                }
                SchedulerCommand::GetJob { id, reply } => {
                    let result = self
                        .registry
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| SchedulerError::NotFound(id));
                    let _ = reply.send(result);
                }
                SchedulerCommand::ListJobs { reply } => {
                    let _ = reply.send(self.registry.list());
                }
                SchedulerCommand::ToggleJob { id, status, reply } => {
                    let _ = reply.send(self.toggle_job(&id, status));
                }
                SchedulerCommand::RunJobNow { id, reply } => {
                    let _ = reply.send(self.run_job_now(&id));
                }
                SchedulerCommand::GetJobHistory { id, reply } => {
                    let result = self
                        .registry
                        .history(&id)
                        .map(|h| h.to_vec())
                        .ok_or_else(|| SchedulerError::NotFound(id));
                    let _ = reply.send(result);
                }
                SchedulerCommand::GetSystemStats { reply } => {
                    let _ = reply.send(compute_stats(&self.registry, &self.pool));
                }
                SchedulerCommand::GetSystemMetrics { reply } => {
                    let _ = reply.send(compute_metrics(&self.registry, self.started_at.elapsed()));
                }
                SchedulerCommand::ListWorkers { reply } => {
                    let _ = reply.send(self.pool.list());
                }
                SchedulerCommand::Offer { job_id } => {
                    self.offer(&job_id, false);
                }
                SchedulerCommand::AttemptFinished {
                    job_id,
                    exec_id,
                    worker_id,
                    outcome,
                } => {
                    self.finish_attempt(&job_id, &exec_id, &worker_id, outcome);
                    // The freed slot may unblock a queued job
                    if !self.queue.is_empty() {
                        self.drain();
                    }
                }
                SchedulerCommand::DrainTick => {
                    self.drain();
                }
                SchedulerCommand::RefreshUtilization => {
                    self.pool.refresh_utilization();
                }
                SchedulerCommand::Shutdown => {
                    info!("Scheduler shutting down");
                    break;
                }
            }
        }

        for (_, mut trigger) in self.triggers.drain() {
            trigger.stop();
        }
        for (_, handle) in self.backoffs.drain() {
            handle.abort();
        }
        drain_tick.abort();
        refresh_tick.abort();

        info!("Scheduler stopped");
    }

    // === External operations ===

    fn create_job(&mut self, spec: JobSpec) -> SchedulerResponse<Job> {
        debug!(name = %spec.name, "SchedulerCore::create_job: called");
        if spec.name.trim().is_empty() {
            return Err(SchedulerError::Validation("job name must not be empty".to_string()));
        }
        if spec.command.trim().is_empty() {
            return Err(SchedulerError::Validation("job command must not be empty".to_string()));
        }
        if self.registry.name_taken(&spec.name, None) {
            return Err(SchedulerError::Validation(format!(
                "job name already in use: {}",
                spec.name
            )));
        }

        let job = Job::from_spec(spec);
        let job_id = job.id.clone();
        let name = job.name.clone();
        self.registry.insert(job);
        self.install_trigger(&job_id);

        self.bus.emit(EngineEvent::JobCreated {
            job_id: job_id.clone(),
            name,
        });

        // Trigger was just installed, so next_run is populated
        self.registry
            .get(&job_id)
            .cloned()
            .ok_or(SchedulerError::NotFound(job_id))
    }

    fn update_job(&mut self, id: &str, patch: JobPatch) -> SchedulerResponse<Job> {
        debug!(job_id = %id, "SchedulerCore::update_job: called");
        if !self.registry.contains(id) {
            return Err(SchedulerError::NotFound(id.to_string()));
        }
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(SchedulerError::Validation("job name must not be empty".to_string()));
            }
            if self.registry.name_taken(name, Some(id)) {
                return Err(SchedulerError::Validation(format!("job name already in use: {}", name)));
            }
        }

        let schedule_changed = {
            let Some(job) = self.registry.get_mut(id) else {
                return Err(SchedulerError::NotFound(id.to_string()));
            };
            let changed = patch.schedule.as_ref().is_some_and(|s| *s != job.schedule);
            patch.apply(job);
            changed
        };

        // A new expression means a new cadence: uninstall and reinstall
        // atomically (replacing the map entry stops the old firing loop)
        if schedule_changed && self.triggers.contains_key(id) {
            debug!(job_id = %id, "SchedulerCore::update_job: schedule changed, reinstalling trigger");
            self.install_trigger(id);
        }

        self.registry
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))
    }

    fn delete_job(&mut self, id: &str) -> SchedulerResponse<()> {
        debug!(job_id = %id, "SchedulerCore::delete_job: called");
        if !self.registry.contains(id) {
            return Err(SchedulerError::NotFound(id.to_string()));
        }

        self.uninstall_trigger(id);
        self.cancel_backoff(id);
        self.queue.remove(id);
        self.registry.remove(id);

        self.bus.emit(EngineEvent::JobDeleted { job_id: id.to_string() });
        Ok(())
    }

    fn toggle_job(&mut self, id: &str, status: JobStatus) -> SchedulerResponse<Job> {
        debug!(job_id = %id, %status, "SchedulerCore::toggle_job: called");
        if !matches!(status, JobStatus::Active | JobStatus::Paused) {
            return Err(SchedulerError::Validation(format!(
                "toggle target must be active or paused, got {}",
                status
            )));
        }
        if !self.registry.contains(id) {
            return Err(SchedulerError::NotFound(id.to_string()));
        }

        match status {
            JobStatus::Active => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.set_status(JobStatus::Active);
                    // Re-activation starts a fresh retry chain
                    job.retry_count = 0;
                }
                self.install_trigger(id);
            }
            JobStatus::Paused => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.set_status(JobStatus::Paused);
                }
                self.uninstall_trigger(id);
                self.cancel_backoff(id);
                self.queue.remove(id);
            }
            _ => {}
        }

        self.registry
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))
    }

    fn run_job_now(&mut self, id: &str) -> SchedulerResponse<()> {
        debug!(job_id = %id, "SchedulerCore::run_job_now: called");
        let Some(job) = self.registry.get(id) else {
            return Err(SchedulerError::NotFound(id.to_string()));
        };
        if job.is_running() {
            return Err(SchedulerError::NotRunnable(id.to_string()));
        }
        // Bypasses the schedule, not the dependency gate or the queue
        self.offer(id, true);
        Ok(())
    }

    // === Admission and drain ===

    /// Offer a job to the queue, subject to the dependency gate
    ///
    /// `manual` offers come from run-now and admit any non-Running job;
    /// trigger and backoff offers only admit Active jobs.
    fn offer(&mut self, job_id: &str, manual: bool) {
        if self.backoffs.get(job_id).is_some_and(|h| h.is_finished()) {
            self.backoffs.remove(job_id);
        }

        let Some(job) = self.registry.get(job_id) else {
            debug!(%job_id, "SchedulerCore::offer: job gone, ignoring");
            return;
        };
        if !manual && job.status != JobStatus::Active {
            debug!(%job_id, status = %job.status, "SchedulerCore::offer: not active, ignoring");
            return;
        }

        if let Some(dependency) = self.registry.first_unmet_dependency(job) {
            debug!(%job_id, %dependency, "SchedulerCore::offer: dependency not completed, deferring");
            self.bus.emit(EngineEvent::DependencyDeferred {
                job_id: job_id.to_string(),
                dependency: dependency.clone(),
            });
            return;
        }

        if self.queue.push(job_id, job.priority) {
            self.bus.emit(EngineEvent::JobQueued {
                job_id: job_id.to_string(),
            });
            self.drain();
        } else {
            debug!(%job_id, "SchedulerCore::offer: already queued");
        }
    }

    /// One drain cycle: bind queued jobs to workers until either runs out
    fn drain(&mut self) {
        self.queue.sort_for_drain();
        loop {
            let Some(front) = self.queue.front() else {
                break;
            };
            let job_id = front.job_id.clone();

            // Entries can go stale between admission and drain
            let dispatchable = self
                .registry
                .get(&job_id)
                .map(|j| !j.is_running())
                .unwrap_or(false);
            if !dispatchable {
                debug!(%job_id, "SchedulerCore::drain: dropping stale queue entry");
                self.queue.pop_front();
                continue;
            }

            let Some(worker_id) = self.pool.acquire() else {
                debug!(queued = self.queue.len(), "SchedulerCore::drain: no worker capacity, stopping");
                break;
            };
            self.queue.pop_front();
            self.dispatch(&job_id, worker_id);
        }
    }

    /// Bind a job to an acquired worker and start the attempt
    fn dispatch(&mut self, job_id: &str, worker_id: String) {
        let Some(job) = self.registry.get_mut(job_id) else {
            // Job vanished after the capacity check; give the slot back
            self.pool.release(&worker_id);
            return;
        };
        job.set_status(JobStatus::Running);
        job.last_run = Some(now_ms());
        job.next_run = None;

        let execution = JobExecution::new(&job.id, &job.name, &worker_id);
        let exec_id = execution.id.clone();
        let command = job.command.clone();
        debug!(%job_id, %exec_id, %worker_id, "SchedulerCore::dispatch: called");

        // Running jobs have no trigger installed
        self.uninstall_trigger(job_id);
        self.registry.record_execution(execution);

        self.bus.emit(EngineEvent::ExecutionStarted {
            job_id: job_id.to_string(),
            execution_id: exec_id.clone(),
            worker_id: worker_id.clone(),
        });

        // The attempt runs outside the actor; its outcome comes back as a message
        let executor = self.executor.clone();
        let timeout = self.config.execution_timeout();
        let tx = self.tx.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            let outcome = match timeout {
                Some(bound) => match tokio::time::timeout(bound, executor.execute(&command)).await {
                    Ok(result) => result.map(|_| ()).map_err(|e| e.to_string()),
                    Err(_) => Err(format!("Execution timed out after {}s", bound.as_secs())),
                },
                None => executor.execute(&command).await.map(|_| ()).map_err(|e| e.to_string()),
            };
            let _ = tx
                .send(SchedulerCommand::AttemptFinished {
                    job_id,
                    exec_id,
                    worker_id,
                    outcome,
                })
                .await;
        });
    }

    /// Record an attempt outcome and decide what the job does next
    fn finish_attempt(&mut self, job_id: &str, exec_id: &str, worker_id: &str, outcome: Result<(), String>) {
        // The slot is returned exactly once, on every path out of here
        self.pool.release(worker_id);

        if !self.registry.contains(job_id) {
            debug!(%job_id, "SchedulerCore::finish_attempt: job deleted mid-flight, outcome discarded");
            return;
        }

        let success = outcome.is_ok();
        let mut duration_ms = 0;
        if let Some(execution) = self.registry.execution_mut(job_id, exec_id) {
            match &outcome {
                Ok(()) => execution.finish_success(),
                Err(detail) => execution.finish_failure(detail.clone()),
            }
            duration_ms = execution.duration_ms.unwrap_or(0);
        } else {
            warn!(%job_id, %exec_id, "SchedulerCore::finish_attempt: execution record missing");
        }

        self.bus.emit(EngineEvent::ExecutionFinished {
            job_id: job_id.to_string(),
            execution_id: exec_id.to_string(),
            success,
            duration_ms,
        });

        let (status, retry_count, max_retries) = {
            let Some(job) = self.registry.get(job_id) else {
                return;
            };
            (job.status, job.retry_count, job.max_retries)
        };

        // Paused or re-toggled while the attempt ran: the outcome is in the
        // history, but the lifecycle does not advance and no retry fires
        if status != JobStatus::Running {
            debug!(%job_id, %status, "SchedulerCore::finish_attempt: job left Running state mid-flight");
            return;
        }

        if success {
            if let Some(job) = self.registry.get_mut(job_id) {
                job.set_status(JobStatus::Completed);
                job.retry_count = 0;
            }
            return;
        }

        let retry_count = (retry_count + 1).min(max_retries);
        if let Some(job) = self.registry.get_mut(job_id) {
            job.retry_count = retry_count;
        }

        if retry_count < max_retries {
            if let Some(job) = self.registry.get_mut(job_id) {
                job.set_status(JobStatus::Active);
            }
            self.install_trigger(job_id);

            let delay = self.config.retry_base_delay() * retry_count;
            debug!(%job_id, retry_count, delay_ms = delay.as_millis() as u64, "SchedulerCore::finish_attempt: scheduling retry");
            self.schedule_backoff(job_id, delay);
            self.bus.emit(EngineEvent::RetryScheduled {
                job_id: job_id.to_string(),
                retry_count,
                delay_ms: delay.as_millis() as u64,
            });
        } else {
            if let Some(job) = self.registry.get_mut(job_id) {
                job.set_status(JobStatus::Failed);
            }
            warn!(%job_id, retry_count, "SchedulerCore::finish_attempt: retries exhausted, job terminally failed");
            self.bus.emit(EngineEvent::JobFailed {
                job_id: job_id.to_string(),
                retry_count,
            });
        }
    }

    // === Triggers and backoffs ===

    /// Install (or replace) the schedule trigger for a job
    ///
    /// Idempotent: replacing the map entry drops the old trigger, which
    /// stops its firing loop.
    fn install_trigger(&mut self, job_id: &str) {
        let Some(job) = self.registry.get(job_id) else {
            return;
        };
        let mut trigger = ScheduleTrigger::new(&job.schedule, self.config.default_cadence());

        let tx = self.tx.clone();
        let id = job_id.to_string();
        trigger.start(move || {
            // Fired from the timer task; if the channel is full the next
            // firing or the periodic drain covers it
            let _ = tx.try_send(SchedulerCommand::Offer { job_id: id.clone() });
        });

        let next_run = trigger.next_run_time();
        if let Some(job) = self.registry.get_mut(job_id) {
            job.next_run = Some(next_run);
        }
        self.triggers.insert(job_id.to_string(), trigger);
    }

    /// Remove a job's trigger; idempotent
    fn uninstall_trigger(&mut self, job_id: &str) {
        if let Some(mut trigger) = self.triggers.remove(job_id) {
            trigger.stop();
        }
        if let Some(job) = self.registry.get_mut(job_id) {
            job.next_run = None;
        }
    }

    /// Defer a re-offer of the job; replaces any pending backoff
    fn schedule_backoff(&mut self, job_id: &str, delay: Duration) {
        self.cancel_backoff(job_id);

        let tx = self.tx.clone();
        let id = job_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SchedulerCommand::Offer { job_id: id }).await;
        });
        self.backoffs.insert(job_id.to_string(), handle);
    }

    /// Abort a pending backoff; idempotent
    fn cancel_backoff(&mut self, job_id: &str) {
        if let Some(handle) = self.backoffs.remove(job_id) {
            handle.abort();
        }
    }
}

fn spawn_tick<F>(tx: mpsc::Sender<SchedulerCommand>, every: Duration, make: F) -> JoinHandle<()>
where
    F: Fn() -> SchedulerCommand + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(make()).await.is_err() {
                break;
            }
        }
    })
}
