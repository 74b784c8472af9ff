//! Integration tests for jobdaemon
//!
//! These tests drive the engine through its handle with a scripted
//! executor and observe behavior through the event stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use jobdaemon::domain::{ExecutionStatus, JobSpec, JobStatus, Priority, Worker};
use jobdaemon::events::EngineEvent;
use jobdaemon::executor::{ExecutorError, JobExecutor};
use jobdaemon::pool::WorkerPool;
use jobdaemon::scheduler::{Scheduler, SchedulerConfig, SchedulerError};

// =============================================================================
// Test Harness
// =============================================================================

/// Executor that plays back a scripted sequence of outcomes
///
/// Once the script is exhausted every further attempt succeeds.
struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<Result<(), String>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    fn new(outcomes: Vec<Result<(), String>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            delay: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
        }
    }

    fn always_succeeding() -> Self {
        Self::new(Vec::new())
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobExecutor for ScriptedExecutor {
    async fn execute(&self, _command: &str) -> Result<Duration, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
        outcome.map(|_| self.delay).map_err(ExecutorError::Failed)
    }
}

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        drain_interval_secs: 1,
        retry_base_delay_ms: 20,
        default_cadence_secs: 3600,
        execution_timeout_secs: 0,
        metrics_refresh_secs: 60,
    }
}

fn pool_of(slots: &[u32]) -> WorkerPool {
    let workers = slots
        .iter()
        .enumerate()
        .map(|(i, &max_jobs)| {
            Worker::new(
                format!("worker-{}", i + 1),
                format!("Node {}", i + 1),
                "localhost",
                max_jobs,
            )
        })
        .collect();
    WorkerPool::new(workers)
}

/// Wait for the next event matching the predicate, with a guard timeout
async fn await_event<F>(
    rx: &mut tokio::sync::broadcast::Receiver<EngineEvent>,
    mut matches: F,
) -> EngineEvent
where
    F: FnMut(&EngineEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

// =============================================================================
// Retry and Failure Tests
// =============================================================================

#[tokio::test]
async fn test_retries_exhaust_to_terminal_failure() {
    let executor = Arc::new(ScriptedExecutor::new(vec![
        Err("exit 1".to_string()),
        Err("exit 1".to_string()),
    ]));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Flaky Job", "daily", "flaky.sh").with_max_retries(2))
        .await
        .unwrap();
    scheduler.run_job_now(&job.id).await.unwrap();

    // First failure schedules a retry
    let retry = await_event(&mut events, |e| matches!(e, EngineEvent::RetryScheduled { .. })).await;
    if let EngineEvent::RetryScheduled {
        retry_count, delay_ms, ..
    } = retry
    {
        assert_eq!(retry_count, 1);
        assert_eq!(delay_ms, 20);
    }

    // Second failure exhausts the limit
    let failed = await_event(&mut events, |e| matches!(e, EngineEvent::JobFailed { .. })).await;
    if let EngineEvent::JobFailed { retry_count, .. } = failed {
        assert_eq!(retry_count, 2);
    }

    let after = scheduler.get_job(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Failed);
    assert_eq!(after.retry_count, 2);
    assert!(after.next_run.is_none());
    assert_eq!(executor.calls(), 2);

    let history = scheduler.get_job_history(&job.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.status == ExecutionStatus::Failed));
    assert!(history.iter().all(|e| e.error.is_some()));

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_success_after_retry_resets_count() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Err("exit 1".to_string()), Ok(())]));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Recovers", "daily", "recovers.sh").with_max_retries(3))
        .await
        .unwrap();
    scheduler.run_job_now(&job.id).await.unwrap();

    await_event(&mut events, |e| matches!(e, EngineEvent::RetryScheduled { .. })).await;
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { success: true, .. })
    })
    .await;

    let after = scheduler.get_job(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Completed);
    assert_eq!(after.retry_count, 0);
    assert_eq!(executor.calls(), 2);

    let history = scheduler.get_job_history(&job.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, ExecutionStatus::Failed);
    assert_eq!(history[1].status, ExecutionStatus::Completed);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_zero_max_retries_fails_immediately() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Err("exit 1".to_string())]));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("No Retries", "daily", "x.sh").with_max_retries(0))
        .await
        .unwrap();
    scheduler.run_job_now(&job.id).await.unwrap();

    await_event(&mut events, |e| matches!(e, EngineEvent::JobFailed { .. })).await;

    let after = scheduler.get_job(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Failed);
    assert_eq!(after.retry_count, 0);
    assert_eq!(executor.calls(), 1);

    scheduler.shutdown().await.unwrap();
}

// =============================================================================
// Dependency Gating Tests
// =============================================================================

#[tokio::test]
async fn test_dependency_defers_until_completed() {
    let executor = Arc::new(ScriptedExecutor::always_succeeding());
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[2]), executor.clone());
    let mut events = scheduler.subscribe();

    let upstream = scheduler
        .create_job(JobSpec::new("Extract", "daily", "extract.sh"))
        .await
        .unwrap();
    let downstream = scheduler
        .create_job(JobSpec::new("Transform", "daily", "transform.sh").with_dependency("Extract"))
        .await
        .unwrap();

    // Upstream has never completed: downstream is deferred, not executed
    scheduler.run_job_now(&downstream.id).await.unwrap();
    let deferred = await_event(&mut events, |e| {
        matches!(e, EngineEvent::DependencyDeferred { .. })
    })
    .await;
    if let EngineEvent::DependencyDeferred { dependency, .. } = deferred {
        assert_eq!(dependency, "Extract");
    }
    assert_eq!(executor.calls(), 0);

    // Complete the upstream
    scheduler.run_job_now(&upstream.id).await.unwrap();
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { job_id, success: true, .. } if *job_id == upstream.id)
    })
    .await;

    // Now the downstream passes the gate
    scheduler.run_job_now(&downstream.id).await.unwrap();
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { job_id, success: true, .. } if *job_id == downstream.id)
    })
    .await;
    assert_eq!(executor.calls(), 2);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_dependency_never_admits() {
    let executor = Arc::new(ScriptedExecutor::always_succeeding());
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Orphan", "daily", "orphan.sh").with_dependency("No Such Job"))
        .await
        .unwrap();

    scheduler.run_job_now(&job.id).await.unwrap();
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::DependencyDeferred { .. })
    })
    .await;
    assert_eq!(executor.calls(), 0);

    scheduler.shutdown().await.unwrap();
}

// =============================================================================
// Capacity and Priority Tests
// =============================================================================

#[tokio::test]
async fn test_queued_jobs_dispatch_by_priority_when_slot_frees() {
    let executor = Arc::new(ScriptedExecutor::always_succeeding().with_delay(Duration::from_millis(150)));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let blocker = scheduler
        .create_job(JobSpec::new("Blocker", "daily", "blocker.sh"))
        .await
        .unwrap();
    let low = scheduler
        .create_job(JobSpec::new("Low Job", "daily", "low.sh").with_priority(Priority::Low))
        .await
        .unwrap();
    let high = scheduler
        .create_job(JobSpec::new("High Job", "daily", "high.sh").with_priority(Priority::High))
        .await
        .unwrap();

    // Occupy the only slot, then queue low before high
    scheduler.run_job_now(&blocker.id).await.unwrap();
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionStarted { job_id, .. } if *job_id == blocker.id)
    })
    .await;
    scheduler.run_job_now(&low.id).await.unwrap();
    scheduler.run_job_now(&high.id).await.unwrap();

    // The freed slot goes to the high-priority job despite later admission
    let first = await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionStarted { job_id, .. } if *job_id != blocker.id)
    })
    .await;
    assert_eq!(first.job_id(), high.id);

    let second = await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionStarted { job_id, .. } if *job_id == low.id)
    })
    .await;
    assert_eq!(second.job_id(), low.id);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_slots_release_after_each_attempt() {
    let executor = Arc::new(ScriptedExecutor::always_succeeding());
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1, 1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Cycler", "daily", "cycle.sh"))
        .await
        .unwrap();

    for _ in 0..5 {
        scheduler.run_job_now(&job.id).await.unwrap();
        await_event(&mut events, |e| {
            matches!(e, EngineEvent::ExecutionFinished { success: true, .. })
        })
        .await;
    }

    let workers = scheduler.list_workers().await.unwrap();
    assert!(workers.iter().all(|w| w.active_jobs == 0));
    assert_eq!(executor.calls(), 5);

    let history = scheduler.get_job_history(&job.id).await.unwrap();
    assert_eq!(history.len(), 5);

    scheduler.shutdown().await.unwrap();
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_paused_job_ignores_run_now_retry_chain() {
    // A job paused while its attempt is in flight keeps its history but
    // does not advance state or schedule a retry
    let executor = Arc::new(ScriptedExecutor::new(vec![Err("exit 1".to_string())])
        .with_delay(Duration::from_millis(150)));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Paused Mid Flight", "daily", "x.sh").with_max_retries(3))
        .await
        .unwrap();
    scheduler.run_job_now(&job.id).await.unwrap();
    await_event(&mut events, |e| matches!(e, EngineEvent::ExecutionStarted { .. })).await;

    let paused = scheduler.toggle_job(&job.id, JobStatus::Paused).await.unwrap();
    assert_eq!(paused.status, JobStatus::Paused);

    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { success: false, .. })
    })
    .await;
    // Outcome recorded, lifecycle untouched
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after = scheduler.get_job(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Paused);
    assert_eq!(after.retry_count, 0);
    assert_eq!(executor.calls(), 1);

    let history = scheduler.get_job_history(&job.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ExecutionStatus::Failed);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delete_mid_flight_discards_outcome_and_frees_slot() {
    let executor = Arc::new(ScriptedExecutor::always_succeeding().with_delay(Duration::from_millis(150)));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Doomed", "daily", "doomed.sh"))
        .await
        .unwrap();
    scheduler.run_job_now(&job.id).await.unwrap();
    await_event(&mut events, |e| matches!(e, EngineEvent::ExecutionStarted { .. })).await;

    scheduler.delete_job(&job.id).await.unwrap();
    assert!(matches!(
        scheduler.get_job(&job.id).await.unwrap_err(),
        SchedulerError::NotFound(_)
    ));

    // The attempt completes against a deleted job; the slot still frees
    tokio::time::sleep(Duration::from_millis(250)).await;
    let workers = scheduler.list_workers().await.unwrap();
    assert!(workers.iter().all(|w| w.active_jobs == 0));

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_job_reactivates_with_fresh_retry_budget() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Err("exit 1".to_string())]));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Fragile", "daily", "fragile.sh").with_max_retries(0))
        .await
        .unwrap();
    scheduler.run_job_now(&job.id).await.unwrap();
    await_event(&mut events, |e| matches!(e, EngineEvent::JobFailed { .. })).await;

    let active = scheduler.toggle_job(&job.id, JobStatus::Active).await.unwrap();
    assert_eq!(active.status, JobStatus::Active);
    assert_eq!(active.retry_count, 0);
    assert!(active.next_run.is_some());

    // Script exhausted: the next attempt succeeds
    scheduler.run_job_now(&job.id).await.unwrap();
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { success: true, .. })
    })
    .await;
    let after = scheduler.get_job(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Completed);

    scheduler.shutdown().await.unwrap();
}

// =============================================================================
// Stats and Metrics Tests
// =============================================================================

#[tokio::test]
async fn test_stats_and_metrics_reflect_outcomes() {
    let executor = Arc::new(ScriptedExecutor::new(vec![Ok(()), Err("exit 1".to_string())]));
    let scheduler = Scheduler::spawn(fast_config(), pool_of(&[2]), executor.clone());
    let mut events = scheduler.subscribe();

    let good = scheduler
        .create_job(JobSpec::new("Good", "daily", "good.sh"))
        .await
        .unwrap();
    scheduler.run_job_now(&good.id).await.unwrap();
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { success: true, .. })
    })
    .await;

    let bad = scheduler
        .create_job(JobSpec::new("Bad", "daily", "bad.sh").with_max_retries(0))
        .await
        .unwrap();
    scheduler.run_job_now(&bad.id).await.unwrap();
    await_event(&mut events, |e| matches!(e, EngineEvent::JobFailed { .. })).await;

    let stats = scheduler.get_system_stats().await.unwrap();
    assert_eq!(stats.total_jobs, 2);
    assert_eq!(stats.running_jobs, 0);
    assert_eq!(stats.completed_jobs, 1);
    assert_eq!(stats.failed_jobs, 1);
    assert_eq!(stats.active_workers, 1);

    let metrics = scheduler.get_system_metrics().await.unwrap();
    assert_eq!(metrics.total_executions, 2);
    assert_eq!(metrics.success_rate, 50);
    assert!(metrics.avg_execution_time_ms >= 0.0);

    scheduler.shutdown().await.unwrap();
}

// =============================================================================
// Trigger Tests
// =============================================================================

#[tokio::test]
async fn test_schedule_trigger_fires_and_executes() {
    // An unrecognized expression falls back to the default cadence, which
    // is set very short here so the trigger fires during the test
    let config = SchedulerConfig {
        default_cadence_secs: 1,
        ..fast_config()
    };
    let executor = Arc::new(ScriptedExecutor::always_succeeding());
    let scheduler = Scheduler::spawn(config, pool_of(&[1]), executor.clone());
    let mut events = scheduler.subscribe();

    let job = scheduler
        .create_job(JobSpec::new("Ticker", "every-tick", "tick.sh"))
        .await
        .unwrap();

    // No run_now: only the trigger can start this
    await_event(&mut events, |e| {
        matches!(e, EngineEvent::ExecutionFinished { job_id, success: true, .. } if *job_id == job.id)
    })
    .await;
    assert!(executor.calls() >= 1);

    let after = scheduler.get_job(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Completed);
    assert!(after.last_run.is_some());

    scheduler.shutdown().await.unwrap();
}
