//! JobExecutor trait definition and the simulated implementation
//!
//! The engine defines an execution contract, not how a command actually
//! runs: the scheduler hands an opaque command string to whatever
//! `JobExecutor` it was constructed with and records the outcome. The
//! default implementation simulates work with a random delay and a
//! configured failure rate.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::config::ExecutorConfig;

/// Errors from a job attempt
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Execution failed: {0}")]
    Failed(String),
}

/// Pluggable execution capability
///
/// One call is one attempt. Implementations may block for as long as the
/// attempt takes; the scheduler runs them outside its bookkeeping task and
/// optionally bounds them with a wall-clock timeout.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run a command to completion, returning how long it took
    async fn execute(&self, command: &str) -> Result<Duration, ExecutorError>;
}

/// Simulated executor: random duration, configured failure rate
pub struct SimulatedExecutor {
    failure_rate: f64,
    min_duration: Duration,
    max_duration: Duration,
}

impl SimulatedExecutor {
    /// Create from the executor config section
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            failure_rate: config.failure_rate,
            min_duration: Duration::from_millis(config.min_duration_ms),
            max_duration: Duration::from_millis(config.max_duration_ms),
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::from_config(&ExecutorConfig::default())
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    async fn execute(&self, command: &str) -> Result<Duration, ExecutorError> {
        let millis = {
            let mut rng = rand::rng();
            rng.random_range(self.min_duration.as_millis() as u64..=self.max_duration.as_millis() as u64)
        };
        debug!(%command, %millis, "SimulatedExecutor::execute: simulating work");
        tokio::time::sleep(Duration::from_millis(millis)).await;

        let failed = rand::rng().random_bool(self.failure_rate);
        if failed {
            return Err(ExecutorError::Failed(
                "Job execution failed due to simulated error".to_string(),
            ));
        }
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted executor for unit tests
    ///
    /// Consumes the scripted outcomes in order; once exhausted, every
    /// further attempt succeeds.
    pub struct MockExecutor {
        outcomes: Mutex<Vec<Result<(), String>>>,
        delay: Duration,
        call_count: AtomicUsize,
    }

    impl MockExecutor {
        pub fn with_outcomes(outcomes: Vec<Result<(), String>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                delay: Duration::from_millis(10),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn always_succeeding() -> Self {
            Self::with_outcomes(Vec::new())
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobExecutor for MockExecutor {
        async fn execute(&self, _command: &str) -> Result<Duration, ExecutorError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let outcome = {
                let outcomes = self.outcomes.lock().unwrap();
                outcomes.get(idx).cloned()
            };
            tokio::time::sleep(self.delay).await;
            match outcome {
                Some(Err(message)) => Err(ExecutorError::Failed(message)),
                _ => Ok(self.delay),
            }
        }
    }
}
