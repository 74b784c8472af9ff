//! Jobdaemon configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{JobSpec, Worker};
use crate::pool::WorkerPool;
use crate::scheduler::SchedulerConfig;

/// Main jobdaemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduling engine tuning
    pub scheduler: SchedulerConfig,

    /// Worker fleet definition
    pub workers: WorkersConfig,

    /// Simulated executor behavior
    pub executor: ExecutorConfig,

    /// Jobs created at startup
    pub jobs: Vec<JobSpec>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.drain_interval_secs == 0 {
            return Err(eyre::eyre!("scheduler.drain-interval-secs must be greater than zero"));
        }
        if self.workers.fleet.is_empty() {
            return Err(eyre::eyre!("workers.fleet must define at least one worker"));
        }
        if let Some(worker) = self.workers.fleet.iter().find(|w| w.max_jobs == 0) {
            return Err(eyre::eyre!("worker '{}' has max-jobs of zero", worker.name));
        }
        if !(0.0..=1.0).contains(&self.executor.failure_rate) {
            return Err(eyre::eyre!(
                "executor.failure-rate must be in [0.0, 1.0], got {}",
                self.executor.failure_rate
            ));
        }
        if self.executor.min_duration_ms > self.executor.max_duration_ms {
            return Err(eyre::eyre!(
                "executor.min-duration-ms ({}) exceeds max-duration-ms ({})",
                self.executor.min_duration_ms,
                self.executor.max_duration_ms
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./jobdaemon.yml
        let local_config = PathBuf::from("jobdaemon.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/jobdaemon/jobdaemon.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("jobdaemon").join("jobdaemon.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Worker fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// The fixed fleet registered at startup
    pub fleet: Vec<WorkerSpec>,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            fleet: vec![
                WorkerSpec {
                    name: "Worker Node 1".to_string(),
                    host: "192.168.1.10".to_string(),
                    max_jobs: 5,
                },
                WorkerSpec {
                    name: "Worker Node 2".to_string(),
                    host: "192.168.1.11".to_string(),
                    max_jobs: 3,
                },
                WorkerSpec {
                    name: "Worker Node 3".to_string(),
                    host: "192.168.1.12".to_string(),
                    max_jobs: 4,
                },
            ],
        }
    }
}

impl WorkersConfig {
    /// Build the pool, assigning ids in registration order
    pub fn to_pool(&self) -> WorkerPool {
        let workers = self
            .fleet
            .iter()
            .enumerate()
            .map(|(i, spec)| Worker::new(format!("worker-{}", i + 1), &spec.name, &spec.host, spec.max_jobs))
            .collect();
        let mut pool = WorkerPool::new(workers);
        pool.seed_utilization();
        pool
    }
}

/// One worker node definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub name: String,
    pub host: String,

    /// Concurrent execution slots
    #[serde(rename = "max-jobs")]
    pub max_jobs: u32,
}

/// Simulated executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Probability in [0, 1] that an attempt fails
    #[serde(rename = "failure-rate")]
    pub failure_rate: f64,

    /// Lower bound on simulated attempt duration
    #[serde(rename = "min-duration-ms")]
    pub min_duration_ms: u64,

    /// Upper bound on simulated attempt duration
    #[serde(rename = "max-duration-ms")]
    pub max_duration_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.3,
            min_duration_ms: 1000,
            max_duration_ms: 4000,
        }
    }
}
