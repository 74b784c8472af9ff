//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Periodic drain interval in seconds
    #[serde(rename = "drain-interval-secs", default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Base retry delay in milliseconds; actual delay is base x retry count
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Cadence for schedule expressions outside the recognized table, in seconds
    #[serde(rename = "default-cadence-secs", default = "default_cadence_secs")]
    pub default_cadence_secs: u64,

    /// Wall-clock bound on one attempt in seconds; 0 disables the bound
    #[serde(rename = "execution-timeout-secs", default)]
    pub execution_timeout_secs: u64,

    /// Worker utilization refresh interval in seconds
    #[serde(rename = "metrics-refresh-secs", default = "default_metrics_refresh_secs")]
    pub metrics_refresh_secs: u64,
}

fn default_drain_interval_secs() -> u64 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    5000
}

fn default_cadence_secs() -> u64 {
    600
}

fn default_metrics_refresh_secs() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_interval_secs: 5,
            retry_base_delay_ms: 5000,
            default_cadence_secs: 600,
            execution_timeout_secs: 0,
            metrics_refresh_secs: 10,
        }
    }
}

impl SchedulerConfig {
    /// Drain interval as a Duration
    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }

    /// Base retry delay as a Duration
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Fallback cadence as a Duration
    pub fn default_cadence(&self) -> Duration {
        Duration::from_secs(self.default_cadence_secs)
    }

    /// Attempt timeout, None when disabled
    pub fn execution_timeout(&self) -> Option<Duration> {
        if self.execution_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.execution_timeout_secs))
        }
    }

    /// Utilization refresh interval as a Duration
    pub fn metrics_refresh(&self) -> Duration {
        Duration::from_secs(self.metrics_refresh_secs)
    }
}
