//! Schedule triggers
//!
//! A ScheduleTrigger resolves a recurrence expression against a fixed
//! cadence table and fires a callback repeatedly at that cadence until
//! stopped. This is deliberately not a cron evaluator: the table below is
//! the whole schedule language, and anything outside it falls back to the
//! default cadence without an error.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::now_ms;

/// Resolve a recurrence expression to a cadence
///
/// Both the cron spellings and the word aliases are recognized:
/// `*/5 * * * *` / `every-5-minutes`, `0 * * * *` / `hourly`,
/// `0 0 * * *` / `daily`, `0 0 * * 0` / `weekly`. Unknown expressions
/// silently resolve to `default_cadence`.
pub fn resolve_cadence(expr: &str, default_cadence: Duration) -> Duration {
    match expr.trim() {
        "*/5 * * * *" | "every-5-minutes" => Duration::from_secs(5 * 60),
        "0 * * * *" | "hourly" => Duration::from_secs(60 * 60),
        "0 0 * * *" | "daily" => Duration::from_secs(24 * 60 * 60),
        "0 0 * * 0" | "weekly" => Duration::from_secs(7 * 24 * 60 * 60),
        _ => default_cadence,
    }
}

/// Fires a callback at a fixed cadence until stopped
///
/// The firing loop runs as a spawned task owned by the trigger; `stop`
/// aborts it. Dropping the trigger stops it as well, so a trigger removed
/// from the scheduler's map can never keep firing.
pub struct ScheduleTrigger {
    expr: String,
    cadence: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ScheduleTrigger {
    /// Create a stopped trigger for an expression
    pub fn new(expr: impl Into<String>, default_cadence: Duration) -> Self {
        let expr = expr.into();
        let cadence = resolve_cadence(&expr, default_cadence);
        Self {
            expr,
            cadence,
            handle: None,
        }
    }

    /// The resolved cadence
    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// The expression the trigger was built from
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Whether the firing loop is running
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Begin firing `callback` once per cadence, first firing after one
    /// full cadence. No-op if already running.
    pub fn start<F>(&mut self, callback: F)
    where
        F: Fn() + Send + 'static,
    {
        if self.handle.is_some() {
            debug!(expr = %self.expr, "ScheduleTrigger::start: already running");
            return;
        }

        let cadence = self.cadence;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(cadence).await;
                callback();
            }
        });
        self.handle = Some(handle);
        debug!(expr = %self.expr, cadence_secs = cadence.as_secs(), "ScheduleTrigger::start: running");
    }

    /// Cancel future firings. No-op if not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(expr = %self.expr, "ScheduleTrigger::stop: stopped");
        }
    }

    /// Anticipated next firing as Unix milliseconds
    ///
    /// Computed as now + cadence on every call; the trigger does not track
    /// elapsed time against a previous schedule point.
    pub fn next_run_time(&self) -> i64 {
        now_ms() + self.cadence.as_millis() as i64
    }
}

impl Drop for ScheduleTrigger {
    fn drop(&mut self) {
        self.stop();
    }
}
