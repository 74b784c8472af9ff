//! Jobdaemon - recurring job scheduling engine
//!
//! CLI entry point for running the engine and inspecting schedules.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use eyre::{Context, Result};
use tracing::{error, info, warn};

use jobdaemon::cli::{Cli, Command};
use jobdaemon::config::Config;
use jobdaemon::events::EngineEvent;
use jobdaemon::executor::SimulatedExecutor;
use jobdaemon::scheduler::Scheduler;
use jobdaemon::trigger::resolve_cadence;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobdaemon")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("jobdaemon.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Jobdaemon loaded config: workers={}, startup_jobs={}",
        config.workers.fleet.len(),
        config.jobs.len()
    );

    match cli.command {
        Some(Command::Run) => cmd_run(&config).await,
        Some(Command::Schedule { expr }) => cmd_schedule(&config, &expr),
        Some(Command::Validate) => cmd_validate(&config),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Run the engine in the foreground until SIGINT/SIGTERM
async fn cmd_run(config: &Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let pool = config.workers.to_pool();
    let executor = Arc::new(SimulatedExecutor::from_config(&config.executor));
    let scheduler = Scheduler::spawn(config.scheduler.clone(), pool, executor);

    // Jobs declared in the config are created at startup; a bad definition
    // is reported but does not stop the engine
    for spec in &config.jobs {
        let name = spec.name.clone();
        match scheduler.create_job(spec.clone()).await {
            Ok(job) => info!(job_id = %job.id, name = %job.name, "Startup job created"),
            Err(e) => error!(name = %name, error = %e, "Failed to create startup job"),
        }
    }

    // Mirror engine events to stdout for foreground runs
    let mut events = scheduler.subscribe();
    let event_sink = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    println!("[{}] {}", event.event_type(), describe(&event));
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Event sink lagged, events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Periodic one-line status summary
    let stats_scheduler = scheduler.clone();
    let stats_ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        interval.tick().await;
        loop {
            interval.tick().await;
            let Ok(stats) = stats_scheduler.get_system_stats().await else {
                break;
            };
            println!(
                "jobs: {} total, {} running, {} completed, {} failed | workers active: {}",
                stats.total_jobs, stats.running_jobs, stats.completed_jobs, stats.failed_jobs, stats.active_workers
            );
        }
    });

    println!("Jobdaemon running. Press Ctrl+C to stop.");
    info!("Engine running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                warn!("SIGINT received");
            }
            _ = sigterm.recv() => {
                warn!("SIGTERM received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("Engine shutting down...");
    println!("Shutting down...");

    if let Err(e) = scheduler.shutdown().await {
        error!(error = %e, "Shutdown request failed");
    }
    stats_ticker.abort();
    event_sink.abort();

    Ok(())
}

/// Resolve a schedule expression and report its cadence and next firing
fn cmd_schedule(config: &Config, expr: &str) -> Result<()> {
    let cadence = resolve_cadence(expr, config.scheduler.default_cadence());
    let next = chrono::Local::now()
        + chrono::Duration::from_std(cadence).unwrap_or_else(|_| chrono::Duration::seconds(0));

    println!("expression: {}", expr);
    println!("cadence:    every {}", human_cadence(cadence));
    println!("next run:   {}", next.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Validate the loaded configuration and exit
fn cmd_validate(config: &Config) -> Result<()> {
    config.validate()?;
    println!("Configuration OK");
    println!("  workers: {}", config.workers.fleet.len());
    println!("  startup jobs: {}", config.jobs.len());
    Ok(())
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::JobCreated { job_id, name } => format!("{} ({})", name, job_id),
        EngineEvent::JobDeleted { job_id } => job_id.clone(),
        EngineEvent::JobQueued { job_id } => job_id.clone(),
        EngineEvent::DependencyDeferred { job_id, dependency } => {
            format!("{} waiting on '{}'", job_id, dependency)
        }
        EngineEvent::ExecutionStarted { job_id, worker_id, .. } => {
            format!("{} on {}", job_id, worker_id)
        }
        EngineEvent::ExecutionFinished {
            job_id,
            success,
            duration_ms,
            ..
        } => {
            let outcome = if *success { "ok" } else { "failed" };
            format!("{} {} in {}ms", job_id, outcome, duration_ms)
        }
        EngineEvent::RetryScheduled {
            job_id,
            retry_count,
            delay_ms,
        } => format!("{} attempt {} in {}ms", job_id, retry_count, delay_ms),
        EngineEvent::JobFailed { job_id, retry_count } => {
            format!("{} after {} retries", job_id, retry_count)
        }
    }
}

fn human_cadence(cadence: std::time::Duration) -> String {
    let secs = cadence.as_secs();
    if secs % 86400 == 0 && secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs % 3600 == 0 && secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 && secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
