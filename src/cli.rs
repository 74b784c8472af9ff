//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jobdaemon - recurring job scheduling engine
#[derive(Parser)]
#[command(
    name = "jobdaemon",
    about = "Single-node scheduling engine for recurring jobs",
    after_help = "Logs are written to: ~/.local/share/jobdaemon/logs/jobdaemon.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the engine in the foreground
    Run,

    /// Resolve a schedule expression and show its cadence
    Schedule {
        /// Cron-style or word-alias expression, e.g. "hourly" or "0 0 * * *"
        #[arg(value_name = "EXPRESSION")]
        expr: String,
    },

    /// Load and validate the configuration, then exit
    Validate,
}
