//! CLI interface and argument parsing
//!
//! The binary is a thin operator wrapper around the library: run a sync,
//! inspect the staging queue, apply a compensation promotion, or check a
//! configuration file.

pub mod commands;

use clap::{Parser, Subcommand};

/// FactSync - clinical fact staging and FHIR synchronization
#[derive(Parser, Debug)]
#[command(name = "factsync")]
#[command(version, about, long_about = None)]
#[command(author = "FactSync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "factsync.toml", env = "FACTSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FACTSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync PENDING staged facts to the target FHIR server
    Sync(commands::sync::SyncArgs),

    /// Show per-status counts of the staging queue
    Status(commands::status::StatusArgs),

    /// Mark a session's rows SYNCED without contacting the target server
    Promote(commands::promote::PromoteArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}
