//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Keeps argument parsing
//! separate from execution logic.

use clap::{Parser, Subcommand};

/// Curator CLI
#[derive(Parser)]
#[command(name = "curatorctl")]
#[command(about = "Curator - smart collection reconciliation", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Path to daemon socket (overrides $CURATORD_SOCKET and defaults)
    #[arg(long, global = true)]
    pub socket: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show daemon status and the last pass summary
    Status {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Run a reconciliation pass now and show per-rule results
    Sync {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Check a config file for rule problems without touching the daemon
    Validate {
        /// Path to config file (defaults to the standard location)
        #[arg(long)]
        config: Option<String>,
    },

    /// Ping daemon (hidden - for health checks only)
    #[command(hide = true)]
    Ping,
}
