//! Curator Control - CLI client for the curator daemon
//!
//! Talks to curatord over its unix socket. `validate` works on a config
//! file locally and never needs the daemon.

mod cli;
mod client;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use client::DaemonClient;
use curator_common::config::{Config, CONFIG_PATH, SOCKET_PATH};
use curator_common::ipc::StatusData;
use curator_common::report::{ArtworkOutcome, PassReport, RuleDisposition};
use curator_common::rules::MatchMode;
use owo_colors::OwoColorize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket = resolve_socket(cli.socket);

    match cli.command {
        Commands::Status { json } => {
            let mut client = DaemonClient::connect(&socket).await?;
            let status = client.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                render_status(&status);
            }
        }
        Commands::Sync { json } => {
            let mut client = DaemonClient::connect(&socket).await?;
            let report = client.run_pass().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                render_report(&report);
            }
            if report.failed_count() > 0 {
                bail!("{} rules failed; see the daemon log", report.failed_count());
            }
        }
        Commands::Validate { config } => {
            validate(config.as_deref().unwrap_or(CONFIG_PATH))?;
        }
        Commands::Ping => {
            let mut client = DaemonClient::connect(&socket).await?;
            client.ping().await?;
            println!("pong");
        }
    }

    Ok(())
}

/// Socket resolution order: --socket flag, $CURATORD_SOCKET, default.
fn resolve_socket(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("CURATORD_SOCKET").ok())
        .unwrap_or_else(|| SOCKET_PATH.to_string())
}

fn render_status(status: &StatusData) {
    println!();
    println!("{}", "  Curator Daemon".bold());
    println!("  Version:    {}", status.version);
    println!("  Uptime:     {}", fmt_duration(status.uptime_seconds));
    println!("  Rules:      {} configured", status.rules_configured);
    match status.next_sync_secs {
        Some(secs) => println!("  Next sync:  in {}", fmt_duration(secs)),
        None => println!("  Next sync:  not scheduled"),
    }
    match &status.last_pass {
        Some(pass) => {
            let counts = format!(
                "{} synced, {} skipped, {} failed",
                pass.synced, pass.skipped, pass.failed
            );
            let counts = if pass.failed > 0 {
                counts.red().to_string()
            } else {
                counts
            };
            println!(
                "  Last pass:  {} ({:.2}s: {}, +{} / -{})",
                fmt_ago(&pass.started_at),
                pass.duration_secs,
                counts,
                pass.items_added,
                pass.items_removed
            );
            if pass.interrupted {
                println!("  {}", "Last pass was interrupted by shutdown".yellow());
            }
        }
        None => println!("  Last pass:  none yet"),
    }
    println!();
}

fn render_report(report: &PassReport) {
    println!();
    println!(
        "{}",
        format!(
            "  Reconciliation pass finished in {:.2}s",
            report.duration_secs
        )
        .bold()
    );
    println!();
    for rule in &report.rules {
        match &rule.disposition {
            RuleDisposition::Synced {
                added,
                removed,
                artwork,
            } => {
                println!(
                    "  {} {}: +{} / -{}{}",
                    "✓".green(),
                    rule.title,
                    added,
                    removed,
                    fmt_artwork(artwork)
                );
            }
            RuleDisposition::Skipped { reason } => {
                println!("  {} {}: skipped ({})", "-".dimmed(), rule.title, reason);
            }
            RuleDisposition::Failed { error } => {
                println!("  {} {}: {}", "✗".red(), rule.title, error.red());
            }
        }
    }
    println!();
    println!(
        "  {} synced, {} skipped, {} failed",
        report.synced_count(),
        report.skipped_count(),
        report.failed_count()
    );
    if report.interrupted {
        println!("  {}", "Pass interrupted by shutdown".yellow());
    }
    println!();
}

fn fmt_artwork(outcome: &ArtworkOutcome) -> String {
    match outcome {
        ArtworkOutcome::Applied { path } => format!(", artwork from {}", path),
        ArtworkOutcome::Unchanged => String::new(),
        ArtworkOutcome::NoCandidate => ", no artwork candidate".to_string(),
        ArtworkOutcome::Failed { error } => format!(", artwork failed: {}", error),
    }
}

/// Check a config file and report rule problems without running anything.
fn validate(path: &str) -> Result<()> {
    let config = Config::load_from_path(path)?;

    println!();
    println!("{}", format!("  Config: {}", path).bold());
    println!();
    for rule in config.rules() {
        let title = rule
            .display_title()
            .unwrap_or_else(|| "(untitled)".to_string());
        let mode = match rule.mode {
            MatchMode::Any => "any",
            MatchMode::All => "all",
        };
        let glyph = if rule.is_actionable() {
            "✓".green().to_string()
        } else {
            "-".dimmed().to_string()
        };
        let terms = if rule.terms.len() == 1 { "term" } else { "terms" };
        println!(
            "  {} {} ({} {}, {})",
            glyph,
            title,
            rule.terms.len(),
            terms,
            mode
        );
    }
    println!();

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("  {} No problems found", "✓".green());
        println!();
        return Ok(());
    }
    for warning in &warnings {
        println!("  {} {}", "✗".red(), warning);
    }
    println!();
    bail!("{} problem(s) found in {}", warnings.len(), path)
}

fn fmt_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Human form of an RFC 3339 timestamp relative to now.
fn fmt_ago(started_at: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(started_at) {
        Ok(t) => {
            let secs = Utc::now().signed_duration_since(t).num_seconds().max(0) as u64;
            if secs < 5 {
                "just now".to_string()
            } else {
                format!("{} ago", fmt_duration(secs))
            }
        }
        Err(_) => started_at.to_string(),
    }
}
