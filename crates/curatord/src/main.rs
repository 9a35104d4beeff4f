//! Curator daemon - smart collection reconciliation
//!
//! Derives collection membership from declarative match rules and
//! converges the collection store on a schedule or on demand.

use anyhow::Result;
use clap::Parser;
use curator_common::config::Config;
use curatord::catalog::SnapshotCatalog;
use curatord::engine::SyncEngine;
use curatord::rpc_server::{self, DaemonState};
use curatord::store::JsonCollectionStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "curatord")]
#[command(about = "Curator daemon - smart collection reconciliation", long_about = None)]
#[command(version)]
struct Args {
    /// Path to config file
    #[arg(long)]
    config: Option<String>,

    /// Listen socket path (overrides config)
    #[arg(long)]
    socket: Option<String>,

    /// Run one reconciliation pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };
    for warning in config.validate() {
        warn!("Config: {}", warning);
    }

    let rules = config.rules();
    info!(
        "Curator daemon v{} starting: {} rules configured",
        env!("CARGO_PKG_VERSION"),
        rules.len()
    );

    let catalog = Arc::new(SnapshotCatalog::new(&config.daemon.library_snapshot));
    let store = Arc::new(JsonCollectionStore::new(&config.daemon.collections_path));
    let shutdown = Arc::new(AtomicBool::new(false));
    let engine = SyncEngine::new(rules, catalog, store).with_shutdown(Arc::clone(&shutdown));

    if args.once {
        let report = engine.run_pass().await;
        info!(
            "One-shot pass done: {} synced, {} skipped, {} failed",
            report.synced_count(),
            report.skipped_count(),
            report.failed_count()
        );
        return Ok(());
    }

    let socket_path = args
        .socket
        .unwrap_or_else(|| config.daemon.socket_path.clone());
    let state = Arc::new(DaemonState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        engine,
    ));

    // Scheduled passes; the first fires immediately
    let interval = Duration::from_secs(config.sync_interval_secs());
    let scheduler = tokio::spawn(run_scheduler(Arc::clone(&state), interval));

    // RPC server for curatorctl
    let server_state = Arc::clone(&state);
    let server_socket = socket_path.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = rpc_server::start_server(&server_socket, server_state).await {
            error!("RPC server error: {}", e);
        }
    });

    info!("Curator daemon ready");

    wait_for_shutdown_signal().await?;
    shutdown.store(true, Ordering::Relaxed);
    info!("Shutdown requested, waiting for any running pass to stop");
    state.quiesce().await;

    scheduler.abort();
    server.abort();
    let _ = tokio::fs::remove_file(&socket_path).await;
    info!("Shutting down gracefully");

    Ok(())
}

/// Run reconciliation passes on a fixed interval.
///
/// A zero interval disables scheduling entirely; on-demand passes through
/// the RPC server are unaffected.
async fn run_scheduler(state: Arc<DaemonState>, every: Duration) {
    if every.is_zero() {
        warn!("Sync interval is zero; scheduled passes are disabled");
        return;
    }

    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        info!("Scheduled reconciliation pass");
        let report = state.run_pass().await;
        if report.interrupted {
            break;
        }
        let next = chrono::Utc::now() + chrono::Duration::seconds(every.as_secs() as i64);
        state.set_next_sync(next).await;
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}
