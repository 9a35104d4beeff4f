//! RPC Server - Unix socket server for daemon-client communication

use crate::engine::SyncEngine;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use curator_common::ipc::{Method, Request, Response, ResponseData, StatusData};
use curator_common::report::{PassReport, PassSummary};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

/// Daemon state shared across connections
pub struct DaemonState {
    pub version: String,
    pub start_time: std::time::Instant,
    pub rules_configured: usize,
    engine: SyncEngine,
    last_pass: RwLock<Option<PassSummary>>,
    next_sync_at: RwLock<Option<DateTime<Utc>>>,
    /// At most one pass in flight; concurrent triggers queue here
    pass_gate: Mutex<()>,
}

impl DaemonState {
    pub fn new(version: String, engine: SyncEngine) -> Self {
        let rules_configured = engine.rule_count();
        Self {
            version,
            start_time: std::time::Instant::now(),
            rules_configured,
            engine,
            last_pass: RwLock::new(None),
            next_sync_at: RwLock::new(None),
            pass_gate: Mutex::new(()),
        }
    }

    /// Run one reconciliation pass, serialized against any other trigger.
    pub async fn run_pass(&self) -> PassReport {
        let _gate = self.pass_gate.lock().await;
        let report = self.engine.run_pass().await;
        *self.last_pass.write().await = Some(report.summary());
        report
    }

    /// Wait until no pass is in flight.
    pub async fn quiesce(&self) {
        let _gate = self.pass_gate.lock().await;
    }

    pub async fn set_next_sync(&self, at: DateTime<Utc>) {
        *self.next_sync_at.write().await = Some(at);
    }

    pub async fn status(&self) -> StatusData {
        let next_sync_secs = self.next_sync_at.read().await.map(|at| {
            let now = Utc::now();
            if at > now {
                (at - now).num_seconds() as u64
            } else {
                0
            }
        });
        StatusData {
            version: self.version.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            rules_configured: self.rules_configured,
            last_pass: self.last_pass.read().await.clone(),
            next_sync_secs,
        }
    }
}

/// Start the RPC server
pub async fn start_server(socket_path: &str, state: Arc<DaemonState>) -> Result<()> {
    // Ensure socket directory exists
    if let Some(socket_dir) = Path::new(socket_path).parent() {
        tokio::fs::create_dir_all(socket_dir)
            .await
            .context("Failed to create socket directory")?;
    }

    // Remove old socket if it exists
    let _ = tokio::fs::remove_file(socket_path).await;

    let listener = UnixListener::bind(socket_path).context("Failed to bind Unix socket")?;

    info!("RPC server listening on {}", socket_path);

    // Socket is readable/writable by all local users
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o666))?;
    }

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: UnixStream, state: Arc<DaemonState>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .context("Failed to read from socket")?;

        if bytes_read == 0 {
            // Connection closed
            break;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request JSON: {}", e);
                continue;
            }
        };

        let response = handle_request(request.id, request.method, &state).await;

        let response_json = serde_json::to_string(&response)? + "\n";
        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write response")?;
    }

    Ok(())
}

/// Handle a single request
async fn handle_request(id: u64, method: Method, state: &DaemonState) -> Response {
    let result = match method {
        Method::Ping => Ok(ResponseData::Ok),

        Method::Status => Ok(ResponseData::Status(state.status().await)),

        Method::RunPass => {
            info!("On-demand reconciliation pass requested");
            let report = state.run_pass().await;
            Ok(ResponseData::Pass(report))
        }
    };

    Response { id, result }
}
