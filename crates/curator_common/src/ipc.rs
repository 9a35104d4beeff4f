//! IPC protocol definitions for curator
//!
//! Defines message types between curatord and curatorctl. Messages are
//! newline-delimited JSON over the daemon's unix socket.

use crate::report::{PassReport, PassSummary};
use serde::{Deserialize, Serialize};

/// IPC request from client to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: Method,
}

impl Request {
    pub fn new(id: u64, method: Method) -> Self {
        Self { id, method }
    }
}

/// IPC response from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<ResponseData, String>,
}

/// Request methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    /// Ping daemon (health check)
    Ping,

    /// Get daemon status
    Status,

    /// Run one reconciliation pass now and wait for its report
    RunPass,
}

/// Response data variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ResponseData {
    /// Simple success/pong
    Ok,

    /// Status information
    Status(StatusData),

    /// Completed pass report
    Pass(PassReport),
}

/// Daemon status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusData {
    pub version: String,
    pub uptime_seconds: u64,
    pub rules_configured: usize,
    /// Outcome of the most recent pass, if one has run
    pub last_pass: Option<PassSummary>,
    /// Seconds until the next scheduled pass, if scheduling is active
    pub next_sync_secs: Option<u64>,
}
