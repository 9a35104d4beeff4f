//! Unix socket client for communicating with curatord.

use anyhow::{anyhow, Context, Result};
use curator_common::ipc::{Method, Request, Response, ResponseData, StatusData};
use curator_common::report::PassReport;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Client for communicating with curatord
pub struct DaemonClient {
    stream: UnixStream,
    next_id: u64,
}

impl DaemonClient {
    /// Connect to curatord
    pub async fn connect(socket_path: &str) -> Result<Self> {
        let path = Path::new(socket_path);

        if !path.exists() {
            return Err(anyhow!(
                "Curator daemon not running.\n\
                 The socket at {} does not exist.\n\n\
                 To fix this, start the daemon:\n\
                 sudo systemctl start curatord",
                socket_path
            ));
        }

        let stream = UnixStream::connect(path).await.map_err(|e| {
            anyhow!(
                "Cannot connect to curator daemon: {}\n\n\
                 The daemon may have crashed. To fix this:\n\
                 sudo systemctl restart curatord",
                e
            )
        })?;

        Ok(Self { stream, next_id: 1 })
    }

    /// Send one request and decode the daemon's answer
    async fn call(&mut self, method: Method) -> Result<ResponseData> {
        let request = Request::new(self.next_id, method);
        self.next_id += 1;
        let request_json = serde_json::to_string(&request)?;

        // Send request
        self.stream
            .write_all(format!("{}\n", request_json).as_bytes())
            .await?;

        // Read response
        let (reader, _) = self.stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if line.trim().is_empty() {
            return Err(anyhow!("Daemon closed the connection without answering"));
        }

        let response: Response =
            serde_json::from_str(&line).context("Malformed response from daemon")?;
        response.result.map_err(|e| anyhow!(e))
    }

    /// Health check
    pub async fn ping(&mut self) -> Result<()> {
        match self.call(Method::Ping).await? {
            ResponseData::Ok => Ok(()),
            other => Err(anyhow!("Unexpected answer to ping: {:?}", other)),
        }
    }

    /// Get daemon status
    pub async fn status(&mut self) -> Result<StatusData> {
        match self.call(Method::Status).await? {
            ResponseData::Status(status) => Ok(status),
            other => Err(anyhow!("Unexpected answer to status: {:?}", other)),
        }
    }

    /// Run a reconciliation pass and wait for its full report
    pub async fn run_pass(&mut self) -> Result<PassReport> {
        match self.call(Method::RunPass).await? {
            ResponseData::Pass(report) => Ok(report),
            other => Err(anyhow!("Unexpected answer to sync: {:?}", other)),
        }
    }
}
