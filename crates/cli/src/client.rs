// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::time::Duration;

use crate::daemon_control::{ensure_running, record_connection_error};
use crate::daemon_files::DaemonFiles;

use thiserror::Error;
use tokio::net::UnixStream;
use tsync_core::DetectionResult;
use tsync_daemon::protocol::{self, ProtocolError};
use tsync_daemon::{QueueEntry, Request, Response, PROTOCOL_VERSION};

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Daemon status snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub queue_size: usize,
    pub items: Vec<QueueEntry>,
}

/// Daemon client
pub struct DaemonClient {
    files: DaemonFiles,
}

impl DaemonClient {
    /// For action commands: start the daemon if needed, replacing one from
    /// another release
    pub fn for_action() -> Result<Self, ClientError> {
        ensure_running(&DaemonFiles::locate()?)
    }

    /// For query commands: connect only, no restart
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Client for the daemon owning `files`
    pub fn new(files: DaemonFiles) -> Self {
        Self { files }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let files = DaemonFiles::locate()?;
        if !files.socket().exists() {
            let err = ClientError::DaemonNotRunning;
            record_connection_error(&files, &err);
            return Err(err);
        }
        Ok(Self::new(files))
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        match self.send_with_timeout(request, timeout_ipc()).await {
            Ok(response) => Ok(response),
            Err(e) => {
                record_connection_error(&self.files, &e);
                Err(e)
            }
        }
    }

    async fn send_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(self.files.socket()).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, request, timeout).await?;
        Ok(protocol::read_response(&mut reader, timeout).await?)
    }

    /// Check the daemon answers at all
    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Queue a build for dispatch, optionally storing its detection result
    /// first. Returns the item id and the queue size after the append.
    pub async fn enqueue(
        &self,
        project: &str,
        build: u32,
        result: Option<DetectionResult>,
    ) -> Result<(u64, usize), ClientError> {
        let request = Request::Enqueue {
            project: project.to_string(),
            build,
            result: result.map(Box::new),
        };
        match self.send(&request).await? {
            Response::Enqueued { id, queue_size } => Ok((id, queue_size)),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status {
                uptime_secs,
                queue_size,
                items,
            } => Ok(DaemonStatus {
                uptime_secs,
                queue_size,
                items,
            }),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
