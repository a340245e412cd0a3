// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use serde::{Deserialize, Serialize};
use tsync_core::DetectionResult;
use tsync_storage::QueueItem;

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Queue a finished build for dispatch
    Enqueue {
        /// Full project name (`folder/job`)
        project: String,
        build: u32,
        /// Detection result to store with the build before queueing
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Box<DetectionResult>>,
    },

    /// Get daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    /// Build was queued durably
    Enqueued { id: u64, queue_size: usize },

    /// Daemon status
    Status {
        uptime_secs: u64,
        queue_size: usize,
        items: Vec<QueueEntry>,
    },

    /// Error response
    Error { message: String },
}

/// A queued build as reported by `Status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: u64,
    pub project: String,
    pub build: u32,
    pub fail_count: u32,
}

impl From<&QueueItem> for QueueEntry {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.id,
            project: item.project_name.clone(),
            build: item.build_number,
            fail_count: item.fail_count,
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
