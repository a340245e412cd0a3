// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage for the tsync discovery queue

mod checkpoint;
#[cfg(test)]
mod fake_writer;
mod queue;
mod snapshot;
mod state;
mod wal;

pub use checkpoint::{
    CheckpointError, CheckpointResult, CheckpointWriter, Checkpointer, FsCheckpointWriter,
};
pub use queue::{DiscoveryQueue, QueueError, COMPACT_THRESHOLD};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{QueueItem, QueueOp, QueueState};
pub use wal::{FsWalWriter, Wal, WalEntry, WalError, WalWriter, PERSIST_ATTEMPTS};
