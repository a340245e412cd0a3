// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO of builds awaiting dispatch.
//!
//! Directory layout:
//!
//! ```text
//! <dir>/queue.lock     exclusive advisory lock held while open
//! <dir>/snapshot.zst   latest checkpoint
//! <dir>/wal.jsonl      operations after the checkpoint
//! ```
//!
//! Every mutation is appended to the WAL and fsynced before the in-memory
//! queue changes, so an acknowledged operation survives a crash.

use crate::checkpoint::{CheckpointError, CheckpointWriter, Checkpointer, FsCheckpointWriter};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::{QueueItem, QueueOp, QueueState};
use crate::wal::{FsWalWriter, Wal, WalError, WalWriter};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// WAL records written between automatic checkpoints
pub const COMPACT_THRESHOLD: u64 = 256;

const LOCK_FILE: &str = "queue.lock";
const SNAPSHOT_FILE: &str = "snapshot.zst";
const WAL_FILE: &str = "wal.jsonl";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue directory {0} is locked by another process")]
    Locked(PathBuf),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueueError {
    /// True when a durable write was abandoned after all retries.
    pub fn is_persist_failure(&self) -> bool {
        matches!(self, QueueError::Wal(WalError::Persist { .. }))
    }
}

struct Inner<W: CheckpointWriter, L: WalWriter> {
    wal: Wal<L>,
    state: QueueState,
    checkpointer: Checkpointer<W>,
    /// Sequence covered by the latest snapshot
    snapshot_seq: u64,
}

/// Crash-safe queue of [`QueueItem`]s, shared between producers and the
/// dispatcher.
pub struct DiscoveryQueue<W: CheckpointWriter = FsCheckpointWriter, L: WalWriter = FsWalWriter> {
    dir: PathBuf,
    inner: Mutex<Inner<W, L>>,
    // Released when dropped
    _lock: File,
}

impl DiscoveryQueue {
    /// Open (or create) the queue stored in `dir`.
    pub fn open(dir: &Path) -> Result<Self, QueueError> {
        Self::open_with(dir, FsCheckpointWriter, FsWalWriter)
    }
}

impl<W: CheckpointWriter, L: WalWriter> DiscoveryQueue<W, L> {
    /// Open with explicit snapshot and WAL writers.
    ///
    /// Fails when the snapshot exists but cannot be decoded: the WAL was
    /// truncated when that snapshot was written, so starting empty would
    /// drop every item it holds.
    pub fn open_with(dir: &Path, checkpoints: W, wal_writer: L) -> Result<Self, QueueError> {
        std::fs::create_dir_all(dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive()
            .map_err(|_| QueueError::Locked(dir.to_owned()))?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let (snapshot_seq, mut state) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.seq, snapshot.state),
            None => (0, QueueState::default()),
        };

        let wal = Wal::open_with_writer(&dir.join(WAL_FILE), snapshot_seq, wal_writer)?;
        let entries = wal.entries_after(snapshot_seq)?;
        for entry in &entries {
            state.apply(entry.seq, &entry.op);
        }

        info!(
            dir = %dir.display(),
            snapshot_seq,
            replayed = entries.len(),
            items = state.len(),
            "opened discovery queue",
        );

        Ok(Self {
            dir: dir.to_owned(),
            inner: Mutex::new(Inner {
                wal,
                state,
                checkpointer: Checkpointer::with_writer(checkpoints, snapshot_path),
                snapshot_seq,
            }),
            _lock: lock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a new item at the tail. Durable once this returns.
    pub fn add(&self, project_name: &str, build_number: u32) -> Result<QueueItem, QueueError> {
        let mut inner = self.inner.lock();
        let op = QueueOp::Pushed {
            project_name: project_name.to_string(),
            build_number,
        };
        let seq = inner.wal.append(&op)?;
        inner.state.apply(seq, &op);
        let item = QueueItem {
            id: seq,
            project_name: project_name.to_string(),
            build_number,
            fail_count: 0,
        };
        debug!(item = item.id, project = project_name, build = build_number, "queued build");
        Self::maybe_compact(&mut inner);
        Ok(item)
    }

    /// Copy of the head item, if any.
    pub fn peek_first(&self) -> Option<QueueItem> {
        self.inner.lock().state.head().cloned()
    }

    /// Durably remove the head item and return it.
    pub fn remove(&self) -> Result<Option<QueueItem>, QueueError> {
        let mut inner = self.inner.lock();
        let Some(head) = inner.state.head().cloned() else {
            return Ok(None);
        };
        let op = QueueOp::Removed { id: head.id };
        let seq = inner.wal.append(&op)?;
        inner.state.apply(seq, &op);
        Self::maybe_compact(&mut inner);
        Ok(Some(head))
    }

    /// Durably increment the head's fail count and return the new value.
    pub fn record_failure(&self) -> Result<Option<u32>, QueueError> {
        let mut inner = self.inner.lock();
        let Some(id) = inner.state.head().map(|item| item.id) else {
            return Ok(None);
        };
        let op = QueueOp::Failed { id };
        let seq = inner.wal.append(&op)?;
        inner.state.apply(seq, &op);
        let fail_count = inner.state.head().map(|item| item.fail_count);
        Self::maybe_compact(&mut inner);
        Ok(fail_count)
    }

    pub fn size(&self) -> usize {
        self.inner.lock().state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().state.is_empty()
    }

    /// All pending items in dispatch order.
    pub fn items(&self) -> Vec<QueueItem> {
        self.inner.lock().state.iter().cloned().collect()
    }

    /// Snapshot the queue and truncate the WAL.
    pub fn checkpoint(&self) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        Self::checkpoint_locked(&mut inner)
    }

    fn maybe_compact(inner: &mut Inner<W, L>) {
        if inner.wal.write_seq() - inner.snapshot_seq < COMPACT_THRESHOLD {
            return;
        }
        // The triggering write is already durable; compaction can wait.
        if let Err(e) = Self::checkpoint_locked(inner) {
            warn!(error = %e, "queue compaction failed");
        }
    }

    fn checkpoint_locked(inner: &mut Inner<W, L>) -> Result<(), QueueError> {
        let seq = inner.wal.write_seq();
        if seq == inner.snapshot_seq {
            return Ok(());
        }

        let result = inner.checkpointer.checkpoint(seq, &inner.state)?;
        inner.snapshot_seq = seq;
        debug!(seq, size_bytes = result.size_bytes, "queue checkpoint written");

        // Records up to `seq` are covered by the snapshot and skipped on replay.
        if let Err(e) = inner.wal.truncate_before(seq + 1) {
            warn!(seq, error = %e, "WAL truncation after checkpoint failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
