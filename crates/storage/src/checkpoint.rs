// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpointing with zstd compression and durable fsync.
//!
//! The snapshot must be durable (including the directory fsync) before the
//! WAL is truncated:
//!
//! ```text
//! serialize + compress
//! write to .tmp
//! fsync .tmp
//! rename → snapshot
//! fsync directory
//! truncate WAL (caller)
//! ```
//!
//! All I/O goes through [`CheckpointWriter`] so tests can inject failures.

use crate::snapshot::Snapshot;
use crate::state::QueueState;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
}

/// Result of a completed checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub seq: u64,
    /// Size of the compressed snapshot in bytes
    pub size_bytes: u64,
}

/// Checkpoint file operations.
pub trait CheckpointWriter: Send + Sync + 'static {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError>;

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError>;

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError>;

    /// Fsync directory to make the rename durable.
    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError>;

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError>;
}

/// Production checkpoint writer using real filesystem operations.
#[derive(Debug, Clone, Default)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// Writes compressed queue snapshots.
pub struct Checkpointer<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    snapshot_path: PathBuf,
    compression_level: i32,
}

impl Checkpointer<FsCheckpointWriter> {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, snapshot_path)
    }
}

impl<W: CheckpointWriter> Checkpointer<W> {
    pub fn with_writer(writer: W, snapshot_path: PathBuf) -> Self {
        Self {
            writer,
            snapshot_path,
            compression_level: 3,
        }
    }

    /// Set the zstd compression level (1-22, default 3).
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write a snapshot of `state` covering WAL records up to `seq`.
    ///
    /// Returns only once the snapshot and its rename are durable.
    pub fn checkpoint(
        &self,
        seq: u64,
        state: &QueueState,
    ) -> Result<CheckpointResult, CheckpointError> {
        let tmp_path = self.snapshot_path.with_extension("tmp");

        let json_bytes = serde_json::to_vec(&Snapshot::new(seq, state.clone()))?;
        let compressed = zstd::encode_all(json_bytes.as_slice(), self.compression_level)
            .map_err(|e| CheckpointError::Compress(e.to_string()))?;

        self.writer.write_tmp(&tmp_path, &compressed)?;
        self.writer.fsync_file(&tmp_path)?;
        self.writer.rename(&tmp_path, &self.snapshot_path)?;
        if let Some(parent) = self.snapshot_path.parent() {
            self.writer.fsync_dir(parent)?;
        }

        let size_bytes = self
            .writer
            .file_size(&self.snapshot_path)
            .unwrap_or(compressed.len() as u64);

        Ok(CheckpointResult { seq, size_bytes })
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
