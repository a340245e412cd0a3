// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage writers with failure injection, for tests.

use crate::checkpoint::{CheckpointError, CheckpointWriter};
use crate::wal::WalWriter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One recorded checkpoint I/O call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoOp {
    Write(PathBuf),
    FsyncFile(PathBuf),
    Rename(PathBuf, PathBuf),
    FsyncDir(PathBuf),
}

#[derive(Default)]
struct FakeState {
    ops: Vec<IoOp>,
    files: HashMap<PathBuf, Vec<u8>>,
    fail_write: bool,
    fail_fsync_file: bool,
    fail_fsync_dir: bool,
}

#[derive(Clone, Default)]
pub struct FakeCheckpointWriter {
    inner: Arc<Mutex<FakeState>>,
}

fn injected(what: &str) -> CheckpointError {
    CheckpointError::Io(std::io::Error::other(format!("injected {what} failure")))
}

impl FakeCheckpointWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_write(&self, fail: bool) {
        self.inner.lock().fail_write = fail;
    }

    pub fn set_fail_fsync_file(&self, fail: bool) {
        self.inner.lock().fail_fsync_file = fail;
    }

    pub fn set_fail_fsync_dir(&self, fail: bool) {
        self.inner.lock().fail_fsync_dir = fail;
    }

    pub fn ops(&self) -> Vec<IoOp> {
        self.inner.lock().ops.clone()
    }

    pub fn data(&self, path: &Path) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).cloned()
    }
}

impl CheckpointWriter for FakeCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
        let mut inner = self.inner.lock();
        if inner.fail_write {
            return Err(injected("write"));
        }
        inner.ops.push(IoOp::Write(path.to_owned()));
        inner.files.insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), CheckpointError> {
        let mut inner = self.inner.lock();
        if inner.fail_fsync_file {
            return Err(injected("fsync"));
        }
        inner.ops.push(IoOp::FsyncFile(path.to_owned()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), CheckpointError> {
        let mut inner = self.inner.lock();
        if let Some(data) = inner.files.remove(from) {
            inner.files.insert(to.to_owned(), data);
        }
        inner.ops.push(IoOp::Rename(from.to_owned(), to.to_owned()));
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        let mut inner = self.inner.lock();
        if inner.fail_fsync_dir {
            return Err(injected("fsync_dir"));
        }
        inner.ops.push(IoOp::FsyncDir(path.to_owned()));
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, CheckpointError> {
        let inner = self.inner.lock();
        Ok(inner.files.get(path).map(|d| d.len() as u64).unwrap_or(0))
    }
}

#[derive(Default)]
struct WalFakeState {
    tear_writes: u32,
    fail_syncs: u32,
    writes: u32,
    rollbacks: Vec<u64>,
}

/// [`WalWriter`] over the real log file that can tear or fail appends.
#[derive(Clone, Default)]
pub struct FakeWalWriter {
    inner: Arc<Mutex<WalFakeState>>,
}

impl FakeWalWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` writes stop after half the record and fail.
    pub fn tear_next_writes(&self, n: u32) {
        self.inner.lock().tear_writes = n;
    }

    /// The next `n` fsyncs fail after the record was written.
    pub fn fail_next_syncs(&self, n: u32) {
        self.inner.lock().fail_syncs = n;
    }

    pub fn writes(&self) -> u32 {
        self.inner.lock().writes
    }

    /// File lengths the log was cut back to, in call order.
    pub fn rollbacks(&self) -> Vec<u64> {
        self.inner.lock().rollbacks.clone()
    }
}

impl WalWriter for FakeWalWriter {
    fn write(&self, file: &mut File, data: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        if inner.tear_writes > 0 {
            inner.tear_writes -= 1;
            file.write_all(&data[..data.len() / 2])?;
            return Err(io::Error::other("injected torn write"));
        }
        file.write_all(data)
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_syncs > 0 {
            inner.fail_syncs -= 1;
            return Err(io::Error::other("injected fsync failure"));
        }
        file.sync_data()
    }

    fn truncate(&self, file: &File, len: u64) -> io::Result<()> {
        self.inner.lock().rollbacks.push(len);
        file.set_len(len)
    }
}
