// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL write-ahead log of queue operations.
//!
//! Every append is fsynced before it returns. A write that fails part way is
//! rolled back to the previous file length, so the log never keeps a torn
//! record written by this process. Append I/O goes through [`WalWriter`] so
//! tests can inject failures.
//!
//! Each entry is a single line of JSON: `{"seq":N,"op":{...}}\n`

use crate::state::QueueOp;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Attempts made for one durable append before giving up
pub const PERSIST_ATTEMPTS: u32 = 3;

/// Backoff step between attempts (multiplied by the attempt number)
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Errors that can occur in Wal operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to persist record after {attempts} attempts: {source}")]
    Persist { attempts: u32, source: io::Error },
}

/// Serialization helper for writing WAL entries without cloning the op.
#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    op: &'a QueueOp,
}

/// Deserialization helper for reading WAL entries.
#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    op: QueueOp,
}

/// A single WAL entry with sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    pub seq: u64,
    pub op: QueueOp,
}

/// Append primitives for the open log file.
pub trait WalWriter: Send + Sync + 'static {
    fn write(&self, file: &mut File, data: &[u8]) -> io::Result<()>;

    fn sync(&self, file: &File) -> io::Result<()>;

    /// Cut the file back to `len` after a failed append.
    fn truncate(&self, file: &File, len: u64) -> io::Result<()>;
}

/// Production WAL writer using real filesystem operations.
#[derive(Debug, Clone, Default)]
pub struct FsWalWriter;

impl WalWriter for FsWalWriter {
    fn write(&self, file: &mut File, data: &[u8]) -> io::Result<()> {
        file.write_all(data)
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_data()
    }

    fn truncate(&self, file: &File, len: u64) -> io::Result<()> {
        file.set_len(len)
    }
}

/// Result of scanning a WAL file from the start.
struct Scan {
    max_seq: u64,
    valid_lines: Vec<String>,
    corrupt: bool,
}

/// Append-only JSONL log with synchronous durability.
pub struct Wal<L: WalWriter = FsWalWriter> {
    file: File,
    writer: L,
    path: PathBuf,
    /// Highest sequence number assigned so far
    write_seq: u64,
    /// Length of the file after the last durable append
    len: u64,
}

impl Wal<FsWalWriter> {
    /// Open or create a WAL at the given path.
    ///
    /// `base_seq` is the sequence covered by the latest snapshot. Sequence
    /// numbering continues from whichever is higher: the log or the snapshot.
    pub fn open(path: &Path, base_seq: u64) -> Result<Self, WalError> {
        Self::open_with_writer(path, base_seq, FsWalWriter)
    }
}

impl<L: WalWriter> Wal<L> {
    pub fn open_with_writer(path: &Path, base_seq: u64, writer: L) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = Self::open_file(path)?;
        let mut scan = Self::scan(&file)?;

        if scan.corrupt {
            drop(file);

            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = scan.valid_lines.len(),
                "corrupt WAL detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            {
                let mut clean = File::create(path)?;
                for line in &scan.valid_lines {
                    clean.write_all(line.as_bytes())?;
                    clean.write_all(b"\n")?;
                }
                clean.sync_all()?;
            }

            file = Self::open_file(path)?;
            scan = Self::scan(&file)?;
        }

        let mut len = file.metadata()?.len();
        if len > 0 && !Self::ends_with_newline(&file, len)? {
            // Complete final record whose newline never made it to disk
            file.write_all(b"\n")?;
            file.sync_data()?;
            len += 1;
        }

        Ok(Self {
            file,
            writer,
            path: path.to_owned(),
            write_seq: scan.max_seq.max(base_seq),
            len,
        })
    }

    fn open_file(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
    }

    fn ends_with_newline(file: &File, len: u64) -> io::Result<bool> {
        let mut reader = file.try_clone()?;
        reader.seek(SeekFrom::Start(len - 1))?;
        let mut last = [0u8; 1];
        reader.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }

    /// Read every line up to the first unparseable one.
    fn scan(file: &File) -> Result<Scan, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut scan = Scan {
            max_seq: 0,
            valid_lines: Vec::new(),
            corrupt: false,
        };
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    scan.corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<WalRecord>(trimmed) {
                Ok(record) => {
                    scan.max_seq = scan.max_seq.max(record.seq);
                    scan.valid_lines.push(trimmed.to_string());
                }
                Err(_) => {
                    scan.corrupt = true;
                    break;
                }
            }
        }

        Ok(scan)
    }

    /// Durably append an op and return its sequence number.
    ///
    /// The write is retried up to [`PERSIST_ATTEMPTS`] times. On failure the
    /// sequence counter is left untouched.
    pub fn append(&mut self, op: &QueueOp) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let mut line = serde_json::to_vec(&WalRecordRef { seq, op })?;
        line.push(b'\n');

        let mut attempt = 1;
        loop {
            match self.write_durable(&line) {
                Ok(()) => {
                    self.write_seq = seq;
                    self.len += line.len() as u64;
                    return Ok(seq);
                }
                Err(e) if attempt < PERSIST_ATTEMPTS => {
                    warn!(
                        path = %self.path.display(),
                        seq,
                        attempt,
                        error = %e,
                        "WAL append failed, retrying",
                    );
                    thread::sleep(RETRY_BACKOFF * attempt);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(WalError::Persist {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    fn write_durable(&mut self, line: &[u8]) -> io::Result<()> {
        let result = self
            .writer
            .write(&mut self.file, line)
            .and_then(|()| self.writer.sync(&self.file));
        if result.is_err() {
            if let Err(e) = self.writer.truncate(&self.file, self.len) {
                warn!(path = %self.path.display(), error = %e, "WAL rollback failed");
            }
        }
        result
    }

    /// Highest sequence number written (or covered by the base snapshot).
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Truncate entries before the given sequence number.
    ///
    /// Called after a checkpoint to reclaim disk space. Writes a new log with
    /// only entries `>= seq` and swaps it in with a rename.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        let tmp_path = self.path.with_extension("tmp");

        let kept: Vec<String> = Self::scan(&self.file)?
            .valid_lines
            .into_iter()
            .filter(|line| {
                serde_json::from_str::<WalRecord>(line)
                    .map(|record| record.seq >= seq)
                    .unwrap_or(false)
            })
            .collect();

        let mut len = 0u64;
        {
            let mut tmp_file = File::create(&tmp_path)?;
            for line in &kept {
                tmp_file.write_all(line.as_bytes())?;
                tmp_file.write_all(b"\n")?;
                len += line.len() as u64 + 1;
            }
            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            File::open(parent)?.sync_all()?;
        }

        self.file = Self::open_file(&self.path)?;
        self.len = len;
        Ok(())
    }

    /// All entries with a sequence number greater than `seq`.
    ///
    /// Used for recovery (replaying after the snapshot).
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut line = String::new();
        let mut offset = 0u64;

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if !trimmed.is_empty() {
                let record: WalRecord = match serde_json::from_str(trimmed) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(
                            offset,
                            error = %e,
                            "corrupt WAL entry during replay, stopping at corruption point",
                        );
                        break;
                    }
                };
                if record.seq > seq {
                    entries.push(WalEntry {
                        seq: record.seq,
                        op: record.op,
                    });
                }
            }
            offset += bytes_read as u64;
        }

        Ok(entries)
    }

    /// Size of the log file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
