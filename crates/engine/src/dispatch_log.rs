// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity log of dispatch outcomes, rotated like the daemon log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tsync_core::BuildRef;

use crate::log_rotation::rotate_log_if_needed;

/// Build the path to the dispatch activity log.
///
/// Structure: `{logs_dir}/dispatch.log`
pub fn dispatch_log_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join("dispatch.log")
}

/// Append-only logger for dispatch activity.
///
/// Writes one human-readable line per queue event:
///   `2026-01-30T08:14:09Z [project#12] delivered`
///
/// Each `append()` call opens, writes, and closes the file, rotating it
/// first once it has outgrown [`MAX_LOG_SIZE`](crate::log_rotation::MAX_LOG_SIZE).
#[derive(Debug, Clone)]
pub struct DispatchLog {
    logs_dir: PathBuf,
}

impl DispatchLog {
    pub fn new(logs_dir: PathBuf) -> Self {
        Self { logs_dir }
    }

    pub fn path(&self) -> PathBuf {
        dispatch_log_path(&self.logs_dir)
    }

    /// Append a timestamped line for `build`.
    ///
    /// Failures are logged via tracing and otherwise ignored.
    pub fn append(&self, build: &BuildRef, message: &str) {
        let path = self.path();
        if let Err(e) = write_line(&path, build, message) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to write dispatch log"
            );
        }
    }
}

fn write_line(path: &Path, build: &BuildRef, message: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_log_if_needed(path);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    writeln!(file, "{ts} [{build}] {message}")
}

#[cfg(test)]
#[path = "dispatch_log_tests.rs"]
mod tests;
