// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup records in `daemon.log`.
//!
//! Every start appends a marker naming its pid. A start that fails appends
//! one failure line before exiting, written synchronously so a CLI waiting
//! on the spawned process can explain the failure even if tracing has not
//! flushed yet.

use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Start of the marker line. Full format: `--- tsyncd: starting (pid: 12345) ---`
pub const MARKER_PREFIX: &str = "--- tsyncd: starting (pid: ";

const FAILURE_PREFIX: &str = "Failed to start daemon: ";

pub fn marker_line(pid: u32) -> String {
    format!("{MARKER_PREFIX}{pid}) ---")
}

pub fn failure_line(error: &dyn Display) -> String {
    format!("ERROR {FAILURE_PREFIX}{error}")
}

/// Append one line to the log, creating it and its directory as needed.
pub fn append(log_path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{line}")
}

/// Why the start attempt by `pid` failed, if it recorded a failure.
///
/// Only the section after that attempt's own marker is read. The tracing
/// copy of the failure line repeats the synchronous one, so repeated
/// reasons collapse.
pub fn failure_for(log: &str, pid: u32) -> Option<String> {
    let (_, attempt) = log.rsplit_once(&marker_line(pid))?;
    let attempt = attempt.split(MARKER_PREFIX).next().unwrap_or_default();

    let mut reasons: Vec<&str> = Vec::new();
    for line in attempt.lines() {
        let Some((_, reason)) = line.split_once(FAILURE_PREFIX) else {
            continue;
        };
        let reason = reason.trim_end();
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }
    (!reasons.is_empty()).then(|| reasons.join("\n"))
}

#[cfg(test)]
#[path = "startup_log_tests.rs"]
mod tests;
