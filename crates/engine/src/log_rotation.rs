// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Size-capped rotation for append-only log files.

use std::path::{Path, PathBuf};

/// Rotate a log once it exceeds this size.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated logs kept (`<log>.1` .. `<log>.3`).
pub const MAX_ROTATIONS: u32 = 3;

/// Shift `log_path` to `<log_path>.1` (and older rotations up by one)
/// when it has grown past [`MAX_LOG_SIZE`].
///
/// Best effort: rename failures leave the log where it is.
pub fn rotate_log_if_needed(log_path: &Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }

    let rotated = |n: u32| -> PathBuf {
        let mut name = log_path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    };

    let _ = std::fs::remove_file(rotated(MAX_ROTATIONS));
    for n in (1..MAX_ROTATIONS).rev() {
        let from = rotated(n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(n + 1));
        }
    }
    let _ = std::fs::rename(log_path, rotated(1));
}

#[cfg(test)]
#[path = "log_rotation_tests.rs"]
mod tests;
