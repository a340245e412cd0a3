// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};

use crate::lifecycle::LifecycleError;

/// Resolve state directory: TSYNC_STATE_DIR > XDG_STATE_HOME/tsync > ~/.local/state/tsync
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TSYNC_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tsync"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/tsync"))
}

/// Settings file: TSYNC_CONFIG > `<state_dir>/config.toml`
pub fn settings_path(state_dir: &Path) -> PathBuf {
    match std::env::var("TSYNC_CONFIG") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => state_dir.join("config.toml"),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
