// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's state directory as seen from the CLI.

use std::fs;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tsync_daemon::{startup_log, PROTOCOL_VERSION};

use crate::client::ClientError;

/// Files tsyncd keeps under its state directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonFiles {
    dir: PathBuf,
}

impl DaemonFiles {
    /// Files under the state directory the daemon resolves from the same environment.
    pub fn locate() -> Result<Self, ClientError> {
        Ok(Self::in_dir(crate::env::state_dir()?))
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn socket(&self) -> PathBuf {
        self.dir.join("daemon.sock")
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join("daemon.log")
    }

    /// Connection failures seen by producers
    pub fn cli_log(&self) -> PathBuf {
        self.dir.join("cli.log")
    }

    fn pid_file(&self) -> PathBuf {
        self.dir.join("daemon.pid")
    }

    /// Pid recorded by the daemon holding (or last holding) the lock.
    pub fn pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_file()).ok()?.trim().parse().ok()
    }

    /// Version recorded by the daemon, when it is not ours.
    pub fn foreign_version(&self) -> Option<String> {
        let recorded = fs::read_to_string(self.dir.join("daemon.version")).ok()?;
        let recorded = recorded.trim();
        (recorded != PROTOCOL_VERSION).then(|| recorded.to_string())
    }

    /// True when something accepts connections on the socket.
    pub fn is_listening(&self) -> bool {
        UnixStream::connect(self.socket()).is_ok()
    }

    /// Remove the socket and pid file of a daemon that is gone.
    ///
    /// A live pid keeps both: a daemon that is still starting writes its pid
    /// before it binds the socket.
    pub fn clear_stale(&self) {
        if self.pid().is_some_and(is_alive) {
            return;
        }
        let _ = fs::remove_file(self.socket());
        let _ = fs::remove_file(self.pid_file());
    }

    /// Why the start attempt by `pid` failed, read from `daemon.log`.
    pub fn startup_failure(&self, pid: u32) -> Option<String> {
        let log = fs::read_to_string(self.log()).ok()?;
        startup_log::failure_for(&log, pid)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Signals the CLI sends to tsyncd
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Delivers nothing; only checks the process exists
    Exists,
    Terminate,
    Kill,
}

impl Signal {
    fn flag(self) -> &'static str {
        match self {
            Signal::Exists => "-0",
            Signal::Terminate => "-TERM",
            Signal::Kill => "-KILL",
        }
    }

    /// Send to `pid`. False when no such process can be signalled.
    pub fn send(self, pid: u32) -> bool {
        Command::new("kill")
            .arg(self.flag())
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

pub fn is_alive(pid: u32) -> bool {
    Signal::Exists.send(pid)
}

/// tsyncd to run: `TSYNC_DAEMON_BINARY`, else next to this executable, else `PATH`.
pub fn daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("tsyncd")))
        .filter(|sibling| sibling.exists())
        .unwrap_or_else(|| PathBuf::from("tsyncd"))
}

/// Start tsyncd detached from our stdio. It reports through `daemon.log`.
pub fn spawn_daemon() -> Result<Child, ClientError> {
    Command::new(daemon_binary())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

#[cfg(test)]
#[path = "daemon_files_tests.rs"]
mod tests;
