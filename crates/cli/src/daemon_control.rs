// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting, replacing and stopping tsyncd for CLI commands.
//!
//! `tsync queue push` usually runs from a build hook, so it starts the
//! daemon on demand and replaces one left behind by another release.
//! Nobody reads hook output, so connection failures also go to `cli.log`.

use std::fs::OpenOptions;
use std::io::Write;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tsync_daemon::PROTOCOL_VERSION;

use crate::client::{poll_interval, timeout_connect, timeout_exit, ClientError, DaemonClient};
use crate::daemon_files::{is_alive, spawn_daemon, DaemonFiles, Signal};

/// Connect to the daemon, starting it when nothing listens on the socket.
///
/// A daemon from another release is replaced at most once per process, so
/// two CLIs of different versions cannot keep restarting each other's daemon
/// from a single command.
pub fn ensure_running(files: &DaemonFiles) -> Result<DaemonClient, ClientError> {
    static REPLACED: AtomicBool = AtomicBool::new(false);

    if let Some(version) = files.foreign_version() {
        if !REPLACED.swap(true, Ordering::SeqCst) {
            eprintln!(
                "warn: daemon version {version} does not match cli version {PROTOCOL_VERSION}, restarting daemon"
            );
            terminate_blocking(files);
        }
    }

    if files.is_listening() {
        return Ok(DaemonClient::new(files.clone()));
    }

    files.clear_stale();
    let result = spawn_daemon().and_then(|child| wait_until_listening(files, child));
    if let Err(e) = &result {
        record_connection_error(files, e);
    }
    result
}

fn wait_until_listening(files: &DaemonFiles, mut child: Child) -> Result<DaemonClient, ClientError> {
    let pid = child.id();
    let deadline = Instant::now() + timeout_connect();
    while Instant::now() < deadline {
        // Checked first: a daemon started concurrently by another CLI wins the
        // lock and ours exits, which is not a failure
        if files.is_listening() {
            return Ok(DaemonClient::new(files.clone()));
        }
        if let Ok(Some(status)) = child.try_wait() {
            return Err(exit_reason(files, pid, status));
        }
        thread::sleep(poll_interval());
    }
    Err(files
        .startup_failure(pid)
        .map(ClientError::DaemonStartFailed)
        .unwrap_or(ClientError::DaemonStartTimeout))
}

/// Reason for a daemon that exited during startup, waiting briefly for its
/// failure line to reach `daemon.log`.
fn exit_reason(files: &DaemonFiles, pid: u32, status: ExitStatus) -> ClientError {
    let deadline = Instant::now() + timeout_exit();
    loop {
        if let Some(reason) = files.startup_failure(pid) {
            return ClientError::DaemonStartFailed(reason);
        }
        if Instant::now() >= deadline {
            return ClientError::DaemonStartFailed(format!("exited with {status}"));
        }
        thread::sleep(poll_interval());
    }
}

/// Stop the daemon: ask over the socket, then kill it after `timeout_exit`.
///
/// Returns false when no daemon was running.
pub async fn stop(files: &DaemonFiles) -> Result<bool, ClientError> {
    if !files.socket().exists() {
        files.clear_stale();
        return Ok(false);
    }

    let asked = DaemonClient::new(files.clone()).shutdown().await.is_ok();
    let Some(pid) = files.pid().filter(|&pid| is_alive(pid)) else {
        files.clear_stale();
        return Ok(asked);
    };

    // The daemon finishes its in-flight dispatch before exiting
    if !(asked && exits_within(pid, timeout_exit()).await) {
        Signal::Kill.send(pid);
        exits_within(pid, timeout_exit()).await;
    }
    files.clear_stale();
    Ok(true)
}

async fn exits_within(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    !is_alive(pid)
}

/// SIGTERM then SIGKILL, polling without the runtime.
///
/// Used while replacing a foreign daemon, which happens from sync code
/// already running inside the runtime.
fn terminate_blocking(files: &DaemonFiles) {
    if let Some(pid) = files.pid() {
        for signal in [Signal::Terminate, Signal::Kill] {
            if !signal.send(pid) || exits_blocking(pid, timeout_exit()) {
                break;
            }
        }
    }
    files.clear_stale();
}

fn exits_blocking(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        thread::sleep(poll_interval());
    }
    !is_alive(pid)
}

/// Append a connection failure to `cli.log` in the state directory.
pub fn record_connection_error(files: &DaemonFiles, error: &ClientError) {
    let line = format!(
        "[{}] pid={} cwd={} TSYNC_STATE_DIR={} socket={} error={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        std::process::id(),
        std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "(unknown)".to_string()),
        crate::env::state_dir_raw().unwrap_or_else(|| "(not set)".to_string()),
        files.socket().display(),
        error,
    );
    let _ = std::fs::create_dir_all(files.dir());
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(files.cli_log())
    {
        let _ = writeln!(file, "{line}");
    }
}

#[cfg(test)]
#[path = "daemon_control_tests.rs"]
mod tests;
