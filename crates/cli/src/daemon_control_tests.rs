// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serial_test::serial;
use tempfile::tempdir;
use tokio::net::UnixListener;
use tsync_daemon::protocol::{self, DEFAULT_TIMEOUT};
use tsync_daemon::{Request, Response};

use super::*;

fn files_in(dir: &Path) -> DaemonFiles {
    DaemonFiles::in_dir(dir.to_path_buf())
}

/// Install a stand-in for tsyncd that fails the way a misconfigured daemon does.
fn failing_daemon(dir: &Path, reason: &str) {
    let script = dir.join("tsyncd");
    let log = dir.join("daemon.log");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\n\
             echo \"--- tsyncd: starting (pid: $$) ---\" >> '{log}'\n\
             echo 'ERROR Failed to start daemon: {reason}' >> '{log}'\n\
             exit 1\n",
            log = log.display(),
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    std::env::set_var("TSYNC_DAEMON_BINARY", &script);
}

#[test]
#[serial]
fn listening_daemon_is_reused_without_spawning() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());
    let _listener = std::os::unix::net::UnixListener::bind(files.socket()).unwrap();
    std::env::set_var("TSYNC_DAEMON_BINARY", dir.path().join("missing-tsyncd"));

    assert!(ensure_running(&files).is_ok());
    assert!(!files.cli_log().exists());
}

#[test]
#[serial]
fn failed_start_reports_reason_from_daemon_log() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());
    failing_daemon(dir.path(), "Settings error: no catalog configured");

    let err = ensure_running(&files).err().unwrap();

    assert!(
        matches!(err, ClientError::DaemonStartFailed(ref reason) if reason == "Settings error: no catalog configured"),
        "got {err}"
    );
    let cli_log = fs::read_to_string(files.cli_log()).unwrap();
    assert!(cli_log.contains("no catalog configured"), "got {cli_log}");
}

#[test]
#[serial]
fn stale_socket_is_cleared_before_spawning() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());
    fs::write(files.socket(), "").unwrap();
    failing_daemon(dir.path(), "boom");

    let _ = ensure_running(&files);

    assert!(!files.socket().exists());
}

#[test]
#[serial]
fn missing_binary_is_a_start_failure() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());
    std::env::set_var("TSYNC_DAEMON_BINARY", dir.path().join("missing-tsyncd"));

    let err = ensure_running(&files).err().unwrap();

    assert!(matches!(err, ClientError::DaemonStartFailed(_)), "got {err}");
    assert!(files.cli_log().exists());
}

#[tokio::test]
async fn stop_without_socket_is_not_running() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());

    assert!(!stop(&files).await.unwrap());
}

#[tokio::test]
async fn stop_clears_files_of_crashed_daemon() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());
    fs::write(files.socket(), "").unwrap();
    fs::write(dir.path().join("daemon.pid"), "999999999\n").unwrap();

    assert!(!stop(&files).await.unwrap());
    assert!(!files.socket().exists());
    assert!(!dir.path().join("daemon.pid").exists());
}

#[tokio::test]
async fn stop_asks_daemon_to_shut_down() {
    let dir = tempdir().unwrap();
    let files = files_in(dir.path());
    let listener = UnixListener::bind(files.socket()).unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        protocol::write_response(&mut writer, &Response::ShuttingDown, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        request
    });

    assert!(stop(&files).await.unwrap());
    assert!(matches!(server.await.unwrap(), Request::Shutdown));
}

#[test]
#[serial]
fn connection_error_is_recorded_in_cli_log() {
    let dir = tempdir().unwrap();
    std::env::set_var("TSYNC_STATE_DIR", dir.path());
    let files = files_in(dir.path());

    record_connection_error(&files, &ClientError::DaemonNotRunning);

    let content = fs::read_to_string(dir.path().join("cli.log")).unwrap();
    assert!(content.contains("pid="), "log should contain pid");
    assert!(content.contains("cwd="), "log should contain cwd");
    assert!(content.contains(&format!("TSYNC_STATE_DIR={}", dir.path().display())));
    assert!(content.contains(&format!("socket={}", files.socket().display())));
    assert!(content.contains("Daemon not running"));
}
