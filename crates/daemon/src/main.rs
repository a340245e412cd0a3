// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test Sync Daemon (tsyncd)
//!
//! Background process that owns the discovery queue and syncs detected
//! tests to the catalog.
//!
//! Architecture:
//! - Listener Task: Spawned task handling socket I/O, enqueues builds
//! - Dispatch Task: Periodic drain of the queue into the catalog
//! - Main Task: Waits for shutdown and checkpoints the queue

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;
mod listener;
mod protocol;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};
use tsync_engine::log_rotation::rotate_log_if_needed;
use tsync_engine::spawn_dispatcher;
use tsync_daemon::startup_log;
use tsync_storage::DiscoveryQueue;

use crate::lifecycle::{Config, LifecycleError, StartupResult};
use crate::listener::{ListenCtx, Listener};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tsyncd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("tsyncd {VERSION}");
                println!("Test Sync Daemon - queues discovered builds and syncs their tests to the catalog");
                println!();
                println!("USAGE:");
                println!("    tsyncd");
                println!();
                println!("The daemon listens on a Unix socket for builds enqueued with");
                println!("`tsync queue push` and publishes their detection results in order.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: tsyncd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Marker goes in before tracing starts so the CLI can find this attempt
    rotate_log_if_needed(&config.log_path);
    startup_log::append(&config.log_path, &startup_log::marker_line(std::process::id()))?;

    let log_guard = setup_logging(&config)?;

    info!("Starting test sync daemon");

    let StartupResult {
        mut daemon,
        listener: unix_listener,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("tsyncd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                if version == VERSION {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated, current: {VERSION})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Tracing is non-blocking and may not flush before exit
            let _ = startup_log::append(&config.log_path, &startup_log::failure_line(&e));
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Shutdown requested over IPC
    let shutdown_notify = Arc::new(Notify::new());
    // Stops the dispatch loop between ticks
    let dispatch_stop = Arc::new(Notify::new());

    let listener = Listener::new(
        unix_listener,
        ListenCtx {
            dispatcher: Arc::clone(&daemon.dispatcher),
            builds: daemon.builds.clone(),
            start_time: daemon.start_time,
            shutdown: Arc::clone(&shutdown_notify),
        },
    );
    tokio::spawn(listener.run());

    let period = daemon.settings.dispatch_period();
    info!(period_ms = period.as_millis() as u64, "starting dispatch loop");
    let dispatch_handle = spawn_dispatcher(
        Arc::clone(&daemon.dispatcher),
        period,
        Arc::clone(&dispatch_stop),
    );

    spawn_checkpoint(Arc::clone(&daemon.queue));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd, CLI waiting for startup)
    println!("READY");

    tokio::select! {
        _ = shutdown_notify.notified() => {
            info!("Shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    // An in-flight tick finishes before the loop observes the stop
    dispatch_stop.notify_waiters();
    if let Err(e) = dispatch_handle.await {
        error!("dispatch task failed: {}", e);
    }

    daemon.shutdown()?;
    info!("Daemon stopped");
    Ok(())
}

/// Checkpoint interval (60 seconds)
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a task that periodically compacts the queue log into a snapshot.
///
/// This bounds recovery time after a crash.
fn spawn_checkpoint(queue: Arc<DiscoveryQueue>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        // First tick completes immediately; startup already replayed the log
        interval.tick().await;

        loop {
            interval.tick().await;
            let queue = Arc::clone(&queue);
            let saved = tokio::task::spawn_blocking(move || {
                queue.checkpoint().map(|()| queue.size())
            })
            .await;
            match saved {
                Ok(Ok(size)) => tracing::debug!(size, "saved queue checkpoint"),
                Ok(Err(e)) => tracing::warn!(error = %e, "failed to checkpoint queue"),
                Err(e) => tracing::warn!(error = %e, "checkpoint task failed"),
            }
        }
    });
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
