// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};
use tsync_adapters::FsBuildStore;
use tsync_engine::{DispatchLog, Dispatcher};
use tsync_storage::{DiscoveryQueue, QueueError};

use crate::env;
use crate::settings::{ConfiguredCatalogs, Settings, SettingsError};

/// Dispatcher with the daemon's concrete collaborators
pub type DaemonDispatcher = Dispatcher<ConfiguredCatalogs, FsBuildStore, FsBuildStore>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tsync)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Discovery queue directory
    pub queue_dir: PathBuf,
    /// Directory for activity logs
    pub logs_path: PathBuf,
    /// Settings file
    pub settings_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let settings_path = env::settings_path(&state_dir);
        Ok(Self::for_state_dir(state_dir, settings_path))
    }

    /// Fixed layout under `state_dir`.
    pub fn for_state_dir(state_dir: PathBuf, settings_path: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            queue_dir: state_dir.join("queue"),
            logs_path: state_dir.join("logs"),
            settings_path,
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub queue: Arc<DiscoveryQueue>,
    pub dispatcher: Arc<DaemonDispatcher>,
    /// Build storage, also used to store results received over IPC
    pub builds: FsBuildStore,
    pub settings: Settings,
    pub start_time: Instant,
}

/// Result of daemon startup - the daemon state and the socket to serve.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Checkpoints the queue so the next startup does not replay the WAL.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        match self.queue.checkpoint() {
            Ok(()) => info!(items = self.queue.size(), "saved final queue checkpoint"),
            Err(e) => warn!("Failed to checkpoint queue on shutdown: {}", e),
        }

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Files of a running daemon are left alone
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST, without truncating a running daemon's PID
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Settings and collaborators
    let settings = Settings::load(&config.settings_path)?;
    let builds = FsBuildStore::new(settings.jobs_root(&config.state_dir));
    if settings.catalog.is_none() {
        warn!(
            path = %config.settings_path.display(),
            "catalog not configured yet, builds will queue until it is"
        );
    }

    // 4. Open the queue (replays its WAL)
    let queue = Arc::new(DiscoveryQueue::open(&config.queue_dir)?);
    info!(items = queue.size(), "recovered discovery queue");

    let dispatcher = Arc::new(
        Dispatcher::new(
            Arc::clone(&queue),
            ConfiguredCatalogs::new(config.settings_path.clone()),
            builds.clone(),
            builds.clone(),
        )
        .with_activity_log(DispatchLog::new(config.logs_path.clone())),
    );

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            queue,
            dispatcher,
            builds,
            settings,
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Remove files a failed startup may have created.
fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        remove_if_exists(path);
    }
}

fn remove_if_exists(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
