// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon settings file.
//!
//! ```toml
//! [catalog]
//! location = "https://octane.example.com"
//! shared_space = 1001
//! client_id = "ci-client"
//! client_secret = "..."
//!
//! [builds]
//! jobs_root = "/var/lib/jenkins/jobs"
//!
//! [dispatch]
//! period_ms = 30000
//! ```
//!
//! The catalog section is read again on every dispatch tick, so a fixed
//! configuration takes effect without a restart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tsync_adapters::{CatalogProvider, CatalogSettings, HttpCatalogClient, TracedCatalog};

/// Errors from loading the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("invalid settings in {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Root of the CI server's job folders
    pub jobs_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub period_ms: Option<u64>,
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: Option<CatalogSettings>,
    pub builds: BuildSettings,
    pub dispatch: DispatchSettings,
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SettingsError::Io(path.to_owned(), e)),
        };
        toml::from_str(&text).map_err(|e| SettingsError::Parse(path.to_owned(), e))
    }

    /// Where builds are read from, `<state_dir>/jobs` unless configured.
    pub fn jobs_root(&self, state_dir: &Path) -> PathBuf {
        self.builds
            .jobs_root
            .clone()
            .unwrap_or_else(|| state_dir.join("jobs"))
    }

    /// Dispatch period after applying the environment override.
    pub fn dispatch_period(&self) -> Duration {
        tsync_engine::env::dispatch_period(self.dispatch.period_ms.map(Duration::from_millis))
    }
}

/// Catalog client type used by the daemon
pub type DaemonCatalog = TracedCatalog<HttpCatalogClient>;

/// Builds the catalog client from the settings file on every tick.
///
/// The client is reused while the catalog section is unchanged so its
/// session cookie survives between ticks.
pub struct ConfiguredCatalogs {
    path: PathBuf,
    cached: Mutex<Option<(CatalogSettings, DaemonCatalog)>>,
}

impl ConfiguredCatalogs {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    fn current_settings(&self) -> Option<CatalogSettings> {
        let settings = match Settings::load(&self.path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read settings");
                return None;
            }
        };
        let Some(catalog) = settings.catalog else {
            tracing::warn!(path = %self.path.display(), "no [catalog] section in settings");
            return None;
        };
        if let Err(reason) = catalog.validate() {
            tracing::warn!(reason, "catalog settings are not valid");
            return None;
        }
        Some(catalog)
    }
}

impl CatalogProvider for ConfiguredCatalogs {
    type Client = DaemonCatalog;

    fn client(&self) -> Option<DaemonCatalog> {
        let Some(settings) = self.current_settings() else {
            *self.cached.lock() = None;
            return None;
        };

        let mut cached = self.cached.lock();
        if let Some((current, client)) = cached.as_ref() {
            if *current == settings {
                return Some(client.clone());
            }
        }

        match HttpCatalogClient::new(settings.clone()) {
            Ok(client) => {
                tracing::info!(location = %settings.location, "catalog client configured");
                let client = TracedCatalog::new(client);
                *cached = Some((settings, client.clone()));
                Some(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to build catalog client");
                *cached = None;
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
