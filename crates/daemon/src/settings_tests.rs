// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

const FULL: &str = r#"
[catalog]
location = "https://octane.example.com"
shared_space = 1001
client_id = "ci-client"
client_secret = "secret"

[builds]
jobs_root = "/var/lib/jenkins/jobs"

[dispatch]
period_ms = 5000
"#;

fn write_settings(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let settings = Settings::load(&dir.path().join("config.toml")).unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.jobs_root(dir.path()), dir.path().join("jobs"));
}

#[test]
fn full_file_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_settings(dir.path(), FULL);

    let settings = Settings::load(&path).unwrap();

    let catalog = settings.catalog.clone().unwrap();
    assert_eq!(catalog.shared_space, 1001);
    assert_eq!(catalog.timeout_secs, 60);
    assert_eq!(
        settings.jobs_root(dir.path()),
        PathBuf::from("/var/lib/jenkins/jobs")
    );
    assert_eq!(settings.dispatch.period_ms, Some(5000));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_settings(dir.path(), "[catalog\nlocation = 1");

    let err = Settings::load(&path).unwrap_err();

    assert!(matches!(err, SettingsError::Parse(..)));
}

#[test]
#[serial(env)]
fn dispatch_period_prefers_environment() {
    std::env::remove_var("TSYNC_DISPATCH_PERIOD_MS");
    let mut settings = Settings::default();
    assert_eq!(settings.dispatch_period(), Duration::from_secs(30));

    settings.dispatch.period_ms = Some(5000);
    assert_eq!(settings.dispatch_period(), Duration::from_secs(5));

    std::env::set_var("TSYNC_DISPATCH_PERIOD_MS", "250");
    assert_eq!(settings.dispatch_period(), Duration::from_millis(250));
    std::env::remove_var("TSYNC_DISPATCH_PERIOD_MS");
}

#[test]
fn catalog_follows_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let catalogs = ConfiguredCatalogs::new(path.clone());

    assert!(catalogs.client().is_none());

    write_settings(dir.path(), FULL);
    assert!(catalogs.client().is_some());
    assert!(catalogs.client().is_some());

    write_settings(dir.path(), &FULL.replace("https://", "ftp://"));
    assert!(catalogs.client().is_none());
}

#[test]
fn catalog_without_section_is_unconfigured() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_settings(dir.path(), "[dispatch]\nperiod_ms = 1000\n");

    assert!(ConfiguredCatalogs::new(path).client().is_none());
}
