// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

/// Period between dispatch ticks unless configured otherwise.
pub const DEFAULT_DISPATCH_PERIOD: Duration = Duration::from_millis(30_000);

/// Dispatch period override (`TSYNC_DISPATCH_PERIOD_MS`).
pub fn dispatch_period_ms() -> Option<Duration> {
    std::env::var("TSYNC_DISPATCH_PERIOD_MS")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Resolve the dispatch period: environment, then `configured`, then the default.
pub fn dispatch_period(configured: Option<Duration>) -> Duration {
    dispatch_period_ms()
        .or(configured.filter(|d| !d.is_zero()))
        .unwrap_or(DEFAULT_DISPATCH_PERIOD)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
