// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial(env)]
fn period_defaults_to_thirty_seconds() {
    std::env::remove_var("TSYNC_DISPATCH_PERIOD_MS");
    assert_eq!(dispatch_period(None), Duration::from_secs(30));
}

#[test]
#[serial(env)]
fn configured_period_is_used_without_override() {
    std::env::remove_var("TSYNC_DISPATCH_PERIOD_MS");
    assert_eq!(
        dispatch_period(Some(Duration::from_millis(500))),
        Duration::from_millis(500)
    );
    assert_eq!(dispatch_period(Some(Duration::ZERO)), DEFAULT_DISPATCH_PERIOD);
}

#[test]
#[serial(env)]
fn environment_overrides_configured_period() {
    std::env::set_var("TSYNC_DISPATCH_PERIOD_MS", "250");
    let period = dispatch_period(Some(Duration::from_secs(10)));
    std::env::remove_var("TSYNC_DISPATCH_PERIOD_MS");
    assert_eq!(period, Duration::from_millis(250));
}

#[test]
#[serial(env)]
fn unparseable_override_is_ignored() {
    std::env::set_var("TSYNC_DISPATCH_PERIOD_MS", "soon");
    let period = dispatch_period(None);
    std::env::remove_var("TSYNC_DISPATCH_PERIOD_MS");
    assert_eq!(period, DEFAULT_DISPATCH_PERIOD);
}
