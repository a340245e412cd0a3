// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    seconds = { 42, "42s" },
    minutes = { 61, "1m 1s" },
    hours = { 3723, "1h 2m 3s" },
    hour_exact = { 3600, "1h 0m 0s" },
    zero = { 0, "0s" },
)]
fn uptime_formatting(secs: u64, expected: &str) {
    assert_eq!(format_uptime(secs), expected);
}

#[test]
fn last_lines_of_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dispatch.log");
    std::fs::write(&path, "a\nb\nc\nd\n").unwrap();

    assert_eq!(read_last_lines(&path, Some(2)).unwrap(), vec!["c", "d"]);
    assert_eq!(read_last_lines(&path, Some(10)).unwrap().len(), 4);
    assert_eq!(read_last_lines(&path, None).unwrap().len(), 4);
}

#[test]
fn print_log_tolerates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.log");

    assert!(print_log(&path, Some(5), OutputFormat::Text, "dispatch log").is_ok());
    assert!(print_log(&path, Some(5), OutputFormat::Json, "dispatch log").is_ok());
}
