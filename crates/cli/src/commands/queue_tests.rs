// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tsync_core::test_support::result_with_new_tests;
use yare::parameterized;

#[parameterized(
    untried = { 0, "pending" },
    first_failure = { 1, "retrying 1/5" },
    last_retry = { 5, "retrying 5/5" },
)]
fn status_label(fail_count: u32, expected: &str) {
    assert_eq!(item_status(fail_count), expected);
}

#[test]
fn table_lists_items_in_order() {
    let items = vec![
        QueueEntry {
            id: 1,
            project: "uft".to_string(),
            build: 7,
            fail_count: 0,
        },
        QueueEntry {
            id: 2,
            project: "folder/api".to_string(),
            build: 8,
            fail_count: 2,
        },
    ];
    let mut buf = Vec::new();

    queue_table(&items).render(&mut buf);

    let out = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("uft") && lines[1].contains("pending"));
    assert!(lines[2].contains("folder/api") && lines[2].contains("retrying 2/5"));
}

#[test]
fn load_result_reads_detection_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detection_result.json");
    let result = result_with_new_tests(2);
    std::fs::write(&path, serde_json::to_string(&result).unwrap()).unwrap();

    assert_eq!(load_result(&path).unwrap(), result);
}

#[test]
fn load_result_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detection_result.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = load_result(&path).unwrap_err();

    assert!(err.to_string().contains("invalid detection result"), "{err}");
}

#[test]
fn load_result_rejects_bad_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detection_result.json");
    std::fs::write(&path, r#"{"workspace_id": "abc"}"#).unwrap();

    let err = load_result(&path).unwrap_err();

    assert!(err.to_string().contains("unusable detection result"), "{err}");
}

#[test]
fn load_result_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_result(&dir.path().join("nope.json")).unwrap_err();

    assert!(err.to_string().starts_with("failed to read"), "{err}");
}
