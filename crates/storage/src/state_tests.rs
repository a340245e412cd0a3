// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn pushed(project: &str, build: u32) -> QueueOp {
    QueueOp::Pushed {
        project_name: project.to_string(),
        build_number: build,
    }
}

#[test]
fn pushed_items_keep_fifo_order() {
    let mut state = QueueState::default();
    state.apply(1, &pushed("ProjectA", 10));
    state.apply(2, &pushed("ProjectB", 3));

    let head = state.head().unwrap();
    assert_eq!(head.id, 1);
    assert_eq!(head.build_ref().to_string(), "ProjectA#10");
    assert_eq!(state.len(), 2);
}

#[test]
fn replaying_push_is_idempotent() {
    let mut state = QueueState::default();
    state.apply(1, &pushed("ProjectA", 10));
    state.apply(1, &pushed("ProjectA", 10));
    assert_eq!(state.len(), 1);
}

#[test]
fn removed_drops_item_by_id() {
    let mut state = QueueState::default();
    state.apply(1, &pushed("ProjectA", 10));
    state.apply(2, &pushed("ProjectA", 11));
    state.apply(3, &QueueOp::Removed { id: 1 });
    state.apply(4, &QueueOp::Removed { id: 1 });

    assert_eq!(state.len(), 1);
    assert_eq!(state.head().unwrap().build_number, 11);
}

#[test]
fn failed_increments_fail_count() {
    let mut state = QueueState::default();
    state.apply(1, &pushed("ProjectA", 10));
    state.apply(2, &QueueOp::Failed { id: 1 });
    state.apply(3, &QueueOp::Failed { id: 1 });
    // unknown ids are ignored
    state.apply(4, &QueueOp::Failed { id: 99 });

    assert_eq!(state.head().unwrap().fail_count, 2);
}

#[test]
fn ops_serialize_with_type_tag() {
    let json = serde_json::to_string(&pushed("ProjectA", 10)).unwrap();
    assert_eq!(
        json,
        r#"{"type":"pushed","project_name":"ProjectA","build_number":10}"#
    );
    let op: QueueOp = serde_json::from_str(r#"{"type":"failed","id":4}"#).unwrap();
    assert_eq!(op, QueueOp::Failed { id: 4 });
}
