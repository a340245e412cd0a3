// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake_writer::FakeWalWriter;
use tempfile::tempdir;

fn pushed(build: u32) -> QueueOp {
    QueueOp::Pushed {
        project_name: "ProjectA".to_string(),
        build_number: build,
    }
}

#[test]
fn append_assigns_increasing_seqs() {
    let dir = tempdir().unwrap();
    let mut wal = Wal::open(&dir.path().join("wal.jsonl"), 0).unwrap();

    assert_eq!(wal.append(&pushed(1)).unwrap(), 1);
    assert_eq!(wal.append(&QueueOp::Failed { id: 1 }).unwrap(), 2);
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn appends_are_readable_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&pushed(1)).unwrap();
        wal.append(&pushed(2)).unwrap();
    }

    let mut wal = Wal::open(&path, 0).unwrap();
    let entries = wal.entries_after(0).unwrap();
    assert_eq!(
        entries,
        vec![
            WalEntry { seq: 1, op: pushed(1) },
            WalEntry { seq: 2, op: pushed(2) },
        ]
    );
    assert_eq!(wal.append(&pushed(3)).unwrap(), 3);
}

#[test]
fn records_use_seq_and_op_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();
    wal.append(&QueueOp::Removed { id: 4 }).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "{\"seq\":1,\"op\":{\"type\":\"removed\",\"id\":4}}\n");
    assert_eq!(wal.len(), content.len() as u64);
}

#[test]
fn entries_after_skips_covered_records() {
    let dir = tempdir().unwrap();
    let mut wal = Wal::open(&dir.path().join("wal.jsonl"), 0).unwrap();
    for build in 1..=5 {
        wal.append(&pushed(build)).unwrap();
    }

    let seqs: Vec<u64> = wal.entries_after(3).unwrap().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![4, 5]);
}

#[test]
fn base_seq_continues_numbering_after_truncation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&pushed(1)).unwrap();
        wal.append(&pushed(2)).unwrap();
        wal.truncate_before(3).unwrap();
        assert!(wal.is_empty());
    }

    // Empty log, snapshot covered seq 2
    let mut wal = Wal::open(&path, 2).unwrap();
    assert_eq!(wal.append(&pushed(3)).unwrap(), 3);
}

#[test]
fn truncate_before_keeps_later_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let mut wal = Wal::open(&path, 0).unwrap();
    for build in 1..=4 {
        wal.append(&pushed(build)).unwrap();
    }

    wal.truncate_before(3).unwrap();
    wal.append(&pushed(5)).unwrap();

    let seqs: Vec<u64> = wal.entries_after(0).unwrap().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![3, 4, 5]);
    assert_eq!(wal.len(), std::fs::metadata(&path).unwrap().len());
}

#[test]
fn torn_tail_is_rotated_and_prefix_preserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&pushed(1)).unwrap();
        wal.append(&pushed(2)).unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"seq\":3,\"op\":{\"type\":\"pus").unwrap();
    drop(file);

    let mut wal = Wal::open(&path, 0).unwrap();

    assert_eq!(wal.entries_after(0).unwrap().len(), 2);
    assert!(path.with_extension("bak").exists());
    assert_eq!(wal.append(&pushed(3)).unwrap(), 3);
    assert_eq!(wal.entries_after(0).unwrap().len(), 3);
}

#[test]
fn complete_record_missing_newline_is_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    std::fs::write(
        &path,
        "{\"seq\":1,\"op\":{\"type\":\"removed\",\"id\":9}}",
    )
    .unwrap();

    let mut wal = Wal::open(&path, 0).unwrap();
    wal.append(&QueueOp::Removed { id: 10 }).unwrap();

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(!path.with_extension("bak").exists());
}

#[test]
fn torn_append_is_rolled_back_and_retried() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let writer = FakeWalWriter::new();
    let mut wal = Wal::open_with_writer(&path, 0, writer.clone()).unwrap();
    wal.append(&pushed(1)).unwrap();
    let first_len = wal.len();

    writer.tear_next_writes(PERSIST_ATTEMPTS - 1);
    assert_eq!(wal.append(&pushed(2)).unwrap(), 2);

    assert_eq!(writer.writes(), 1 + PERSIST_ATTEMPTS);
    assert_eq!(writer.rollbacks(), vec![first_len; (PERSIST_ATTEMPTS - 1) as usize]);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert_eq!(wal.len(), content.len() as u64);
    let seqs: Vec<u64> = wal.entries_after(0).unwrap().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
}

#[test]
fn append_gives_up_after_persist_attempts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    let writer = FakeWalWriter::new();
    let mut wal = Wal::open_with_writer(&path, 0, writer.clone()).unwrap();
    wal.append(&pushed(1)).unwrap();
    let before = std::fs::read(&path).unwrap();

    writer.fail_next_syncs(PERSIST_ATTEMPTS);
    let err = wal.append(&pushed(2)).unwrap_err();

    assert!(
        matches!(err, WalError::Persist { attempts, .. } if attempts == PERSIST_ATTEMPTS),
        "got {err:?}"
    );
    assert_eq!(wal.write_seq(), 1);
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(wal.append(&pushed(2)).unwrap(), 2);
}
