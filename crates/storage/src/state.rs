// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized queue state from WAL replay

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tsync_core::BuildRef;

/// Reference to a build whose discovery results are still to be sent.
///
/// `id` is the WAL sequence number of the record that pushed the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: u64,
    pub project_name: String,
    pub build_number: u32,
    #[serde(default)]
    pub fail_count: u32,
}

impl QueueItem {
    pub fn build_ref(&self) -> BuildRef {
        BuildRef::new(self.project_name.clone(), self.build_number)
    }
}

/// A durable queue mutation, one per WAL record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueOp {
    Pushed {
        project_name: String,
        build_number: u32,
    },
    Removed {
        id: u64,
    },
    Failed {
        id: u64,
    },
}

/// FIFO of pending queue items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    items: VecDeque<QueueItem>,
}

impl QueueState {
    /// Apply the record with sequence `seq`.
    ///
    /// Replaying a record that is already reflected in the state is a no-op.
    pub fn apply(&mut self, seq: u64, op: &QueueOp) {
        match op {
            QueueOp::Pushed {
                project_name,
                build_number,
            } => {
                if self.items.iter().any(|item| item.id == seq) {
                    return;
                }
                self.items.push_back(QueueItem {
                    id: seq,
                    project_name: project_name.clone(),
                    build_number: *build_number,
                    fail_count: 0,
                });
            }
            QueueOp::Removed { id } => {
                self.items.retain(|item| item.id != *id);
            }
            QueueOp::Failed { id } => {
                if let Some(item) = self.items.iter_mut().find(|item| item.id == *id) {
                    item.fail_count += 1;
                }
            }
        }
    }

    pub fn head(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
