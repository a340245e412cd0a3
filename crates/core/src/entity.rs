// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! References to remote catalog entities

use crate::EntityId;
use serde::{Deserialize, Serialize};

/// Entity type of list items (testing tool type, framework, test type).
pub const LIST_NODE: &str = "list_node";

/// Entity type of SCM repositories.
pub const SCM_REPOSITORY: &str = "scm_repository";

/// A typed reference to a remote entity: `{"type": "...", "id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn list_node(id: impl Into<EntityId>) -> Self {
        Self::new(LIST_NODE, id)
    }

    pub fn scm_repository(id: impl Into<EntityId>) -> Self {
        Self::new(SCM_REPOSITORY, id)
    }
}

/// A multi-valued reference field: `{"data": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCollection {
    pub data: Vec<EntityRef>,
}

impl RefCollection {
    pub fn of(refs: impl IntoIterator<Item = EntityRef>) -> Self {
        Self {
            data: refs.into_iter().collect(),
        }
    }
}
