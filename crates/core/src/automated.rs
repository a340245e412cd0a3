// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automated tests discovered in a build workspace

use crate::{EntityId, EntityRef, RefCollection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of UFT test, selects the remote test type list node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UftTestType {
    #[default]
    Gui,
    Api,
}

impl UftTestType {
    /// Logical name of the test type list node in the catalog.
    pub fn logical_name(self) -> &'static str {
        match self {
            UftTestType::Gui => "list_node.test_type.gui",
            UftTestType::Api => "list_node.test_type.api",
        }
    }
}

/// Rename/move information recorded by the detection scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveInfo {
    pub old_name: Option<String>,
    pub old_package: Option<String>,
    pub change_set_src: Option<String>,
    pub change_set_dst: Option<String>,
    #[serde(default)]
    pub is_moved: bool,
}

/// An automated test as persisted by the detection scan.
///
/// Remote identity is the `(name, package)` pair; `id` and the reference
/// fields are only filled in while the test is being sent to the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub uft_test_type: UftTestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm_repository: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testing_tool_type: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_types: Option<RefCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_info: Option<MoveInfo>,
}

impl AutomatedTest {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            executable: true,
            ..Self::default()
        }
    }

    pub fn is_moved(&self) -> bool {
        self.move_info.as_ref().is_some_and(|m| m.is_moved)
    }
}

impl fmt::Display for AutomatedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#{} - {}@{}", id, self.package, self.name),
            None => write!(f, "#0 - {}@{}", self.package, self.name),
        }
    }
}
