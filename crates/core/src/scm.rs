// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SCM resource files tracked alongside tests

use crate::EntityRef;
use serde::{Deserialize, Serialize};

/// A non-test file (e.g. a shared data table) belonging to an SCM repository.
///
/// Remote identity is `(relative_path, scm_repository)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScmResourceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm_repository: Option<EntityRef>,
}

impl ScmResourceFile {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            ..Self::default()
        }
    }

    /// Display name: the explicit name, or the last path segment.
    pub fn display_name(&self) -> &str {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name;
        }
        self.relative_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.relative_path)
    }
}
