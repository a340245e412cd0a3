// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog wire format.
//!
//! Local field names are mapped to catalog field names by the serde
//! attributes on the payload types below. The mapping tables document the
//! renames and are checked against the serialized output in tests.
//! `None` fields are never sent.

use crate::{AutomatedTest, EntityId, EntityRef, RefCollection, ScmResourceFile};
use serde::Serialize;
use serde_json::Value;

/// Catalog collection and field names for automated tests.
pub mod automated_tests {
    pub const COLLECTION: &str = "tests";
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const PACKAGE: &str = "package";
    pub const EXECUTABLE: &str = "executable";
    pub const DESCRIPTION: &str = "description";
    pub const SUBTYPE: &str = "subtype";
    pub const SCM_REPOSITORY: &str = "scm_repository";
    pub const TESTING_TOOL_TYPE: &str = "testing_tool_type";
    pub const FRAMEWORK: &str = "framework";
    pub const TEST_TYPE: &str = "test_type";
    pub const AUTOMATED_SUBTYPE: &str = "test_automated";
}

/// Catalog collection and field names for SCM resource files.
pub mod scm_resources {
    pub const COLLECTION: &str = "scm_resource_files";
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const RELATIVE_PATH: &str = "relative_path";
    pub const SCM_REPOSITORY: &str = "scm_repository";
}

/// Catalog list nodes and the logical names this crate looks up.
pub mod list_nodes {
    pub const COLLECTION: &str = "list_nodes";
    pub const TESTING_TOOL_TYPE: &str = "list_node.testing_tool_type";
    pub const UFT_TESTING_TOOL: &str = "list_node.testing_tool_type.uft";
    pub const FRAMEWORK: &str = "list_node.je.framework";
    pub const UFT_FRAMEWORK: &str = "list_node.je.framework.uft";
    pub const TEST_TYPE: &str = "list_node.test_type";
}

/// Local to wire field names of [`AutomatedTest`] that differ.
pub const TEST_FIELD_MAP: &[(&str, &str)] = &[
    ("scm_repository", automated_tests::SCM_REPOSITORY),
    ("testing_tool_type", automated_tests::TESTING_TOOL_TYPE),
    ("test_types", automated_tests::TEST_TYPE),
];

/// Local to wire field names of [`ScmResourceFile`] that differ.
pub const SCM_RESOURCE_FIELD_MAP: &[(&str, &str)] = &[
    ("relative_path", scm_resources::RELATIVE_PATH),
    ("scm_repository", scm_resources::SCM_REPOSITORY),
];

/// Create payload for one automated test.
#[derive(Debug, Serialize)]
pub struct TestCreate<'a> {
    pub subtype: &'static str,
    pub name: &'a str,
    pub package: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub executable: bool,
    #[serde(rename = "scm_repository", skip_serializing_if = "Option::is_none")]
    pub scm_repository: Option<&'a EntityRef>,
    #[serde(rename = "testing_tool_type", skip_serializing_if = "Option::is_none")]
    pub testing_tool_type: Option<&'a EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<&'a EntityRef>,
    #[serde(rename = "test_type", skip_serializing_if = "Option::is_none")]
    pub test_types: Option<&'a RefCollection>,
}

impl<'a> From<&'a AutomatedTest> for TestCreate<'a> {
    fn from(test: &'a AutomatedTest) -> Self {
        Self {
            subtype: automated_tests::AUTOMATED_SUBTYPE,
            name: &test.name,
            package: &test.package,
            description: test.description.as_deref(),
            executable: test.executable,
            scm_repository: test.scm_repository.as_ref(),
            testing_tool_type: test.testing_tool_type.as_ref(),
            framework: test.framework.as_ref(),
            test_types: test.test_types.as_ref(),
        }
    }
}

/// Partial update of an existing test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestUpdate {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub executable: bool,
}

impl TestUpdate {
    /// Update carrying the local test's description and executable flag.
    pub fn from_local(id: EntityId, test: &AutomatedTest) -> Self {
        Self {
            id,
            description: test.description.clone(),
            executable: test.executable,
        }
    }

    /// Soft delete: only flips `executable` off.
    pub fn deactivate(id: EntityId) -> Self {
        Self {
            id,
            description: None,
            executable: false,
        }
    }
}

/// Create payload for one SCM resource file.
#[derive(Debug, Serialize)]
pub struct ScmResourceCreate<'a> {
    pub name: &'a str,
    #[serde(rename = "relative_path")]
    pub relative_path: &'a str,
    #[serde(rename = "scm_repository", skip_serializing_if = "Option::is_none")]
    pub scm_repository: Option<&'a EntityRef>,
}

impl<'a> From<&'a ScmResourceFile> for ScmResourceCreate<'a> {
    fn from(file: &'a ScmResourceFile) -> Self {
        Self {
            name: file.display_name(),
            relative_path: &file.relative_path,
            scm_repository: file.scm_repository.as_ref(),
        }
    }
}

#[derive(Serialize)]
struct Envelope<T> {
    data: Vec<T>,
}

/// Wrap entities in the `{"data": [...]}` envelope used by bulk endpoints.
pub fn envelope<T: Serialize>(
    items: impl IntoIterator<Item = T>,
) -> Result<Value, serde_json::Error> {
    serde_json::to_value(Envelope {
        data: items.into_iter().collect::<Vec<_>>(),
    })
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
