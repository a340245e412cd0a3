// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery results persisted per build

use crate::{AutomatedTest, ScmResourceFile};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Reasons a persisted detection result cannot be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error("workspace id {0:?} is not a positive integer")]
    InvalidWorkspace(String),
    #[error("scm repository id {0:?} is not a positive integer")]
    InvalidScmRepository(String),
}

/// Tests and resource files added, changed or removed by one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub workspace_id: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub scm_repository_id: Option<String>,
    #[serde(default)]
    pub new_tests: Vec<AutomatedTest>,
    #[serde(default)]
    pub updated_tests: Vec<AutomatedTest>,
    #[serde(default)]
    pub deleted_tests: Vec<AutomatedTest>,
    #[serde(default)]
    pub new_scm_resource_files: Vec<ScmResourceFile>,
    #[serde(default)]
    pub deleted_scm_resource_files: Vec<ScmResourceFile>,
}

impl DetectionResult {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            ..Self::default()
        }
    }

    /// Check the identifiers the catalog requests are built from.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if parse_positive(&self.workspace_id).is_none() {
            return Err(DetectionError::InvalidWorkspace(self.workspace_id.clone()));
        }
        if let Some(repo) = &self.scm_repository_id {
            if parse_positive(repo).is_none() {
                return Err(DetectionError::InvalidScmRepository(repo.clone()));
            }
        }
        Ok(())
    }

    /// Numeric workspace id, if valid.
    pub fn workspace(&self) -> Option<u64> {
        parse_positive(&self.workspace_id)
    }

    pub fn is_empty(&self) -> bool {
        self.new_tests.is_empty()
            && self.updated_tests.is_empty()
            && self.deleted_tests.is_empty()
            && self.new_scm_resource_files.is_empty()
            && self.deleted_scm_resource_files.is_empty()
    }
}

fn parse_positive(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// Treat `""` the same as a missing value.
fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
#[path = "detection_tests.rs"]
mod tests;
