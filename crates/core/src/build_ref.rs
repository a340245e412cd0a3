// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference to a CI build

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(project, build)` pair on the CI server.
///
/// Project names may be nested with `/` (folders), e.g. `team/nightly`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildRef {
    pub project_name: String,
    pub build_number: u32,
}

impl BuildRef {
    pub fn new(project_name: impl Into<String>, build_number: u32) -> Self {
        Self {
            project_name: project_name.into(),
            build_number,
        }
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.project_name, self.build_number)
    }
}

#[cfg(test)]
#[path = "build_ref_tests.rs"]
mod tests;
