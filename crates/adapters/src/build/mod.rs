// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build registry and detection result access

mod fs;

pub use fs::{FsBuildStore, DETECTION_RESULT_FILE};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBuildStore;

use std::path::PathBuf;
use thiserror::Error;
use tsync_core::{BuildRef, DetectionResult};

/// Errors from build registry lookups
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from reading or writing a detection result
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid detection result: {0}")]
    Invalid(String),
}

impl DecodeError {
    /// The artifact exists but can never be dispatched.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DecodeError::Invalid(_))
    }
}

/// A project known to the build registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHandle {
    pub name: String,
    pub root: PathBuf,
}

/// A build of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildHandle {
    pub project: String,
    pub number: u32,
    pub dir: PathBuf,
}

impl BuildHandle {
    pub fn build_ref(&self) -> BuildRef {
        BuildRef::new(self.project.clone(), self.number)
    }
}

/// Resolves project names and build numbers of the CI server.
pub trait BuildRegistry: Send + Sync + 'static {
    /// Look up a project by its full name (`folder/job`).
    fn project(&self, name: &str) -> Result<Option<ProjectHandle>, RegistryError>;

    /// Look up a build of `project` by number.
    fn build(
        &self,
        project: &ProjectHandle,
        number: u32,
    ) -> Result<Option<BuildHandle>, RegistryError>;
}

/// Reads the detection result persisted with a build.
pub trait DetectionDecoder: Send + Sync + 'static {
    /// `Ok(None)` when the build has no detection result.
    fn read(&self, build: &BuildHandle) -> Result<Option<DetectionResult>, DecodeError>;
}
