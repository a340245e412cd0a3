// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory build registry and decoder for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    BuildHandle, BuildRegistry, DecodeError, DetectionDecoder, ProjectHandle, RegistryError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tsync_core::DetectionResult;

#[derive(Debug, Clone)]
enum Artifact {
    Missing,
    Invalid(String),
    Result(Box<DetectionResult>),
}

#[derive(Default)]
struct FakeBuildState {
    projects: HashMap<String, HashMap<u32, Artifact>>,
    fail_reads: bool,
    reads: Vec<(String, u32)>,
}

/// Fake CI server: projects, builds and their detection results.
#[derive(Clone, Default)]
pub struct FakeBuildStore {
    inner: Arc<Mutex<FakeBuildState>>,
}

impl FakeBuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, name: &str) {
        self.inner
            .lock()
            .projects
            .entry(name.to_string())
            .or_default();
    }

    fn set(&self, project: &str, number: u32, artifact: Artifact) {
        self.inner
            .lock()
            .projects
            .entry(project.to_string())
            .or_default()
            .insert(number, artifact);
    }

    /// A build with a stored detection result.
    pub fn add_build(&self, project: &str, number: u32, result: DetectionResult) {
        self.set(project, number, Artifact::Result(Box::new(result)));
    }

    /// A build without a detection result.
    pub fn add_empty_build(&self, project: &str, number: u32) {
        self.set(project, number, Artifact::Missing);
    }

    /// A build whose detection result cannot be decoded.
    pub fn add_invalid_build(&self, project: &str, number: u32, reason: &str) {
        self.set(project, number, Artifact::Invalid(reason.to_string()));
    }

    /// Make every read fail with an IO error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Builds whose results were read, in order.
    pub fn reads(&self) -> Vec<(String, u32)> {
        self.inner.lock().reads.clone()
    }
}

fn fake_dir(project: &str, number: u32) -> PathBuf {
    PathBuf::from("/fake/jobs")
        .join(project)
        .join("builds")
        .join(number.to_string())
}

impl BuildRegistry for FakeBuildStore {
    fn project(&self, name: &str) -> Result<Option<ProjectHandle>, RegistryError> {
        let inner = self.inner.lock();
        Ok(inner.projects.contains_key(name).then(|| ProjectHandle {
            name: name.to_string(),
            root: PathBuf::from("/fake/jobs").join(name),
        }))
    }

    fn build(
        &self,
        project: &ProjectHandle,
        number: u32,
    ) -> Result<Option<BuildHandle>, RegistryError> {
        let inner = self.inner.lock();
        let exists = inner
            .projects
            .get(&project.name)
            .is_some_and(|builds| builds.contains_key(&number));
        Ok(exists.then(|| BuildHandle {
            project: project.name.clone(),
            number,
            dir: fake_dir(&project.name, number),
        }))
    }
}

impl DetectionDecoder for FakeBuildStore {
    fn read(&self, build: &BuildHandle) -> Result<Option<DetectionResult>, DecodeError> {
        let mut inner = self.inner.lock();
        inner.reads.push((build.project.clone(), build.number));
        if inner.fail_reads {
            return Err(DecodeError::Io(std::io::Error::other("injected read failure")));
        }
        match inner
            .projects
            .get(&build.project)
            .and_then(|builds| builds.get(&build.number))
        {
            None | Some(Artifact::Missing) => Ok(None),
            Some(Artifact::Invalid(reason)) => Err(DecodeError::Invalid(reason.clone())),
            Some(Artifact::Result(result)) => Ok(Some((**result).clone())),
        }
    }
}
