// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build storage on disk.
//!
//! ```text
//! <jobs_root>/<job>/builds/<n>/detection_result.json
//! <jobs_root>/<folder>/jobs/<job>/builds/<n>/detection_result.json
//! ```

use super::{
    BuildHandle, BuildRegistry, DecodeError, DetectionDecoder, ProjectHandle, RegistryError,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tsync_core::DetectionResult;

/// File name of the persisted detection result inside a build directory.
pub const DETECTION_RESULT_FILE: &str = "detection_result.json";

/// Registry and decoder over a CI server's jobs directory.
#[derive(Debug, Clone)]
pub struct FsBuildStore {
    jobs_root: PathBuf,
}

impl FsBuildStore {
    pub fn new(jobs_root: impl Into<PathBuf>) -> Self {
        Self {
            jobs_root: jobs_root.into(),
        }
    }

    pub fn jobs_root(&self) -> &Path {
        &self.jobs_root
    }

    /// Directory of a project, or `None` when the name cannot name one.
    pub fn project_dir(&self, name: &str) -> Option<PathBuf> {
        let mut dir = self.jobs_root.clone();
        for (i, segment) in name.split('/').enumerate() {
            let mut parts = Path::new(segment).components();
            let valid = matches!(
                (parts.next(), parts.next()),
                (Some(Component::Normal(_)), None)
            );
            if !valid {
                return None;
            }
            if i > 0 {
                dir.push("jobs");
            }
            dir.push(segment);
        }
        Some(dir)
    }

    pub fn build_dir(&self, project: &str, number: u32) -> Option<PathBuf> {
        self.project_dir(project)
            .map(|dir| dir.join("builds").join(number.to_string()))
    }

    /// Persist `result` for a build, replacing any previous one atomically.
    pub fn write(&self, build: &BuildHandle, result: &DetectionResult) -> Result<(), DecodeError> {
        std::fs::create_dir_all(&build.dir)?;
        let path = build.dir.join(DETECTION_RESULT_FILE);
        let tmp_path = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, result)
                .map_err(|e| DecodeError::Invalid(e.to_string()))?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| e.into_error())?
                .sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Handle for a build, creating its directory. Used by producers that
    /// store a result before enqueueing it.
    pub fn ensure_build(&self, project: &str, number: u32) -> Result<BuildHandle, DecodeError> {
        let dir = self
            .build_dir(project, number)
            .ok_or_else(|| DecodeError::Invalid(format!("invalid project name {project:?}")))?;
        std::fs::create_dir_all(&dir)?;
        Ok(BuildHandle {
            project: project.to_string(),
            number,
            dir,
        })
    }
}

impl BuildRegistry for FsBuildStore {
    fn project(&self, name: &str) -> Result<Option<ProjectHandle>, RegistryError> {
        let Some(root) = self.project_dir(name) else {
            tracing::warn!(project = name, "project name does not map to a directory");
            return Ok(None);
        };
        if !root.is_dir() {
            return Ok(None);
        }
        Ok(Some(ProjectHandle {
            name: name.to_string(),
            root,
        }))
    }

    fn build(
        &self,
        project: &ProjectHandle,
        number: u32,
    ) -> Result<Option<BuildHandle>, RegistryError> {
        let dir = project.root.join("builds").join(number.to_string());
        if !dir.is_dir() {
            return Ok(None);
        }
        Ok(Some(BuildHandle {
            project: project.name.clone(),
            number,
            dir,
        }))
    }
}

impl DetectionDecoder for FsBuildStore {
    fn read(&self, build: &BuildHandle) -> Result<Option<DetectionResult>, DecodeError> {
        let path = build.dir.join(DETECTION_RESULT_FILE);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let result: DetectionResult = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| DecodeError::Invalid(format!("{}: {e}", path.display())))?;
        result
            .validate()
            .map_err(|e| DecodeError::Invalid(e.to_string()))?;
        Ok(Some(result))
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
