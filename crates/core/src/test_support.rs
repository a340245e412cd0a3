// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{AutomatedTest, DetectionResult, ScmResourceFile, UftTestType};

pub const TEST_WORKSPACE: &str = "1002";
pub const TEST_SCM_REPOSITORY: &str = "5";

/// `count` executable GUI tests named `test-0..count` in package `pkg`.
pub fn gui_tests(pkg: &str, count: usize) -> Vec<AutomatedTest> {
    (0..count)
        .map(|i| AutomatedTest::new(format!("test-{i}"), pkg))
        .collect()
}

pub fn api_test(name: &str, pkg: &str) -> AutomatedTest {
    let mut test = AutomatedTest::new(name, pkg);
    test.uft_test_type = UftTestType::Api;
    test
}

pub fn resource_files(paths: &[&str]) -> Vec<ScmResourceFile> {
    paths.iter().map(|p| ScmResourceFile::new(*p)).collect()
}

/// Empty result for the test workspace and repository.
pub fn detection_result() -> DetectionResult {
    let mut result = DetectionResult::new(TEST_WORKSPACE);
    result.scm_repository_id = Some(TEST_SCM_REPOSITORY.to_string());
    result
}

/// Result with `count` new GUI tests.
pub fn result_with_new_tests(count: usize) -> DetectionResult {
    let mut result = detection_result();
    result.new_tests = gui_tests("pkg", count);
    result
}
