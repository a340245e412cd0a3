// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the catalog and the CI server's build storage

pub mod build;
pub mod catalog;
pub mod traced;

pub use build::{
    BuildHandle, BuildRegistry, DecodeError, DetectionDecoder, FsBuildStore, ProjectHandle,
    RegistryError,
};
pub use catalog::{
    CatalogClient, CatalogError, CatalogProvider, CatalogSettings, Condition, Entity,
    EntityQuery, HttpCatalogClient, ListItem, PagedList, RemoteError, StaticCatalog,
};
pub use traced::TracedCatalog;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use build::FakeBuildStore;
#[cfg(any(test, feature = "test-support"))]
pub use catalog::{CatalogCall, FailOn, FakeCatalogClient};
