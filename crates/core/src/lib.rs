// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tsync-core: domain types shared by the tsync crates

pub mod automated;
pub mod build_ref;
pub mod detection;
pub mod entity;
pub mod id;
pub mod scm;
pub mod wire;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use automated::{AutomatedTest, MoveInfo, UftTestType};
pub use build_ref::BuildRef;
pub use detection::{DetectionError, DetectionResult};
pub use entity::{EntityRef, RefCollection};
pub use id::EntityId;
pub use scm::ScmResourceFile;
