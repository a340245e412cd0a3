// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tsync dispatch engine

pub mod dispatch_log;
mod dispatcher;
mod enrich;
pub mod env;
mod error;
pub mod log_rotation;
pub mod publish;
pub mod scheduler;

pub use dispatch_log::DispatchLog;
pub use dispatcher::{Attempt, Dispatcher, SkipReason, TickReport, MAX_DISPATCH_TRIALS};
pub use error::DispatchError;
pub use publish::{publish, PublishReport, Publisher, Step, StepOutcome, POST_BULK_SIZE};
pub use scheduler::{run_periodic, spawn_dispatcher};
