// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for dispatching

use thiserror::Error;
use tsync_adapters::{CatalogError, DecodeError, RegistryError};
use tsync_storage::QueueError;

/// Errors that make a dispatch attempt retryable
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("build registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("detection result error: {0}")]
    Decode(#[from] DecodeError),
    #[error("payload encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{failed} of {total} batches failed, last error: {last}")]
    Batches {
        failed: usize,
        total: usize,
        last: CatalogError,
    },
    #[error("publish incomplete, failed steps: {0}")]
    Incomplete(String),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}
