// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote test catalog adapters

mod http;
mod query;

pub use http::{CatalogSettings, HttpCatalogClient};
pub use query::{Condition, EntityQuery};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CatalogCall, FailOn, FakeCatalogClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tsync_core::EntityId;

/// Error code the catalog reports for an entity that already exists.
pub const DUPLICATE_ERROR_CODE: &str = "platform.duplicate_entity_error";

/// HTTP status of a rejected bulk create that collided with existing entities.
pub const CONFLICT_STATUS: u16 = 409;

/// One sub-error of a rejected catalog request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub error_code: String,
    #[serde(default)]
    pub description: String,
}

impl RemoteError {
    pub fn new(error_code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            description: description.into(),
        }
    }

    pub fn duplicate(description: impl Into<String>) -> Self {
        Self::new(DUPLICATE_ERROR_CODE, description)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.description)
    }
}

/// Errors from catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed ({status}): {message}")]
    Request {
        status: u16,
        /// `None` when the response carried no error list
        errors: Option<Vec<RemoteError>>,
        message: String,
    },
    #[error("catalog transport error: {0}")]
    Transport(String),
    #[error("catalog response parse error: {0}")]
    Parse(String),
    #[error("catalog authentication failed: {0}")]
    Auth(String),
}

impl CatalogError {
    /// A conflict whose error list reports nothing but duplicate entities.
    ///
    /// A create that fails this way has already been applied. An empty error
    /// list qualifies; a conflict without an error list does not.
    pub fn is_duplicate_conflict(&self) -> bool {
        match self {
            CatalogError::Request {
                status: CONFLICT_STATUS,
                errors: Some(errors),
                ..
            } => errors.iter().all(|e| e.error_code == DUPLICATE_ERROR_CODE),
            _ => false,
        }
    }

    /// Build a `Request` error from sub-errors, summarizing them as the message.
    pub fn request(status: u16, errors: Vec<RemoteError>) -> Self {
        let message = if errors.is_empty() {
            "no error details".to_string()
        } else {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        };
        CatalogError::Request {
            status,
            errors: Some(errors),
            message,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

/// A catalog entity: its id plus whatever fields were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Id of a reference field (`{"type": ..., "id": ...}`).
    pub fn ref_id(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
    }
}

/// An item of a catalog list (testing tool types, frameworks, test types).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: EntityId,
    pub logical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One page of a catalog query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

impl<T> PagedList<T> {
    pub fn new(data: Vec<T>) -> Self {
        let total_count = Some(data.len() as u64);
        Self { data, total_count }
    }
}

/// Client for the remote test catalog.
///
/// All operations are scoped to a workspace. Bulk bodies use the
/// `{"data": [...]}` envelope.
#[async_trait]
pub trait CatalogClient: Clone + Send + Sync + 'static {
    /// Query entities matching every condition.
    async fn query_entities(
        &self,
        workspace: u64,
        query: &EntityQuery,
    ) -> Result<PagedList<Entity>, CatalogError>;

    /// Create entities in bulk.
    async fn post_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError>;

    /// Update entities in bulk; every element carries its `id`.
    async fn update_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError>;

    /// Update one entity.
    async fn update_entity(
        &self,
        workspace: u64,
        collection: &str,
        id: &EntityId,
        body: &Value,
    ) -> Result<Entity, CatalogError>;

    /// Delete every entity whose id is in `ids`.
    async fn delete_entities(
        &self,
        workspace: u64,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<(), CatalogError>;

    /// Items of the list rooted at `list_root` (a logical name).
    async fn query_list_items(
        &self,
        workspace: u64,
        list_root: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PagedList<ListItem>, CatalogError>;
}

/// Source of a catalog client for one dispatch tick.
///
/// Returns `None` while the catalog is not configured.
pub trait CatalogProvider: Send + Sync + 'static {
    type Client: CatalogClient;

    fn client(&self) -> Option<Self::Client>;
}

/// Provider that always hands out the same client.
#[derive(Clone)]
pub struct StaticCatalog<C>(pub Option<C>);

impl<C: CatalogClient> CatalogProvider for StaticCatalog<C> {
    type Client = C;

    fn client(&self) -> Option<C> {
        self.0.clone()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
