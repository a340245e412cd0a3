// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::catalog::{CatalogClient, CatalogError, Entity, EntityQuery, ListItem, PagedList};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::Instrument;
use tsync_core::EntityId;

fn batch_size(body: &Value) -> usize {
    body.get("data")
        .and_then(Value::as_array)
        .map_or(1, Vec::len)
}

fn log_outcome<T>(result: &Result<T, CatalogError>, start: Instant, done: &str) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::info!(elapsed_ms, "{done}"),
        Err(e) if e.is_duplicate_conflict() => {
            tracing::info!(elapsed_ms, "entities already exist")
        }
        Err(e) => tracing::warn!(elapsed_ms, error = %e, "catalog request failed"),
    }
}

/// Wrapper that adds tracing to any CatalogClient
#[derive(Clone)]
pub struct TracedCatalog<C> {
    inner: C,
}

impl<C> TracedCatalog<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CatalogClient> CatalogClient for TracedCatalog<C> {
    async fn query_entities(
        &self,
        workspace: u64,
        query: &EntityQuery,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let start = Instant::now();
        let result = self.inner.query_entities(workspace, query).await;
        tracing::debug_span!("catalog.query", workspace, collection = %query.collection)
            .in_scope(|| match &result {
                Ok(page) => tracing::debug!(
                    matches = page.data.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "queried"
                ),
                Err(e) => tracing::warn!(error = %e, "query failed"),
            });
        result
    }

    async fn post_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let count = batch_size(body);
        async {
            tracing::debug!(count, "posting");
            let start = Instant::now();
            let result = self.inner.post_entities(workspace, collection, body).await;
            log_outcome(&result, start, "entities created");
            result
        }
        .instrument(tracing::info_span!("catalog.post", workspace, collection, count))
        .await
    }

    async fn update_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let count = batch_size(body);
        async {
            let start = Instant::now();
            let result = self.inner.update_entities(workspace, collection, body).await;
            log_outcome(&result, start, "entities updated");
            result
        }
        .instrument(tracing::info_span!("catalog.update", workspace, collection, count))
        .await
    }

    async fn update_entity(
        &self,
        workspace: u64,
        collection: &str,
        id: &EntityId,
        body: &Value,
    ) -> Result<Entity, CatalogError> {
        async {
            let start = Instant::now();
            let result = self
                .inner
                .update_entity(workspace, collection, id, body)
                .await;
            log_outcome(&result, start, "entity updated");
            result
        }
        .instrument(tracing::info_span!("catalog.update", workspace, collection, id = %id))
        .await
    }

    async fn delete_entities(
        &self,
        workspace: u64,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<(), CatalogError> {
        async {
            let start = Instant::now();
            let result = self.inner.delete_entities(workspace, collection, ids).await;
            log_outcome(&result, start, "entities deleted");
            result
        }
        .instrument(tracing::info_span!(
            "catalog.delete",
            workspace,
            collection,
            count = ids.len()
        ))
        .await
    }

    async fn query_list_items(
        &self,
        workspace: u64,
        list_root: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PagedList<ListItem>, CatalogError> {
        let result = self
            .inner
            .query_list_items(workspace, list_root, offset, limit)
            .await;
        if let Err(ref e) = result {
            tracing::warn!(workspace, list_root, error = %e, "list item lookup failed");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
