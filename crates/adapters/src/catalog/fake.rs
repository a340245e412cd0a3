// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory catalog for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    CatalogClient, CatalogError, Condition, Entity, EntityQuery, ListItem, PagedList, RemoteError,
    CONFLICT_STATUS,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tsync_core::wire::{automated_tests, list_nodes, scm_resources};
use tsync_core::EntityId;

/// Recorded catalog call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    Query {
        workspace: u64,
        collection: String,
        query: Option<String>,
    },
    Post {
        workspace: u64,
        collection: String,
        count: usize,
    },
    UpdateMany {
        workspace: u64,
        collection: String,
        count: usize,
    },
    UpdateOne {
        workspace: u64,
        collection: String,
        id: EntityId,
    },
    Delete {
        workspace: u64,
        collection: String,
        ids: Vec<EntityId>,
    },
    ListItems {
        workspace: u64,
        list_root: String,
    },
}

/// Operation kinds that accept injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    Query,
    Post,
    UpdateMany,
    UpdateOne,
    Delete,
    ListItems,
}

#[derive(Default)]
struct FakeCatalogState {
    collections: HashMap<(u64, String), Vec<Entity>>,
    list_items: HashMap<String, Vec<ListItem>>,
    failures: HashMap<FailOn, VecDeque<CatalogError>>,
    calls: Vec<CatalogCall>,
    next_id: u64,
}

/// In-memory catalog with duplicate detection, error injection and call
/// recording.
#[derive(Clone)]
pub struct FakeCatalogClient {
    inner: Arc<Mutex<FakeCatalogState>>,
}

impl Default for FakeCatalogClient {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeCatalogState {
                next_id: 1000,
                ..FakeCatalogState::default()
            })),
        }
    }
}

impl FakeCatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the UFT testing tool, framework and GUI/API test types.
    pub fn with_uft_lists() -> Self {
        let fake = Self::new();
        fake.set_list_items(
            list_nodes::TESTING_TOOL_TYPE,
            vec![
                list_item("1", "list_node.testing_tool_type.manual"),
                list_item("2", list_nodes::UFT_TESTING_TOOL),
            ],
        );
        fake.set_list_items(
            list_nodes::FRAMEWORK,
            vec![list_item("3", list_nodes::UFT_FRAMEWORK)],
        );
        fake.set_list_items(
            list_nodes::TEST_TYPE,
            vec![
                list_item("4", "list_node.test_type.gui"),
                list_item("5", "list_node.test_type.api"),
            ],
        );
        fake
    }

    pub fn set_list_items(&self, list_root: &str, items: Vec<ListItem>) {
        self.inner
            .lock()
            .list_items
            .insert(list_root.to_string(), items);
    }

    /// Store an entity directly, bypassing call recording.
    pub fn insert(&self, workspace: u64, collection: &str, entity: Entity) {
        self.inner
            .lock()
            .collections
            .entry((workspace, collection.to_string()))
            .or_default()
            .push(entity);
    }

    pub fn entities(&self, workspace: u64, collection: &str) -> Vec<Entity> {
        self.inner
            .lock()
            .collections
            .get(&(workspace, collection.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Fail the next call of kind `on` with `error`. Failures queue up.
    pub fn fail_next(&self, on: FailOn, error: CatalogError) {
        self.inner
            .lock()
            .failures
            .entry(on)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Sizes of the bulk creates sent to `collection`, in order.
    pub fn post_sizes(&self, collection: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CatalogCall::Post {
                    collection: c,
                    count,
                    ..
                } if c == collection => Some(count),
                _ => None,
            })
            .collect()
    }
}

fn list_item(id: &str, logical_name: &str) -> ListItem {
    ListItem {
        id: EntityId::new(id),
        logical_name: logical_name.to_string(),
        name: None,
    }
}

impl FakeCatalogState {
    fn take_failure(&mut self, on: FailOn) -> Result<(), CatalogError> {
        match self.failures.get_mut(&on).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn collection(&mut self, workspace: u64, collection: &str) -> &mut Vec<Entity> {
        self.collections
            .entry((workspace, collection.to_string()))
            .or_default()
    }
}

fn matches(entity: &Entity, condition: &Condition) -> bool {
    match condition {
        Condition::Equals { field, value } => entity.str_field(field) == Some(value.as_str()),
        Condition::RefersTo { field, id } => entity.ref_id(field) == Some(id.as_str()),
        Condition::RefersToLogicalName {
            field,
            logical_name,
        } => entity
            .fields
            .get(field)
            .and_then(|v| v.get("logical_name"))
            .and_then(Value::as_str)
            == Some(logical_name.as_str()),
        Condition::IdIn(ids) => ids.contains(&entity.id),
    }
}

/// Natural key used to detect duplicate creates.
fn identity(collection: &str, entity: &Entity) -> Option<String> {
    if collection == automated_tests::COLLECTION {
        Some(format!(
            "{}|{}",
            entity.str_field(automated_tests::NAME)?,
            entity.str_field(automated_tests::PACKAGE)?
        ))
    } else if collection == scm_resources::COLLECTION {
        Some(format!(
            "{}|{}",
            entity.str_field(scm_resources::RELATIVE_PATH)?,
            entity.ref_id(scm_resources::SCM_REPOSITORY).unwrap_or_default()
        ))
    } else {
        None
    }
}

fn body_items(body: &Value) -> Result<Vec<serde_json::Map<String, Value>>, CatalogError> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::Parse("body has no data array".to_string()))?;
    data.iter()
        .map(|item| {
            item.as_object()
                .cloned()
                .ok_or_else(|| CatalogError::Parse("data element is not an object".to_string()))
        })
        .collect()
}

fn not_found(id: &str) -> CatalogError {
    CatalogError::request(
        404,
        vec![RemoteError::new(
            "platform.entity_not_found",
            format!("entity {id} not found"),
        )],
    )
}

fn apply_update(
    entities: &mut [Entity],
    mut fields: serde_json::Map<String, Value>,
    id: &str,
) -> Result<Entity, CatalogError> {
    fields.remove("id");
    let entity = entities
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| not_found(id))?;
    entity.fields.extend(fields);
    Ok(entity.clone())
}

#[async_trait]
impl CatalogClient for FakeCatalogClient {
    async fn query_entities(
        &self,
        workspace: u64,
        query: &EntityQuery,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::Query {
            workspace,
            collection: query.collection.clone(),
            query: query.render(),
        });
        inner.take_failure(FailOn::Query)?;

        let matching: Vec<Entity> = inner
            .collection(workspace, &query.collection)
            .iter()
            .filter(|e| query.conditions.iter().all(|c| matches(e, c)))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.map_or(usize::MAX, |l| l as usize))
            .collect();
        Ok(PagedList {
            data,
            total_count: Some(total),
        })
    }

    async fn post_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let items = body_items(body)?;
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::Post {
            workspace,
            collection: collection.to_string(),
            count: items.len(),
        });
        inner.take_failure(FailOn::Post)?;

        let mut created = Vec::new();
        let mut duplicates = Vec::new();
        for mut fields in items {
            fields.remove("id");
            inner.next_id += 1;
            let entity = Entity {
                id: EntityId::new(inner.next_id.to_string()),
                fields,
            };
            let key = identity(collection, &entity);
            let existing = inner.collection(workspace, collection);
            if key.is_some() && existing.iter().any(|e| identity(collection, e) == key) {
                duplicates.push(RemoteError::duplicate(format!(
                    "duplicate {}",
                    key.unwrap_or_default()
                )));
                continue;
            }
            existing.push(entity.clone());
            created.push(entity);
        }

        if !duplicates.is_empty() {
            return Err(CatalogError::request(CONFLICT_STATUS, duplicates));
        }
        Ok(PagedList::new(created))
    }

    async fn update_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let items = body_items(body)?;
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::UpdateMany {
            workspace,
            collection: collection.to_string(),
            count: items.len(),
        });
        inner.take_failure(FailOn::UpdateMany)?;

        let entities = inner.collection(workspace, collection);
        let mut updated = Vec::new();
        for fields in items {
            let id = fields
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| CatalogError::Parse("update element has no id".to_string()))?
                .to_string();
            updated.push(apply_update(entities, fields, &id)?);
        }
        Ok(PagedList::new(updated))
    }

    async fn update_entity(
        &self,
        workspace: u64,
        collection: &str,
        id: &EntityId,
        body: &Value,
    ) -> Result<Entity, CatalogError> {
        let fields = body
            .as_object()
            .cloned()
            .ok_or_else(|| CatalogError::Parse("body is not an object".to_string()))?;
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::UpdateOne {
            workspace,
            collection: collection.to_string(),
            id: id.clone(),
        });
        inner.take_failure(FailOn::UpdateOne)?;

        apply_update(inner.collection(workspace, collection), fields, id.as_str())
    }

    async fn delete_entities(
        &self,
        workspace: u64,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<(), CatalogError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::Delete {
            workspace,
            collection: collection.to_string(),
            ids: ids.to_vec(),
        });
        inner.take_failure(FailOn::Delete)?;

        inner
            .collection(workspace, collection)
            .retain(|e| !ids.contains(&e.id));
        Ok(())
    }

    async fn query_list_items(
        &self,
        workspace: u64,
        list_root: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PagedList<ListItem>, CatalogError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::ListItems {
            workspace,
            list_root: list_root.to_string(),
        });
        inner.take_failure(FailOn::ListItems)?;

        let items = inner.list_items.get(list_root).cloned().unwrap_or_default();
        let total = items.len() as u64;
        Ok(PagedList {
            data: items
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            total_count: Some(total),
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
