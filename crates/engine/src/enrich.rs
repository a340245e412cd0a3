// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference fields attached to tests before they are created.

use crate::publish::POST_BULK_SIZE;
use std::collections::HashMap;
use tsync_adapters::{CatalogClient, CatalogError, ListItem};
use tsync_core::wire::list_nodes;
use tsync_core::{AutomatedTest, EntityRef, RefCollection, UftTestType};

/// List-node lookups for one workspace, each list fetched at most once.
pub(crate) struct ListNodes<'a, C> {
    client: &'a C,
    workspace: u64,
    lists: HashMap<&'static str, Vec<ListItem>>,
}

impl<'a, C: CatalogClient> ListNodes<'a, C> {
    pub(crate) fn new(client: &'a C, workspace: u64) -> Self {
        Self {
            client,
            workspace,
            lists: HashMap::new(),
        }
    }

    /// Reference to the item named `logical_name` in the list `list_root`.
    pub(crate) async fn resolve(
        &mut self,
        list_root: &'static str,
        logical_name: &str,
    ) -> Result<Option<EntityRef>, CatalogError> {
        if !self.lists.contains_key(list_root) {
            let page = self
                .client
                .query_list_items(self.workspace, list_root, 0, POST_BULK_SIZE as u32)
                .await?;
            self.lists.insert(list_root, page.data);
        }
        let found = self.lists.get(list_root).and_then(|items| {
            items
                .iter()
                .find(|item| item.logical_name == logical_name)
                .map(|item| EntityRef::list_node(item.id.clone()))
        });
        if found.is_none() {
            tracing::warn!(
                workspace = self.workspace,
                list_root,
                logical_name,
                "list node not found in catalog"
            );
        }
        Ok(found)
    }
}

/// Attach testing tool, framework, test type and repository references.
///
/// A test type is looked up only when some test is of that type.
pub(crate) async fn enrich_tests<C: CatalogClient>(
    lists: &mut ListNodes<'_, C>,
    repository: Option<&EntityRef>,
    tests: &mut [AutomatedTest],
) -> Result<(), CatalogError> {
    if tests.is_empty() {
        return Ok(());
    }

    let tool = lists
        .resolve(list_nodes::TESTING_TOOL_TYPE, list_nodes::UFT_TESTING_TOOL)
        .await?;
    let framework = lists
        .resolve(list_nodes::FRAMEWORK, list_nodes::UFT_FRAMEWORK)
        .await?;

    let mut test_types: HashMap<UftTestType, Option<EntityRef>> = HashMap::new();
    for kind in [UftTestType::Gui, UftTestType::Api] {
        if tests.iter().any(|t| t.uft_test_type == kind) {
            let found = lists
                .resolve(list_nodes::TEST_TYPE, kind.logical_name())
                .await?;
            test_types.insert(kind, found);
        }
    }

    for test in tests.iter_mut() {
        test.testing_tool_type = tool.clone();
        test.framework = framework.clone();
        test.test_types = test_types
            .get(&test.uft_test_type)
            .cloned()
            .flatten()
            .map(|r| RefCollection::of([r]));
        test.scm_repository = repository.cloned();
    }
    Ok(())
}

#[cfg(test)]
#[path = "enrich_tests.rs"]
mod tests;
