// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publishing one detection result to the catalog.
//!
//! Five independent steps run in order, each skipped when it has no input:
//!
//! 1. create new tests
//! 2. update changed tests (or create them when the catalog has no match)
//! 3. deactivate deleted tests
//! 4. create new SCM resource files
//! 5. delete removed SCM resource files
//!
//! Every step is safe to repeat: creates tolerate duplicates, and updates
//! and deletes look up the remote entity first.

use crate::enrich::{enrich_tests, ListNodes};
use crate::error::DispatchError;
use std::fmt;
use tsync_adapters::{CatalogClient, CatalogError, Condition, EntityQuery};
use tsync_core::wire::{
    self, automated_tests, scm_resources, ScmResourceCreate, TestCreate, TestUpdate,
};
use tsync_core::{
    AutomatedTest, BuildRef, DetectionResult, EntityId, EntityRef, ScmResourceFile,
};

/// Maximum entities per bulk request.
pub const POST_BULK_SIZE: usize = 100;

/// A publish step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    NewTests,
    UpdatedTests,
    DeletedTests,
    NewScmResources,
    DeletedScmResources,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::NewTests => "new tests",
            Step::UpdatedTests => "updated tests",
            Step::DeletedTests => "deleted tests",
            Step::NewScmResources => "new scm resources",
            Step::DeletedScmResources => "deleted scm resources",
        })
    }
}

/// Result of one publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to send
    Skipped,
    /// Entities created, updated or deleted by the step
    Applied(usize),
    Failed(String),
}

/// Outcome of every step of one publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub steps: Vec<(Step, StepOutcome)>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failed_steps().is_empty()
    }

    pub fn failed_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .filter(|(_, outcome)| matches!(outcome, StepOutcome::Failed(_)))
            .map(|(step, _)| *step)
            .collect()
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }

    fn record(
        &mut self,
        build: &BuildRef,
        step: Step,
        result: Option<Result<usize, DispatchError>>,
    ) {
        let outcome = match result {
            None => StepOutcome::Skipped,
            Some(Ok(applied)) => {
                tracing::info!(%build, %step, applied, "publish step succeeded");
                StepOutcome::Applied(applied)
            }
            Some(Err(e)) => {
                tracing::warn!(%build, %step, error = %e, "publish step failed");
                StepOutcome::Failed(e.to_string())
            }
        };
        self.steps.push((step, outcome));
    }

    /// Error describing the failed steps, if any.
    pub fn into_error(self) -> Option<DispatchError> {
        let failed: Vec<String> = self
            .steps
            .into_iter()
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Failed(error) => Some(format!("{step} ({error})")),
                _ => None,
            })
            .collect();
        (!failed.is_empty()).then(|| DispatchError::Incomplete(failed.join(", ")))
    }
}

/// Sends one detection result to one workspace.
pub struct Publisher<'a, C> {
    client: &'a C,
    workspace: u64,
    build: &'a BuildRef,
    repository: Option<EntityRef>,
    lists: ListNodes<'a, C>,
}

impl<'a, C: CatalogClient> Publisher<'a, C> {
    pub fn new(
        client: &'a C,
        workspace: u64,
        build: &'a BuildRef,
        repository_id: Option<&str>,
    ) -> Self {
        Self {
            client,
            workspace,
            build,
            repository: repository_id.map(EntityRef::scm_repository),
            lists: ListNodes::new(client, workspace),
        }
    }

    /// Run every step and report each outcome.
    pub async fn publish(mut self, result: &DetectionResult) -> PublishReport {
        let mut report = PublishReport::default();

        let outcome = if result.new_tests.is_empty() {
            None
        } else {
            Some(self.post_new_tests(result.new_tests.clone()).await)
        };
        report.record(self.build, Step::NewTests, outcome);

        let outcome = if result.updated_tests.is_empty() {
            None
        } else {
            Some(self.update_tests(&result.updated_tests).await)
        };
        report.record(self.build, Step::UpdatedTests, outcome);

        let outcome = if result.deleted_tests.is_empty() {
            None
        } else {
            Some(self.deactivate_tests(&result.deleted_tests).await)
        };
        report.record(self.build, Step::DeletedTests, outcome);

        let outcome = if result.new_scm_resource_files.is_empty() {
            None
        } else {
            Some(self.post_scm_resources(&result.new_scm_resource_files).await)
        };
        report.record(self.build, Step::NewScmResources, outcome);

        let outcome = if result.deleted_scm_resource_files.is_empty() {
            None
        } else {
            Some(self.delete_scm_resources(&result.deleted_scm_resource_files).await)
        };
        report.record(self.build, Step::DeletedScmResources, outcome);

        report
    }

    /// Create tests in batches; duplicates count as created.
    async fn post_new_tests(
        &mut self,
        mut tests: Vec<AutomatedTest>,
    ) -> Result<usize, DispatchError> {
        enrich_tests(&mut self.lists, self.repository.as_ref(), &mut tests).await?;
        let payloads = tests
            .chunks(POST_BULK_SIZE)
            .map(|chunk| wire::envelope(chunk.iter().map(TestCreate::from)))
            .collect::<Result<Vec<_>, _>>()?;
        self.post_batches(automated_tests::COLLECTION, payloads).await
    }

    async fn post_batches(
        &self,
        collection: &str,
        payloads: Vec<serde_json::Value>,
    ) -> Result<usize, DispatchError> {
        let total = payloads.len();
        let mut failed = 0;
        let mut last_error = None;
        let mut posted = 0;

        for (index, body) in payloads.iter().enumerate() {
            let size = body
                .get("data")
                .and_then(serde_json::Value::as_array)
                .map_or(0, Vec::len);
            match self.client.post_entities(self.workspace, collection, body).await {
                Ok(_) => posted += size,
                Err(e) if e.is_duplicate_conflict() => {
                    tracing::info!(
                        build = %self.build,
                        collection,
                        batch = index,
                        "batch already present in catalog"
                    );
                    posted += size;
                }
                Err(e) => {
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(DispatchError::Batches {
                failed,
                total,
                last,
            }),
            None => Ok(posted),
        }
    }

    /// Remote id of the single test with this name and package.
    async fn find_test(&self, test: &AutomatedTest) -> Result<Option<EntityId>, CatalogError> {
        let query = EntityQuery::new(automated_tests::COLLECTION)
            .filter(Condition::eq(automated_tests::NAME, test.name.as_str()))
            .filter(Condition::eq(automated_tests::PACKAGE, test.package.as_str()))
            .fields(&[
                automated_tests::ID,
                automated_tests::NAME,
                automated_tests::PACKAGE,
            ]);
        let page = self.client.query_entities(self.workspace, &query).await?;
        Ok(single_match(page.data.into_iter().map(|e| e.id), || {
            tracing::warn!(test = %test, "several catalog tests match, skipping");
        }))
    }

    async fn update_tests(&mut self, tests: &[AutomatedTest]) -> Result<usize, DispatchError> {
        let mut updates = Vec::new();
        let mut missing = Vec::new();
        for test in tests {
            match self.find_test(test).await? {
                Some(id) => updates.push(TestUpdate::from_local(id, test)),
                None if test.executable => missing.push(test.clone()),
                None => {}
            }
        }

        let created = if missing.is_empty() {
            Ok(0)
        } else {
            tracing::info!(
                build = %self.build,
                count = missing.len(),
                "updated tests not found in catalog, creating them"
            );
            self.post_new_tests(missing).await
        };
        let updated = self.send_updates(updates).await;
        Ok(created? + updated?)
    }

    async fn deactivate_tests(&self, tests: &[AutomatedTest]) -> Result<usize, DispatchError> {
        let mut updates = Vec::new();
        for test in tests {
            if let Some(id) = self.find_test(test).await? {
                updates.push(TestUpdate::deactivate(id));
            }
        }
        self.send_updates(updates).await
    }

    /// Send updates in batches; a batch of one uses the single-entity endpoint.
    async fn send_updates(&self, updates: Vec<TestUpdate>) -> Result<usize, DispatchError> {
        let total = updates.len().div_ceil(POST_BULK_SIZE);
        let mut failed = 0;
        let mut last_error = None;
        let mut applied = 0;

        for chunk in updates.chunks(POST_BULK_SIZE) {
            let result = match chunk {
                [single] => {
                    let body = serde_json::to_value(single)?;
                    self.client
                        .update_entity(
                            self.workspace,
                            automated_tests::COLLECTION,
                            &single.id,
                            &body,
                        )
                        .await
                        .map(|_| ())
                }
                _ => {
                    let body = wire::envelope(chunk)?;
                    self.client
                        .update_entities(self.workspace, automated_tests::COLLECTION, &body)
                        .await
                        .map(|_| ())
                }
            };
            match result {
                Ok(()) => applied += chunk.len(),
                Err(e) => {
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(DispatchError::Batches {
                failed,
                total,
                last,
            }),
            None => Ok(applied),
        }
    }

    async fn post_scm_resources(
        &self,
        files: &[ScmResourceFile],
    ) -> Result<usize, DispatchError> {
        let files: Vec<ScmResourceFile> = files
            .iter()
            .cloned()
            .map(|mut file| {
                file.scm_repository = self.repository.clone();
                file
            })
            .collect();
        let payloads = files
            .chunks(POST_BULK_SIZE)
            .map(|chunk| wire::envelope(chunk.iter().map(ScmResourceCreate::from)))
            .collect::<Result<Vec<_>, _>>()?;
        self.post_batches(scm_resources::COLLECTION, payloads).await
    }

    async fn delete_scm_resources(
        &self,
        files: &[ScmResourceFile],
    ) -> Result<usize, DispatchError> {
        let Some(repository) = self.repository.clone() else {
            tracing::warn!(
                build = %self.build,
                count = files.len(),
                "no scm repository in detection result, not deleting scm resources"
            );
            return Ok(0);
        };

        let mut ids = Vec::new();
        for file in files {
            let query = EntityQuery::new(scm_resources::COLLECTION)
                .filter(Condition::eq(
                    scm_resources::RELATIVE_PATH,
                    file.relative_path.as_str(),
                ))
                .filter(Condition::refers_to(
                    scm_resources::SCM_REPOSITORY,
                    repository.id.as_str(),
                ))
                .fields(&[scm_resources::ID]);
            let page = self.client.query_entities(self.workspace, &query).await?;
            let found = single_match(page.data.into_iter().map(|e| e.id), || {
                tracing::warn!(
                    path = %file.relative_path,
                    "several scm resources match, skipping"
                );
            });
            ids.extend(found);
        }

        if ids.is_empty() {
            return Ok(0);
        }
        self.client
            .delete_entities(self.workspace, scm_resources::COLLECTION, &ids)
            .await?;
        Ok(ids.len())
    }
}

/// The only element, or `None` for zero or several (calling `on_many`).
fn single_match<T>(mut items: impl Iterator<Item = T>, on_many: impl FnOnce()) -> Option<T> {
    let first = items.next()?;
    if items.next().is_some() {
        on_many();
        return None;
    }
    Some(first)
}

/// Publish `result` for `build` to `workspace`.
pub async fn publish<C: CatalogClient>(
    client: &C,
    build: &BuildRef,
    workspace: u64,
    result: &DetectionResult,
) -> PublishReport {
    Publisher::new(client, workspace, build, result.scm_repository_id.as_deref())
        .publish(result)
        .await
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
