// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draining the discovery queue into the catalog.
//!
//! Each tick works through the queue head first. An item leaves the queue
//! when it was delivered, when it can never be delivered (its project, build
//! or detection result is gone), or when it has failed more than
//! [`MAX_DISPATCH_TRIALS`] times. Any other failure ends the tick with the
//! item still at the head.

use crate::dispatch_log::DispatchLog;
use crate::error::DispatchError;
use crate::publish::publish;
use std::fmt;
use std::sync::Arc;
use tsync_adapters::{BuildRegistry, CatalogProvider, DetectionDecoder};
use tsync_core::BuildRef;
use tsync_storage::{DiscoveryQueue, QueueError, QueueItem};

/// Failed attempts after which an item is abandoned.
pub const MAX_DISPATCH_TRIALS: u32 = 5;

/// Why an item was dropped without contacting the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ProjectMissing,
    BuildMissing,
    ResultMissing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::ProjectMissing => "project no longer exists",
            SkipReason::BuildMissing => "build no longer exists",
            SkipReason::ResultMissing => "detection result missing or invalid",
        })
    }
}

/// Outcome of one attempt to dispatch the queue head.
#[derive(Debug)]
pub enum Attempt {
    Delivered,
    Skipped(SkipReason),
    Retry(DispatchError),
}

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: usize,
    pub skipped: usize,
    pub retried: usize,
    pub abandoned: usize,
}

/// Moves queued builds to the catalog.
pub struct Dispatcher<P, R, D> {
    queue: Arc<DiscoveryQueue>,
    catalogs: P,
    registry: R,
    decoder: D,
    activity: Option<DispatchLog>,
}

impl<P, R, D> Dispatcher<P, R, D>
where
    P: CatalogProvider,
    R: BuildRegistry,
    D: DetectionDecoder,
{
    pub fn new(queue: Arc<DiscoveryQueue>, catalogs: P, registry: R, decoder: D) -> Self {
        Self {
            queue,
            catalogs,
            registry,
            decoder,
            activity: None,
        }
    }

    /// Also record every outcome in `log`.
    pub fn with_activity_log(mut self, log: DispatchLog) -> Self {
        self.activity = Some(log);
        self
    }

    pub fn queue(&self) -> &Arc<DiscoveryQueue> {
        &self.queue
    }

    /// Queue a finished build for dispatch.
    ///
    /// Returns once the item is durable. This blocks on the WAL fsync, so
    /// async callers run it on the blocking pool.
    pub fn enqueue_result(&self, project: &str, build: u32) -> Result<QueueItem, QueueError> {
        let item = self.queue.add(project, build)?;
        tracing::info!(
            build = %item.build_ref(),
            id = item.id,
            queue_size = self.queue.size(),
            "queued build for dispatch"
        );
        self.log(&item.build_ref(), "queued");
        Ok(item)
    }

    /// Drain the queue until it is empty or an item has to be retried.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        if self.queue.is_empty() {
            return report;
        }

        let Some(client) = self.catalogs.client() else {
            tracing::warn!(
                queue_size = self.queue.size(),
                "catalog not configured, not dispatching"
            );
            return report;
        };

        while let Some(item) = self.queue.peek_first() {
            let build = item.build_ref();
            let attempt = self.attempt(&client, &build).await;
            if let Err(e) = self.settle(&item, attempt, &mut report).await {
                tracing::error!(build = %build, error = %e, "failed to update discovery queue");
                break;
            }
            if report.retried > 0 || report.abandoned > 0 {
                break;
            }
        }

        if report != TickReport::default() {
            tracing::info!(
                delivered = report.delivered,
                skipped = report.skipped,
                retried = report.retried,
                abandoned = report.abandoned,
                remaining = self.queue.size(),
                "dispatch tick finished"
            );
        }
        report
    }

    /// Try to deliver one build.
    pub async fn attempt(&self, client: &P::Client, build: &BuildRef) -> Attempt {
        let project = match self.registry.project(&build.project_name) {
            Ok(Some(project)) => project,
            Ok(None) => return Attempt::Skipped(SkipReason::ProjectMissing),
            Err(e) => return Attempt::Retry(e.into()),
        };
        let handle = match self.registry.build(&project, build.build_number) {
            Ok(Some(handle)) => handle,
            Ok(None) => return Attempt::Skipped(SkipReason::BuildMissing),
            Err(e) => return Attempt::Retry(e.into()),
        };
        let result = match self.decoder.read(&handle) {
            Ok(Some(result)) => result,
            Ok(None) => return Attempt::Skipped(SkipReason::ResultMissing),
            Err(e) if e.is_permanent() => {
                tracing::warn!(build = %build, error = %e, "unreadable detection result");
                return Attempt::Skipped(SkipReason::ResultMissing);
            }
            Err(e) => return Attempt::Retry(e.into()),
        };
        let workspace = match (result.validate(), result.workspace()) {
            (Ok(()), Some(workspace)) => workspace,
            (Err(e), _) => {
                tracing::warn!(build = %build, error = %e, "invalid detection result");
                return Attempt::Skipped(SkipReason::ResultMissing);
            }
            (Ok(()), None) => return Attempt::Skipped(SkipReason::ResultMissing),
        };

        let report = publish(client, build, workspace, &result).await;
        match report.into_error() {
            None => Attempt::Delivered,
            Some(e) => Attempt::Retry(e),
        }
    }

    /// Apply an attempt's outcome to the queue head.
    async fn settle(
        &self,
        item: &QueueItem,
        attempt: Attempt,
        report: &mut TickReport,
    ) -> Result<(), QueueError> {
        let build = item.build_ref();
        match attempt {
            Attempt::Delivered => {
                self.on_queue(|queue| queue.remove()).await?;
                report.delivered += 1;
                tracing::info!(build = %build, "build delivered to catalog");
                self.log(&build, "delivered");
            }
            Attempt::Skipped(reason) => {
                self.on_queue(|queue| queue.remove()).await?;
                report.skipped += 1;
                tracing::warn!(build = %build, %reason, "dropping queued build");
                self.log(&build, &format!("skipped: {reason}"));
            }
            Attempt::Retry(error) => {
                let Some(count) = self.on_queue(|queue| queue.record_failure()).await? else {
                    return Ok(());
                };
                if count > MAX_DISPATCH_TRIALS {
                    self.on_queue(|queue| queue.remove()).await?;
                    report.abandoned += 1;
                    tracing::warn!(
                        build = %build,
                        attempts = count,
                        error = %error,
                        "giving up on build, it will not be dispatched"
                    );
                    self.log(&build, &format!("abandoned after {count} attempts: {error}"));
                } else {
                    report.retried += 1;
                    tracing::warn!(
                        build = %build,
                        attempt = count,
                        max = MAX_DISPATCH_TRIALS,
                        error = %error,
                        "dispatch failed, will retry"
                    );
                    self.log(
                        &build,
                        &format!("retry {count}/{MAX_DISPATCH_TRIALS}: {error}"),
                    );
                }
            }
        }
        Ok(())
    }

    /// Run a queue write on the blocking pool.
    ///
    /// WAL appends fsync and sleep between attempts.
    async fn on_queue<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        F: FnOnce(&DiscoveryQueue) -> Result<T, QueueError> + Send + 'static,
        T: Send + 'static,
    {
        let queue = Arc::clone(&self.queue);
        tokio::task::spawn_blocking(move || op(&queue))
            .await
            .map_err(|e| QueueError::Io(std::io::Error::other(e)))?
    }

    fn log(&self, build: &BuildRef, message: &str) {
        if let Some(activity) = &self.activity {
            activity.append(build, message);
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
