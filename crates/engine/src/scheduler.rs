// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic dispatch ticks

use crate::dispatcher::Dispatcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tsync_adapters::{BuildRegistry, CatalogProvider, DetectionDecoder};

/// Run `tick` every `period` until `shutdown` is notified.
///
/// The first tick runs immediately. Ticks run one after another on the
/// calling task; a tick that overruns the period delays the next one
/// instead of queueing a burst. Shutdown is observed between ticks.
pub async fn run_periodic<F, Fut>(period: Duration, shutdown: Arc<Notify>, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let notified = shutdown.notified();
    tokio::pin!(notified);

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut notified => break,
            _ = interval.tick() => tick().await,
        }
    }
    tracing::debug!("periodic dispatch stopped");
}

/// Spawn the dispatch loop for `dispatcher`.
pub fn spawn_dispatcher<P, R, D>(
    dispatcher: Arc<Dispatcher<P, R, D>>,
    period: Duration,
    shutdown: Arc<Notify>,
) -> JoinHandle<()>
where
    P: CatalogProvider,
    R: BuildRegistry,
    D: DetectionDecoder,
{
    tracing::info!(period_ms = period.as_millis() as u64, "starting dispatch loop");
    tokio::spawn(run_periodic(period, shutdown, move || {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            dispatcher.tick().await;
        }
    }))
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
