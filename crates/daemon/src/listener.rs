// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handling
//! each one on its own task. Producers enqueue builds here while the
//! dispatch loop drains the same queue.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use tsync_adapters::{BuildRegistry, CatalogProvider, DecodeError, DetectionDecoder, FsBuildStore};
use tsync_core::DetectionResult;
use tsync_engine::Dispatcher;

use crate::protocol::{self, QueueEntry, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Shared state for request handlers.
pub struct ListenCtx<P, R, D> {
    pub dispatcher: Arc<Dispatcher<P, R, D>>,
    /// Where results sent with `Enqueue` are stored
    pub builds: FsBuildStore,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Listener task for accepting socket connections.
pub struct Listener<P, R, D> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<P, R, D>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<P, R, D> Listener<P, R, D>
where
    P: CatalogProvider,
    R: BuildRegistry,
    D: DetectionDecoder,
{
    pub fn new(socket: UnixListener, ctx: ListenCtx<P, R, D>) -> Self {
        Self {
            socket,
            ctx: Arc::new(ctx),
        }
    }

    /// Run the listener loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<P, R, D>(
    stream: UnixStream,
    ctx: &ListenCtx<P, R, D>,
) -> Result<(), ConnectionError>
where
    P: CatalogProvider,
    R: BuildRegistry,
    D: DetectionDecoder,
{
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    if matches!(request, Request::Status | Request::Ping) {
        debug!(request = ?request, "received request");
    } else {
        info!(request = %summarize(&request), "received request");
    }

    let response = handle_request(request, ctx).await;
    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Requests can carry whole detection results; log only their identity.
fn summarize(request: &Request) -> String {
    match request {
        Request::Enqueue {
            project,
            build,
            result,
        } => format!(
            "Enqueue {project}#{build}{}",
            if result.is_some() { " with result" } else { "" }
        ),
        other => format!("{other:?}"),
    }
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request<P, R, D>(
    request: Request,
    ctx: &ListenCtx<P, R, D>,
) -> Response
where
    P: CatalogProvider,
    R: BuildRegistry,
    D: DetectionDecoder,
{
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, daemon = PROTOCOL_VERSION, "client version differs");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }

        Request::Enqueue {
            project,
            build,
            result,
        } => {
            let dispatcher = Arc::clone(&ctx.dispatcher);
            let builds = ctx.builds.clone();
            // Storing the result and appending to the queue both fsync
            let task = tokio::task::spawn_blocking(move || {
                handle_enqueue(&dispatcher, &builds, &project, build, result.as_deref())
            });
            match task.await {
                Ok(response) => response,
                Err(e) => Response::Error {
                    message: format!("enqueue task failed: {e}"),
                },
            }
        }

        Request::Status => {
            let queue = ctx.dispatcher.queue();
            let items: Vec<QueueEntry> = queue.items().iter().map(QueueEntry::from).collect();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                queue_size: items.len(),
                items,
            }
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

fn handle_enqueue<P, R, D>(
    dispatcher: &Dispatcher<P, R, D>,
    builds: &FsBuildStore,
    project: &str,
    build: u32,
    result: Option<&DetectionResult>,
) -> Response
where
    P: CatalogProvider,
    R: BuildRegistry,
    D: DetectionDecoder,
{
    if let Some(result) = result {
        if let Err(e) = store_result(builds, project, build, result) {
            return Response::Error {
                message: format!("cannot store detection result for {project}#{build}: {e}"),
            };
        }
    }

    match dispatcher.enqueue_result(project, build) {
        Ok(item) => Response::Enqueued {
            id: item.id,
            queue_size: dispatcher.queue().size(),
        },
        Err(e) => Response::Error {
            message: format!("failed to queue {project}#{build}: {e}"),
        },
    }
}

fn store_result(
    builds: &FsBuildStore,
    project: &str,
    build: u32,
    result: &DetectionResult,
) -> Result<(), DecodeError> {
    result
        .validate()
        .map_err(|e| DecodeError::Invalid(e.to_string()))?;
    let handle = builds.ensure_build(project, build)?;
    builds.write(&handle, result)
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
