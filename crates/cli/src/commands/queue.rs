// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tsync_core::DetectionResult;
use tsync_daemon::QueueEntry;
use tsync_engine::{dispatch_log::dispatch_log_path, MAX_DISPATCH_TRIALS};

use crate::client::DaemonClient;
use crate::output::{print_log, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Queue a finished build for syncing
    Push {
        /// Project name, with folders separated by '/'
        project: String,
        /// Build number
        build: u32,
        /// Detection result to store with the build before queueing
        #[arg(long, value_name = "FILE")]
        result: Option<PathBuf>,
    },
    /// Show queued builds in dispatch order
    List,
    /// View the dispatch activity log
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Show all lines (no limit)
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
}

impl QueueCommand {
    /// Whether the command changes daemon state (and may start it).
    pub fn is_action(&self) -> bool {
        matches!(self, QueueCommand::Push { .. })
    }
}

pub async fn handle(
    command: QueueCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        QueueCommand::Push {
            project,
            build,
            result,
        } => {
            let result = result.as_deref().map(load_result).transpose()?;
            let (id, queue_size) = client.enqueue(&project, build, result).await?;
            match format {
                OutputFormat::Text => {
                    println!("Queued {}#{} (id {}, {} in queue)", project, build, id, queue_size)
                }
                OutputFormat::Json => {
                    let obj = serde_json::json!({
                        "id": id,
                        "project": project,
                        "build": build,
                        "queue_size": queue_size,
                    });
                    println!("{}", serde_json::to_string_pretty(&obj)?);
                }
            }
        }
        QueueCommand::List => {
            let status = client.status().await?;
            match format {
                OutputFormat::Text => {
                    if status.items.is_empty() {
                        println!("Queue is empty");
                        return Ok(());
                    }
                    let mut out = std::io::stdout();
                    queue_table(&status.items).render(&mut out);
                }
                OutputFormat::Json => {
                    let obj = serde_json::json!({ "items": status.items });
                    println!("{}", serde_json::to_string_pretty(&obj)?);
                }
            }
        }
        QueueCommand::Logs { limit, no_limit } => {
            let path = dispatch_log_path(&crate::env::state_dir()?.join("logs"));
            print_log(&path, (!no_limit).then_some(limit), format, "dispatch log")?;
        }
    }
    Ok(())
}

/// Read a detection result file as written by the detection step.
pub(crate) fn load_result(path: &Path) -> Result<DetectionResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let result: DetectionResult = serde_json::from_str(&text)
        .with_context(|| format!("invalid detection result in {}", path.display()))?;
    result
        .validate()
        .with_context(|| format!("unusable detection result in {}", path.display()))?;
    Ok(result)
}

/// Label for an item: untried builds are pending, failed ones show progress
/// toward abandonment.
pub(crate) fn item_status(fail_count: u32) -> String {
    if fail_count == 0 {
        "pending".to_string()
    } else {
        format!("retrying {}/{}", fail_count, MAX_DISPATCH_TRIALS)
    }
}

pub(crate) fn queue_table(items: &[QueueEntry]) -> Table {
    let mut table = Table::new(vec![
        Column::muted("ID"),
        Column::left("PROJECT").with_max(40),
        Column::right("BUILD"),
        Column::status("STATUS"),
    ]);
    for item in items {
        table.row(vec![
            item.id.to_string(),
            item.project.clone(),
            item.build.to_string(),
            item_status(item.fail_count),
        ]);
    }
    table
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
