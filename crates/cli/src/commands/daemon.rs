// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tsync daemon` - Daemon management commands

use std::process::Command;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::{ClientError, DaemonClient, DaemonStatus};
use crate::daemon_control::{ensure_running, stop as stop_daemon};
use crate::daemon_files::{daemon_binary, DaemonFiles};
use crate::output::{format_uptime, print_log, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon after its current dispatch
    Stop,
    /// Stop and restart the daemon
    Restart,
    /// Check daemon status
    Status,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Show all lines (no limit)
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Restart => restart().await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit, no_limit } => {
            let log_path = DaemonFiles::locate()?.log();
            print_log(&log_path, (!no_limit).then_some(limit), format, "daemon log")
        }
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let status = Command::new(daemon_binary()).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok(status) = client.status().await {
            println!(
                "Daemon already running (uptime: {})",
                format_uptime(status.uptime_secs)
            );
            return Ok(());
        }
    }

    ensure_running(&DaemonFiles::locate()?).map_err(|e| anyhow!("{}", e))?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    match stop_daemon(&DaemonFiles::locate()?).await {
        Ok(true) => println!("Daemon stopped"),
        Ok(false) => println!("Daemon not running"),
        Err(e) => return Err(anyhow!("Failed to stop daemon: {}", e)),
    }
    Ok(())
}

async fn restart() -> Result<()> {
    let files = DaemonFiles::locate()?;
    let was_running = stop_daemon(&files)
        .await
        .map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;

    if was_running {
        // Grace period for the OS to release the socket
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    ensure_running(&files).map_err(|e| anyhow!("{}", e))?;
    println!("Daemon restarted");
    Ok(())
}

/// Whether an error means nothing is listening on the socket.
fn is_not_running(err: &ClientError) -> bool {
    match err {
        ClientError::DaemonNotRunning => true,
        ClientError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
        ),
        _ => false,
    }
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || -> Result<()> {
        match format {
            OutputFormat::Text => println!("Status: {}", crate::color::status("not running")),
            OutputFormat::Json => println!(r#"{{ "status": "not_running" }}"#),
        }
        Ok(())
    };

    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(),
    };

    let status = match client.status().await {
        Ok(status) => status,
        Err(e) if is_not_running(&e) => return not_running(),
        Err(e) => return Err(anyhow!("{}", e)),
    };
    let version = client
        .hello()
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    print_status(&status, &version, format)
}

fn print_status(status: &DaemonStatus, version: &str, format: OutputFormat) -> Result<()> {
    let retrying = status.items.iter().filter(|i| i.fail_count > 0).count();
    match format {
        OutputFormat::Text => {
            println!("Status: {}", crate::color::status("running"));
            println!("Version: {}", version);
            println!("Uptime: {}", format_uptime(status.uptime_secs));
            println!("Queue: {} build(s)", status.queue_size);
            if let Some(head) = status.items.first() {
                println!("Next: {}#{}", head.project, head.build);
            }
            if retrying > 0 {
                println!(
                    "{}",
                    crate::color::status(&format!("retrying: {} build(s) failed to sync", retrying))
                );
                println!("  Run `tsync queue logs` for details");
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "status": "running",
                "version": version,
                "uptime_secs": status.uptime_secs,
                "uptime": format_uptime(status.uptime_secs),
                "queue_size": status.queue_size,
                "retrying": retrying,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
