// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::error::ErrorKind;
use clap::FromArgMatches;
use yare::parameterized;

use super::{is_not_running, DaemonCommand};
use crate::client::ClientError;

fn parse_daemon(args: &[&str]) -> DaemonCommand {
    let matches = crate::cli_command().try_get_matches_from(args).unwrap();
    match crate::Cli::from_arg_matches(&matches).unwrap().command {
        Some(crate::Commands::Daemon(args)) => args.command,
        _ => panic!("expected daemon command"),
    }
}

#[test]
fn start_foreground_parses() {
    assert!(matches!(
        parse_daemon(&["tsync", "daemon", "start", "--foreground"]),
        DaemonCommand::Start { foreground: true }
    ));
}

#[test]
fn logs_default_limit() {
    assert!(matches!(
        parse_daemon(&["tsync", "daemon", "logs"]),
        DaemonCommand::Logs {
            limit: 50,
            no_limit: false
        }
    ));
}

#[test]
fn daemon_requires_subcommand() {
    let err = crate::cli_command()
        .try_get_matches_from(["tsync", "daemon"])
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
    ));
}

#[parameterized(
    not_running = { ClientError::DaemonNotRunning, true },
    refused = { ClientError::Io(std::io::ErrorKind::ConnectionRefused.into()), true },
    missing = { ClientError::Io(std::io::ErrorKind::NotFound.into()), true },
    timeout = { ClientError::Io(std::io::ErrorKind::TimedOut.into()), false },
    rejected = { ClientError::Rejected("no".to_string()), false },
)]
fn not_running_detection(err: ClientError, expected: bool) {
    assert_eq!(is_not_running(&err), expected);
}
