// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::FromArgMatches;
use yare::parameterized;

use super::{cli_command, format_error, Cli, Commands};
use crate::commands::queue::QueueCommand;
use crate::output::OutputFormat;

fn parse(args: &[&str]) -> Cli {
    let matches = cli_command().try_get_matches_from(args).unwrap();
    Cli::from_arg_matches(&matches).unwrap()
}

#[parameterized(
    short = { "-V" },
    long = { "--version" },
)]
fn version_flag(flag: &str) {
    let err = cli_command()
        .try_get_matches_from(["tsync", flag])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn no_subcommand_parses() {
    assert!(parse(&["tsync"]).command.is_none());
}

#[test]
fn push_parses_project_build_and_result() {
    let cli = parse(&[
        "tsync",
        "queue",
        "push",
        "folder/uft",
        "42",
        "--result",
        "out/detection_result.json",
    ]);

    let Some(Commands::Queue(args)) = cli.command else {
        panic!("expected queue command");
    };
    assert!(args.command.is_action());
    let QueueCommand::Push {
        project,
        build,
        result,
    } = args.command
    else {
        panic!("expected push");
    };
    assert_eq!(project, "folder/uft");
    assert_eq!(build, 42);
    assert_eq!(result, Some(PathBuf::from("out/detection_result.json")));
}

#[parameterized(
    word = { "latest" },
    too_large = { "4294967296" },
)]
fn push_rejects_bad_build_number(build: &str) {
    let err = cli_command()
        .try_get_matches_from(["tsync", "queue", "push", "uft", build])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn list_is_a_query() {
    let cli = parse(&["tsync", "queue", "list"]);
    let Some(Commands::Queue(args)) = cli.command else {
        panic!("expected queue command");
    };
    assert!(!args.command.is_action());
}

#[test]
fn output_flag_is_global() {
    let cli = parse(&["tsync", "queue", "list", "-o", "json"]);
    assert_eq!(cli.output, OutputFormat::Json);
}

#[test]
fn logs_limit_conflicts_with_no_limit() {
    let err = cli_command()
        .try_get_matches_from(["tsync", "queue", "logs", "-n", "5", "--no-limit"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[derive(Debug, thiserror::Error)]
#[error("read failed")]
struct Inner;

#[derive(Debug, thiserror::Error)]
#[error("storage error: {0}")]
struct Wrapping(#[from] Inner);

#[test]
fn redundant_error_chain_is_collapsed() {
    let err = anyhow::Error::new(Wrapping(Inner));
    assert_eq!(format_error(&err), "storage error: read failed");
}

#[test]
fn informative_error_chain_is_rendered() {
    let err = anyhow::Error::new(Inner).context("failed to read result.json");
    assert_eq!(
        format_error(&err),
        "failed to read result.json\n\nCaused by:\n    0: read failed"
    );
}
