// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use clap::ValueEnum;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format an uptime as `1h 2m 3s`, dropping leading zero units.
pub fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Last `n` lines of a file, or all of them when `n` is `None`.
pub fn read_last_lines(path: &Path, n: Option<usize>) -> std::io::Result<Vec<String>> {
    use std::io::{BufRead, BufReader};
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<_>>()?;
    let start = n.map_or(0, |n| lines.len().saturating_sub(n));
    Ok(lines[start..].to_vec())
}

/// Print the tail of a log file in text or JSON format.
pub fn print_log(
    log_path: &Path,
    limit: Option<usize>,
    format: OutputFormat,
    label: &str,
) -> anyhow::Result<()> {
    let lines = if log_path.exists() {
        read_last_lines(log_path, limit)?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Text => {
            if !log_path.exists() {
                println!("No {} found at {}", label, log_path.display());
            } else if lines.is_empty() {
                eprintln!("No entries in {}", label);
            }
            for line in &lines {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "log_path": log_path.to_string_lossy(),
                "lines": lines,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}
