// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `ooqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ooqueue",
    version,
    about = "Run a workload of resource-annotated tasks through an out-of-order queue.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workload file (TOML).
    ///
    /// Default: `Workload.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Workload.toml")]
    pub workload: String,

    /// Number of worker threads; overrides `[queue].workers`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OOQUEUE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the dependency plan, but don't run any task.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
