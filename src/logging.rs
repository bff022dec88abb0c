// src/logging.rs

//! `tracing` subscriber for the `ooqueue` binary.
//!
//! The filter comes from the first of:
//! 1. `--log-level`, applied to every target;
//! 2. `OOQUEUE_LOG`, parsed as `EnvFilter` directives
//!    (`warn,ooqueue::engine=debug`);
//! 3. `info`.
//!
//! Output goes to stderr so the run report on stdout stays clean.

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "OOQUEUE_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_directives = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(cli_level, env_directives.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    if let Some(bad) = rejected {
        warn!(directives = %bad, "ignoring invalid {LOG_ENV}; using '{DEFAULT_DIRECTIVE}'");
    }
    Ok(())
}

/// Pick the filter. The second value is the env directive string when it
/// failed to parse.
fn build_filter(
    cli_level: Option<LogLevel>,
    env_directives: Option<&str>,
) -> (EnvFilter, Option<String>) {
    if let Some(level) = cli_level {
        return (EnvFilter::new(directive(level)), None);
    }
    match env_directives.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match EnvFilter::try_new(raw) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(raw.to_string())),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVE), None),
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
