//! Log subscriber setup for the binary

use anyhow::{anyhow, Context, Result};
use std::env;
use std::io;
use tracing_subscriber::EnvFilter;

/// Filter directives taken from here win over `-v`
pub const LOG_ENV_VAR: &str = "GRIDTEST_LOG";

/// Level for a `-v` count
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(verbosity: u8) -> Result<EnvFilter> {
    match env::var(LOG_ENV_VAR) {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(&spec)
            .with_context(|| format!("Invalid {LOG_ENV_VAR} filter: {spec}")),
        _ => Ok(EnvFilter::new(default_level(verbosity))),
    }
}

/// Install the global subscriber. Logs go to stderr; stdout belongs to the
/// text reporter.
pub fn init(verbosity: u8) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity)?)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!("Failed to install log subscriber: {err}"))
}
