//! Tracing subscriber setup.
//!
//! The filter comes from `FORMATION_LOG` when set, otherwise `info` (or
//! `debug` with `--verbose`). Logs go to stderr so the progress spinner on
//! stdout stays intact.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "FORMATION_LOG";

pub fn build_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init_logging(verbose: bool) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}
