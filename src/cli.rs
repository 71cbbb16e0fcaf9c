//! Command line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (run, check, status, demo)
//! and the global flags (--deadline-ms, --verbose).

use clap::{Parser, Subcommand, ValueEnum};

use crate::backend::Tier;

/// Formation: run one generation job from admission to a single outcome.
#[derive(Debug, Parser)]
#[command(name = "formation", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the job deadline in milliseconds.
    #[arg(long, global = true)]
    pub deadline_ms: Option<u64>,

    /// Enable verbose (debug) logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Tier accepted on the command line, mapped to [`Tier`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TierArg {
    /// Single artifact.
    Basic,
    /// Four artifacts.
    Pro,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Basic => Tier::Basic,
            TierArg::Pro => Tier::Pro,
        }
    }
}

/// Canned scenarios for `formation demo`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Scenario {
    /// Primary synthesis succeeds.
    Success,
    /// Primary fails and the degraded producer takes over.
    Fallback,
    /// Producers are slower than the deadline.
    Timeout,
    /// The request trips the doctrine check.
    Rejected,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a formation request and wait for its outcome.
    Run {
        /// Free-text subject of the formation.
        subject: String,

        /// Style selector passed to the producers.
        #[arg(long, default_value = "classic")]
        style: String,

        #[arg(long, value_enum, default_value = "basic")]
        tier: TierArg,
    },

    /// Run only the doctrine check against a text.
    Check {
        text: String,
    },

    /// Show whether a formation is marked as in flight.
    Status,

    /// Run a built-in scenario against the simulated backend.
    Demo {
        #[arg(long, value_enum, default_value = "fallback")]
        scenario: Scenario,
    },
}
