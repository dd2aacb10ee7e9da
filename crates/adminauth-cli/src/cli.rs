//! CLI argument parsing and configuration types

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::Level;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "adminauth-check",
    version,
    about = "Preflight security checks and token helpers for the admin API",
    long_about = "Audits the admin API and session secrets before a deployment is exposed.\n\
                  Exits with status 1 when any check fails, so it can gate a start script.\n\n\
                  SECURITY WARNINGS:\n\
                  - Suggested secrets are printed to stdout; do not run this where output is logged\n\
                  - Secrets passed with --secret may be visible in the process list"
)]
pub struct Cli {
    /// Subcommand to run (defaults to `check`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional settings file, layered under the environment
    #[arg(long, short = 'c', global = true, env = "ADMINAUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq, Default)]
pub enum Commands {
    /// Audit the configured secrets and environment mode
    #[default]
    Check,

    /// Print freshly generated secrets
    GenerateSecret {
        /// Number of secrets to print
        #[arg(long, short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=32))]
        count: u8,
    },

    /// Issue a short-lived gateway connection token
    ConnectionToken {
        /// Gateway consumer key, carried as `iss`
        #[arg(long)]
        key: String,

        /// Gateway consumer secret used to sign the token
        #[arg(long, env = "ADMINAUTH_CONNECTION_SECRET", hide_env_values = true)]
        secret: String,

        /// Connection identifier, used only for logging
        #[arg(long, default_value = "cli")]
        id: String,
    },

    /// Verify a token against the configured admin API secret
    Verify {
        /// Compact token to verify
        token: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable with colors
    #[default]
    Human,
    /// JSON output
    Json,
}

impl Cli {
    /// Subcommand to run, `check` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Log level derived from `-v` occurrences
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Initialize the tracing subscriber; logs go to stderr so stdout stays parseable
    pub fn init_tracing(&self) {
        tracing_subscriber::fmt()
            .with_max_level(self.log_level())
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
