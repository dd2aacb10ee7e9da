//! # adminauth CLI
//!
//! `adminauth-check` audits the admin API and session secrets before a
//! deployment is exposed, and offers small helpers for operators.
//!
//! ## Usage
//!
//! ```bash
//! # Preflight check; exits 1 when any secret is missing, weak or a placeholder
//! adminauth-check
//!
//! # Machine-readable report
//! adminauth-check check --format json
//!
//! # Fresh secrets for TOKEN_SECRET and JWT_SECRET
//! adminauth-check generate-secret -n 2
//!
//! # Connection token for a gateway consumer
//! adminauth-check connection-token --key my-consumer --secret "$CONSUMER_SECRET"
//!
//! # Check a token against TOKEN_SECRET
//! adminauth-check verify eyJhbGciOiJIUzUxMiJ9...
//! ```

pub mod cli;
pub mod commands;
pub mod output;

use std::io::{self, IsTerminal};

use clap::Parser;

pub use cli::{Cli, Commands, OutputFormat};
pub use output::Formatter;

/// Run the CLI application and return the process exit code.
///
/// # Errors
///
/// Returns an error when configuration cannot be loaded or a command fails
/// outright; audit failures are reported through the exit code.
pub fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    cli.init_tracing();

    let settings = commands::load_settings(cli.config.as_deref())?;
    let colored = !cli.no_color && io::stdout().is_terminal();
    let formatter = Formatter::new(cli.format, colored);

    let mut out = io::stdout().lock();
    commands::execute(cli.command(), &settings, &formatter, &mut out)
}
