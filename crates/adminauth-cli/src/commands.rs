//! Command execution

use std::io::Write;
use std::path::Path;

use adminauth::audit::generate_secret;
use adminauth::issuer::issue_connection_token;
use adminauth::{
    ConfigLookup, GatewayConnection, Secret, SecretProvider, SecurityAuditor, TokenVerifier,
    TrustDomain,
};
use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::Commands;
use crate::output::Formatter;

/// Build the configuration surface: an optional settings file overlaid by the environment.
///
/// # Errors
///
/// Returns an error if the settings file is missing or cannot be parsed.
pub fn load_settings(path: Option<&Path>) -> Result<config::Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        debug!(path = %path.display(), "loading settings file");
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder
        .add_source(config::Environment::default())
        .build()
        .with_context(|| match path {
            Some(path) => format!("failed to load settings from {}", path.display()),
            None => "failed to read configuration from the environment".to_string(),
        })
}

/// Execute `command` and return the process exit code.
///
/// # Errors
///
/// Returns an error for configuration problems (for `verify`), signing
/// failures or output failures. Audit failures and rejected tokens are
/// reported through the exit code instead.
pub fn execute<L, W>(
    command: Commands,
    settings: &L,
    formatter: &Formatter,
    out: &mut W,
) -> Result<i32>
where
    L: ConfigLookup + ?Sized,
    W: Write,
{
    match command {
        Commands::Check => check(settings, formatter, out),
        Commands::GenerateSecret { count } => generate(count, formatter, out),
        Commands::ConnectionToken { key, secret, id } => {
            connection_token(&id, key, secret, formatter, out)
        }
        Commands::Verify { token } => verify(&token, settings, formatter, out),
    }
}

/// Run the security audit.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn check<L, W>(settings: &L, formatter: &Formatter, out: &mut W) -> Result<i32>
where
    L: ConfigLookup + ?Sized,
    W: Write,
{
    let report = SecurityAuditor::default().run(settings);
    formatter.display_report(out, &report)?;
    Ok(report.exit_code())
}

/// Print `count` fresh secrets.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn generate<W: Write>(count: u8, formatter: &Formatter, out: &mut W) -> Result<i32> {
    let secrets: Vec<String> = (0..count).map(|_| generate_secret()).collect();
    formatter.display_secrets(out, &secrets)?;
    Ok(0)
}

/// Issue a connection token for manual testing against a gateway.
///
/// # Errors
///
/// Returns an error if the secret is empty or signing fails.
pub fn connection_token<W: Write>(
    id: &str,
    key: String,
    secret: String,
    formatter: &Formatter,
    out: &mut W,
) -> Result<i32> {
    let secret = Secret::new(secret).context("connection secret must not be empty")?;
    let connection = GatewayConnection::new(id, key, secret);
    let token = issue_connection_token(&connection).context("failed to sign connection token")?;
    formatter.display_token(out, token.as_str())?;
    Ok(0)
}

/// Verify `token` against the configured admin API secret; exit code 1 unless valid.
///
/// # Errors
///
/// Returns an error if a required secret is not configured.
pub fn verify<L, W>(token: &str, settings: &L, formatter: &Formatter, out: &mut W) -> Result<i32>
where
    L: ConfigLookup + ?Sized,
    W: Write,
{
    let provider = SecretProvider::from_lookup(settings).context("configuration error")?;
    let outcome = TokenVerifier::default().verify(token, provider.resolve(TrustDomain::AdminApi));
    info!(outcome = outcome.label(), "verification finished");
    formatter.display_outcome(out, &outcome)?;
    Ok(if outcome.is_valid() { 0 } else { 1 })
}
