//! Secret resolution and signing configuration.
//!
//! Secrets are read once, at start-up, through a [`ConfigLookup`] and then held
//! immutably for the lifetime of the process. Resolution never terminates the
//! process itself; it returns a [`ConfigError`] and leaves that decision to the
//! composition root.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use crate::error::ConfigError;

/// Configuration key holding the admin API's own token secret
pub const TOKEN_SECRET_KEY: &str = "TOKEN_SECRET";

/// Configuration key holding the public-facing session secret
pub const SESSION_SECRET_KEY: &str = "JWT_SECRET";

/// Configuration key holding the deployment environment mode
pub const ENVIRONMENT_KEY: &str = "APP_ENV";

/// Environment mode expected for production deployments
pub const PRODUCTION: &str = "production";

/// Read-only view over a configuration surface.
///
/// Both [`SecretProvider`] and the [`audit`](crate::audit) module read through
/// this trait so they always agree on where a value comes from.
pub trait ConfigLookup {
    /// Value configured for `key`, if any
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Lookup backed by the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvLookup;

impl ConfigLookup for EnvLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Layered configuration built with the `config` crate.
///
/// The `config` crate lower-cases environment keys, so lookups are lower-cased too.
impl ConfigLookup for config::Config {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get_string(&key.to_lowercase()).ok()
    }
}

impl<L: ConfigLookup + ?Sized> ConfigLookup for &L {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

/// An opaque, non-empty signing secret.
///
/// The value is never printed by `Debug`, and equality is checked in constant time.
#[derive(Clone)]
pub struct Secret(Arc<SecretString>);

impl Secret {
    /// Wrap a secret value; `None` when the value is empty
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            return None;
        }
        Some(Self(Arc::new(SecretString::new(value))))
    }

    /// Raw secret bytes, for signing and verification only
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Length of the secret in characters
    pub fn len(&self) -> usize {
        self.expose().chars().count()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.expose()
            .as_bytes()
            .ct_eq(other.expose().as_bytes())
            .into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// The two process-wide trust domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustDomain {
    /// Tokens issued and verified by the admin API itself
    AdminApi,
    /// The admin API's public-facing session mechanism
    Session,
}

impl TrustDomain {
    /// Both domains, in resolution order
    pub const ALL: [TrustDomain; 2] = [TrustDomain::AdminApi, TrustDomain::Session];

    /// Configuration key holding this domain's secret
    pub fn config_key(self) -> &'static str {
        match self {
            Self::AdminApi => TOKEN_SECRET_KEY,
            Self::Session => SESSION_SECRET_KEY,
        }
    }
}

/// Resolve one named secret from a configuration surface.
///
/// # Errors
///
/// Returns [`ConfigError::MissingSecret`] when the key is absent and
/// [`ConfigError::EmptySecret`] when it is present but empty.
pub fn resolve_secret<L: ConfigLookup + ?Sized>(
    lookup: &L,
    name: &str,
) -> Result<Secret, ConfigError> {
    let value = lookup.lookup(name).ok_or_else(|| {
        error!(name, "required secret is not configured");
        ConfigError::MissingSecret {
            name: name.to_string(),
        }
    })?;

    Secret::new(value).ok_or_else(|| {
        error!(name, "required secret is configured but empty");
        ConfigError::EmptySecret {
            name: name.to_string(),
        }
    })
}

/// Holds the process-wide secrets, resolved once at start-up.
///
/// A `SecretProvider` cannot be built without both trust-domain secrets, so any
/// component constructed from one is guaranteed to have a secret to sign with.
#[derive(Debug, Clone)]
pub struct SecretProvider {
    admin_api: Secret,
    session: Secret,
    environment: Option<String>,
}

impl SecretProvider {
    /// Build a provider from already-resolved secrets
    pub fn new(admin_api: Secret, session: Secret) -> Self {
        Self {
            admin_api,
            session,
            environment: None,
        }
    }

    /// Set the deployment environment mode
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Resolve both trust-domain secrets and the environment mode.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered, in [`TrustDomain::ALL`] order.
    pub fn from_lookup<L: ConfigLookup + ?Sized>(lookup: &L) -> Result<Self, ConfigError> {
        let admin_api = resolve_secret(lookup, TrustDomain::AdminApi.config_key())?;
        let session = resolve_secret(lookup, TrustDomain::Session.config_key())?;

        if admin_api == session {
            warn!(
                "{} and {} hold the same value; trust domains are not separated",
                TOKEN_SECRET_KEY, SESSION_SECRET_KEY
            );
        }

        let environment = lookup.lookup(ENVIRONMENT_KEY);
        debug!(environment = ?environment, "resolved process secrets");

        Ok(Self {
            admin_api,
            session,
            environment,
        })
    }

    /// Resolve secrets from the process environment.
    ///
    /// # Errors
    ///
    /// See [`SecretProvider::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&EnvLookup)
    }

    /// Secret of the given trust domain
    pub fn resolve(&self, domain: TrustDomain) -> &Secret {
        match domain {
            TrustDomain::AdminApi => &self.admin_api,
            TrustDomain::Session => &self.session,
        }
    }

    /// Configured environment mode, if any
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Whether the environment mode is the production marker
    pub fn is_production(&self) -> bool {
        self.environment.as_deref() == Some(PRODUCTION)
    }
}

/// Options applied when signing admin API tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Signing algorithm
    #[serde(default = "default_signing_algorithm")]
    pub algorithm: Algorithm,
    /// Seconds from signing until the token expires
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Skip adding the `iat` claim
    #[serde(default)]
    pub no_timestamp: bool,
}

fn default_signing_algorithm() -> Algorithm {
    Algorithm::HS512
}

fn default_expires_in() -> u64 {
    60
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: default_signing_algorithm(),
            expires_in: default_expires_in(),
            no_timestamp: false,
        }
    }
}

/// Options applied when verifying tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Accept tokens whose `exp` has passed
    #[serde(default)]
    pub ignore_expiration: bool,
    /// HMAC algorithms accepted in the token header
    #[serde(default = "default_verify_algorithms")]
    pub algorithms: Vec<Algorithm>,
}

fn default_verify_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512]
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            ignore_expiration: false,
            algorithms: default_verify_algorithms(),
        }
    }
}
