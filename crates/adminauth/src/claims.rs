//! Token payloads, connection credentials and issued tokens.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::Secret;

/// Claim names interpreted by this crate
pub mod names {
    /// Issued-at
    pub const IAT: &str = "iat";
    /// Expiry
    pub const EXP: &str = "exp";
    /// Not-before
    pub const NBF: &str = "nbf";
    /// Issuer
    pub const ISS: &str = "iss";
}

/// Claims carried by a token, keyed by claim name.
///
/// Generic issuance accepts any claims; only `iat`, `exp` and `nbf` are
/// ever interpreted.
pub type TokenPayload = serde_json::Map<String, serde_json::Value>;

/// Current Unix time in whole seconds
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Claims of a downstream gateway connection token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionClaims {
    /// The connection's credential key
    pub iss: String,
    /// Not valid before (Unix seconds)
    pub nbf: u64,
    /// Expires at (Unix seconds)
    pub exp: u64,
}

/// A downstream gateway connection as far as token issuance is concerned
#[derive(Debug, Clone)]
pub struct GatewayConnection {
    /// Connection identifier, used for logging only
    pub id: String,
    /// Credential key the gateway knows this consumer by
    pub key: String,
    /// Per-connection signing secret
    pub secret: Secret,
}

impl GatewayConnection {
    /// Describe a connection
    pub fn new(id: impl Into<String>, key: impl Into<String>, secret: Secret) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            secret,
        }
    }
}

/// A signed compact token (`header.payload.signature`).
///
/// `Debug` output is redacted; use [`IssuedToken::as_str`] to send it.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken(String);

impl IssuedToken {
    pub(crate) fn new(token: String) -> Self {
        Self(token)
    }

    /// The compact token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the compact token
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for IssuedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IssuedToken([REDACTED])")
    }
}

impl fmt::Display for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
