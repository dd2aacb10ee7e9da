//! Error types for secret resolution, bearer extraction and token signing.
//!
//! Verification failures are deliberately absent here: they are reported as a
//! [`VerificationOutcome`](crate::VerificationOutcome) value so request handlers
//! can choose the HTTP response themselves.

use http::StatusCode;
use thiserror::Error;

/// Configuration errors raised while resolving secrets at start-up.
///
/// These are fatal for the hosting service: the composition root is expected to
/// abort when it receives one, since no token operation may run without a secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required secret is not configured at all
    #[error("{name} is not set; refusing to start without it")]
    MissingSecret {
        /// Configuration key that was looked up
        name: String,
    },

    /// A required secret is configured with an empty value
    #[error("{name} is set but empty; refusing to start without it")]
    EmptySecret {
        /// Configuration key that was looked up
        name: String,
    },
}

impl ConfigError {
    /// Name of the configuration key this error refers to
    pub fn name(&self) -> &str {
        match self {
            Self::MissingSecret { name } | Self::EmptySecret { name } => name,
        }
    }
}

/// Errors raised while locating a bearer token in an inbound request.
///
/// Only produced when the caller asks for strict presence.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    /// The `Authorization` header does not split into a scheme and a credential
    #[error("Invalid authorization header format. Format is Authorization: Bearer [token]")]
    InvalidHeaderFormat,

    /// Neither an `Authorization` header nor a `token` parameter was supplied
    #[error("No authorization header was found")]
    MissingAuthorization,
}

impl ExtractError {
    /// HTTP status a request handler should answer with
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

/// Errors raised while signing a token
#[derive(Error, Debug)]
pub enum TokenError {
    /// The payload could not be serialized or the signing backend failed
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The claims could not be converted to JSON
    #[error("failed to serialize token claims: {0}")]
    Payload(#[from] serde_json::Error),

    /// The claims did not serialize to a JSON object
    #[error("token claims must serialize to a JSON object")]
    InvalidPayload,

    /// A time claim (`iat`, `exp`, `nbf`) is not a number
    #[error("claim '{name}' must be a number of seconds since the Unix epoch")]
    InvalidTimeClaim {
        /// Offending claim
        name: &'static str,
    },

    /// `iat + expires_in` does not fit in a timestamp
    #[error("token expiry overflows: iat {issued_at} + {expires_in}s")]
    ExpiryOverflow {
        /// Issued-at used for the computation
        issued_at: u64,
        /// Configured lifetime in seconds
        expires_in: u64,
    },
}

/// Umbrella error for callers that drive several components at once
#[derive(Error, Debug)]
pub enum AuthError {
    /// Secret resolution failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bearer extraction failed
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Token signing failed
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Result alias used across the crate
pub type AuthResult<T> = Result<T, AuthError>;
