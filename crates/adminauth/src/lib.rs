//! # adminauth - Token Trust for an Administrative API
//!
//! Issues and verifies signed tokens for the two trust domains of an admin API,
//! extracts bearer tokens from inbound requests, and audits the configured
//! secrets before a deployment is exposed.
//!
//! ## Architecture
//!
//! - [`config`] - `SecretProvider`, the `ConfigLookup` surface, signing/verifying options
//! - [`issuer`] - `TokenIssuer` for admin API tokens and gateway connection tokens
//! - [`verifier`] - `TokenVerifier` and the tagged `VerificationOutcome`
//! - [`bearer`] - `BearerExtractor` reading `Authorization: Bearer` or a `token` parameter
//! - [`audit`] - `SecurityAuditor`, the deployment preflight check
//! - [`error`] - Error types
//!
//! Secrets are resolved once into a [`SecretProvider`] and injected into every
//! component; a missing secret is a [`ConfigError`] returned to the caller, who
//! decides whether to abort.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use adminauth::{
//!     BearerExtractor, RequestMetadata, SecretProvider, TokenIssuer, TokenPayload,
//! };
//!
//! let mut env = HashMap::new();
//! env.insert("TOKEN_SECRET".to_string(), "admin-api-secret".to_string());
//! env.insert("JWT_SECRET".to_string(), "session-secret".to_string());
//! let provider = SecretProvider::from_lookup(&env)?;
//!
//! let issuer = TokenIssuer::from_provider(&provider);
//! let mut payload = TokenPayload::new();
//! payload.insert("id".to_string(), 42.into());
//! let token = issuer.issue(payload)?;
//!
//! let request = RequestMetadata::default()
//!     .with_authorization(&format!("Bearer {}", token.as_str()))?;
//! let outcome = BearerExtractor::from_provider(&provider).get_token(&request, true)?;
//! assert!(outcome.is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Token Format
//!
//! Compact JWS (`header.payload.signature`, base64url). Admin API tokens use
//! HS512 and carry `iat` and a one-minute `exp`; connection tokens use HS256 and
//! carry exactly `iss`, `nbf` (now - 60s) and `exp` (now + 120s).

pub mod audit;
pub mod bearer;
pub mod claims;
pub mod config;
pub mod error;
pub mod issuer;
pub mod verifier;

#[doc(inline)]
pub use audit::{AuditFinding, AuditReport, Classification, Reason, SecurityAuditor, Verdict};
#[doc(inline)]
pub use bearer::{BearerExtractor, RequestMetadata, TokenCarrier, extract_candidate};
#[doc(inline)]
pub use claims::{ConnectionClaims, GatewayConnection, IssuedToken, TokenPayload};
#[doc(inline)]
pub use config::{
    ConfigLookup, EnvLookup, Secret, SecretProvider, SigningConfig, TrustDomain, VerifyConfig,
};
#[doc(inline)]
pub use error::{AuthError, AuthResult, ConfigError, ExtractError, TokenError};
#[doc(inline)]
pub use issuer::TokenIssuer;
#[doc(inline)]
pub use verifier::{TokenVerifier, VerificationOutcome};
