//! Token verification.
//!
//! Verification is a pure function of (token, secret, current time). It never
//! fails with an error: every token maps to exactly one [`VerificationOutcome`].
//!
//! Checks run in this order:
//! 1. Structure: three base64url segments, a decodable header and a JSON object payload
//! 2. Algorithm allow-list and HMAC signature
//! 3. `exp` (expired once `now >= exp`)
//! 4. `nbf` (not yet valid while `nbf > now`)

use std::collections::HashSet;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde_json::Value;
use tracing::{debug, warn};

use crate::claims::{TokenPayload, current_timestamp, names};
use crate::config::{Secret, VerifyConfig};

/// Result of verifying a token
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Signature and time window are valid; carries the full claim set
    Valid(TokenPayload),
    /// `exp` has passed or `nbf` has not yet arrived
    Expired,
    /// The signature does not match the secret, or the algorithm is not accepted
    InvalidSignature,
    /// The token could not be parsed
    Malformed,
}

impl VerificationOutcome {
    /// Whether the token was accepted
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Claims of a valid token
    pub fn payload(&self) -> Option<&TokenPayload> {
        match self {
            Self::Valid(payload) => Some(payload),
            _ => None,
        }
    }

    /// Consume into the claims of a valid token
    pub fn into_payload(self) -> Option<TokenPayload> {
        match self {
            Self::Valid(payload) => Some(payload),
            _ => None,
        }
    }

    /// Short, stable label for logs and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
            Self::Malformed => "malformed",
        }
    }
}

/// Verifies HMAC-signed compact tokens
#[derive(Debug, Clone, Default)]
pub struct TokenVerifier {
    config: VerifyConfig,
}

impl TokenVerifier {
    /// Create a verifier with the given options
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    /// Verification options in use
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Verify `token` against `secret` at the current time
    pub fn verify(&self, token: &str, secret: &Secret) -> VerificationOutcome {
        self.verify_at(token, secret, current_timestamp())
    }

    /// Verify `token` against `secret` at `now` (Unix seconds)
    pub fn verify_at(&self, token: &str, secret: &Secret, now: u64) -> VerificationOutcome {
        let outcome = self.evaluate(token, secret, now);
        match &outcome {
            VerificationOutcome::Valid(_) => debug!("token verified"),
            other => warn!(outcome = other.label(), "token rejected"),
        }
        outcome
    }

    fn evaluate(&self, token: &str, secret: &Secret, now: u64) -> VerificationOutcome {
        let Some(claims) = parse_structure(token) else {
            return VerificationOutcome::Malformed;
        };

        let Some(&first) = self.config.algorithms.first() else {
            return VerificationOutcome::InvalidSignature;
        };

        // Time claims are checked below against the injected clock
        let mut validation = Validation::new(first);
        validation.algorithms = self.config.algorithms.clone();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        let key = DecodingKey::from_secret(secret.expose().as_bytes());
        if let Err(e) = decode::<TokenPayload>(token, &key, &validation) {
            return match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_) => VerificationOutcome::InvalidSignature,
                _ => {
                    debug!(error = %e, "token failed to decode after structural checks");
                    VerificationOutcome::Malformed
                }
            };
        }

        if !self.config.ignore_expiration {
            match numeric_claim(&claims, names::EXP) {
                Err(()) => return VerificationOutcome::Malformed,
                Ok(Some(exp)) if now as f64 >= exp => return VerificationOutcome::Expired,
                Ok(_) => {}
            }
        }

        match numeric_claim(&claims, names::NBF) {
            Err(()) => VerificationOutcome::Malformed,
            Ok(Some(nbf)) if nbf > now as f64 => VerificationOutcome::Expired,
            Ok(_) => VerificationOutcome::Valid(claims),
        }
    }
}

/// Split and decode the unsigned parts of a token
fn parse_structure(token: &str) -> Option<TokenPayload> {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };
    if signature.is_empty() {
        return None;
    }

    decode_header(token).ok()?;

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice::<TokenPayload>(&bytes).ok()
}

/// `Ok(None)` when absent, `Err(())` when present but not a number
fn numeric_claim(claims: &TokenPayload, name: &str) -> Result<Option<f64>, ()> {
    match claims.get(name) {
        None => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
        Some(_) => Err(()),
    }
}
