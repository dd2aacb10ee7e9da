//! Bearer token extraction from inbound requests.
//!
//! Extraction policy, in order:
//! 1. `Authorization: Bearer <token>` (scheme matched case-insensitively)
//! 2. a request parameter named `token`, only when no `Authorization` header is present
//! 3. nothing: an empty candidate, or [`ExtractError::MissingAuthorization`] in strict mode
//!
//! The candidate is always handed to the [`TokenVerifier`]; an empty candidate
//! verifies as [`VerificationOutcome::Malformed`].

use std::collections::HashMap;

use http::header::{AUTHORIZATION, InvalidHeaderValue};
use http::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::claims::current_timestamp;
use crate::config::{Secret, SecretProvider, TrustDomain};
use crate::error::ExtractError;
use crate::verifier::{TokenVerifier, VerificationOutcome};

/// Name of the fallback request parameter
pub const TOKEN_PARAM: &str = "token";

/// Authorization scheme accepted for bearer tokens
pub const BEARER_SCHEME: &str = "Bearer";

/// Anything a bearer token can be read from
pub trait TokenCarrier {
    /// Raw `Authorization` header value, if present
    fn authorization(&self) -> Option<&HeaderValue>;

    /// Value of a named request parameter (query, body or route), if present
    fn param(&self, name: &str) -> Option<String>;
}

fn authorization_header(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers.get(AUTHORIZATION)
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

impl<B> TokenCarrier for http::Request<B> {
    fn authorization(&self) -> Option<&HeaderValue> {
        authorization_header(self.headers())
    }

    fn param(&self, name: &str) -> Option<String> {
        query_param(self.uri().query(), name)
    }
}

impl TokenCarrier for http::request::Parts {
    fn authorization(&self) -> Option<&HeaderValue> {
        authorization_header(&self.headers)
    }

    fn param(&self, name: &str) -> Option<String> {
        query_param(self.uri.query(), name)
    }
}

/// Request metadata for callers that have already parsed their parameters,
/// e.g. form bodies or route segments.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    headers: HeaderMap,
    params: HashMap<String, String>,
}

impl RequestMetadata {
    /// Metadata from headers and already-parsed parameters
    pub fn new(headers: HeaderMap, params: HashMap<String, String>) -> Self {
        Self { headers, params }
    }

    /// Set the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderValue`] if `value` is not a valid header value.
    pub fn with_authorization(mut self, value: &str) -> Result<Self, InvalidHeaderValue> {
        self.headers
            .insert(AUTHORIZATION, HeaderValue::from_str(value)?);
        Ok(self)
    }

    /// Add a request parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

impl TokenCarrier for RequestMetadata {
    fn authorization(&self) -> Option<&HeaderValue> {
        authorization_header(&self.headers)
    }

    fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }
}

/// Locate the candidate token in `request`.
///
/// Returns an empty string when nothing usable is found and `throw_on_missing`
/// is false.
///
/// # Errors
///
/// With `throw_on_missing` set:
/// - [`ExtractError::InvalidHeaderFormat`] when the `Authorization` header is not
///   visible ASCII or does not split into exactly two parts
/// - [`ExtractError::MissingAuthorization`] when neither header nor parameter is present
pub fn extract_candidate<R: TokenCarrier + ?Sized>(
    request: &R,
    throw_on_missing: bool,
) -> Result<String, ExtractError> {
    if let Some(value) = request.authorization().filter(|v| !v.is_empty()) {
        let Ok(header) = value.to_str() else {
            return if throw_on_missing {
                warn!("authorization header is not visible ASCII");
                Err(ExtractError::InvalidHeaderFormat)
            } else {
                Ok(String::new())
            };
        };
        let parts: Vec<&str> = header.split_whitespace().collect();
        return match parts.as_slice() {
            [scheme, credentials] if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
                Ok((*credentials).to_string())
            }
            [scheme, _] => {
                debug!(scheme, "authorization header uses a non-bearer scheme");
                Ok(String::new())
            }
            _ if throw_on_missing => {
                warn!(parts = parts.len(), "malformed authorization header");
                Err(ExtractError::InvalidHeaderFormat)
            }
            _ => Ok(String::new()),
        };
    }

    if let Some(token) = request.param(TOKEN_PARAM).filter(|t| !t.is_empty()) {
        return Ok(token);
    }

    if throw_on_missing {
        warn!("request carries no authorization header or token parameter");
        return Err(ExtractError::MissingAuthorization);
    }

    Ok(String::new())
}

/// Extracts bearer tokens and verifies them against the admin API secret
#[derive(Debug, Clone)]
pub struct BearerExtractor {
    secret: Secret,
    verifier: TokenVerifier,
}

impl BearerExtractor {
    /// Create an extractor verifying against `secret`
    pub fn new(secret: Secret, verifier: TokenVerifier) -> Self {
        Self { secret, verifier }
    }

    /// Create an extractor for the admin API's own tokens
    pub fn from_provider(provider: &SecretProvider) -> Self {
        Self::new(
            provider.resolve(TrustDomain::AdminApi).clone(),
            TokenVerifier::default(),
        )
    }

    /// Extract the candidate token from `request` and verify it.
    ///
    /// # Errors
    ///
    /// See [`extract_candidate`]; verification failures are reported in the
    /// returned [`VerificationOutcome`], not as errors.
    pub fn get_token<R: TokenCarrier + ?Sized>(
        &self,
        request: &R,
        throw_on_missing: bool,
    ) -> Result<VerificationOutcome, ExtractError> {
        self.get_token_at(request, throw_on_missing, current_timestamp())
    }

    /// [`BearerExtractor::get_token`] evaluated at `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// See [`extract_candidate`].
    pub fn get_token_at<R: TokenCarrier + ?Sized>(
        &self,
        request: &R,
        throw_on_missing: bool,
        now: u64,
    ) -> Result<VerificationOutcome, ExtractError> {
        let candidate = extract_candidate(request, throw_on_missing)?;
        Ok(self.verifier.verify_at(&candidate, &self.secret, now))
    }
}
