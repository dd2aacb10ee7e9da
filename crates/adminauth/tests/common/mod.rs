//! Common test utilities for integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use adminauth::{Secret, SecretProvider, TokenPayload};
use serde_json::Value;

/// Fixed signing time used across tests
pub const T: u64 = 1_700_000_000;

/// 64 hex characters, free of placeholder markers and deny-listed fragments
pub const STRONG_TOKEN_SECRET: &str =
    "9f3c7e1b0a4d8f2e6c5b3a1d0e9f8c7b6a5d4e3f2c1b0a9e8d7c6b5a4f3e2d1c";

/// A second strong value, distinct from [`STRONG_TOKEN_SECRET`]
pub const STRONG_SESSION_SECRET: &str =
    "0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d";

/// Build a lookup map from key/value pairs
pub fn lookup(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Provider with both strong secrets in production mode
pub fn provider() -> SecretProvider {
    SecretProvider::from_lookup(&lookup(&[
        ("TOKEN_SECRET", STRONG_TOKEN_SECRET),
        ("JWT_SECRET", STRONG_SESSION_SECRET),
        ("APP_ENV", "production"),
    ]))
    .expect("both secrets are configured")
}

/// Wrap a non-empty test secret
pub fn secret(value: &str) -> Secret {
    Secret::new(value).expect("test secrets are non-empty")
}

/// Convert a JSON object literal into a payload
pub fn payload(value: Value) -> TokenPayload {
    value
        .as_object()
        .cloned()
        .expect("payload literal must be an object")
}
