//! Token lifecycle tests
//!
//! Tests cover:
//! - Issue/verify round trip for generic payloads
//! - Tamper sensitivity of the signature segment
//! - Expiry and not-before handling
//! - The connection token window

mod common;

use adminauth::{
    GatewayConnection, SigningConfig, TokenError, TokenIssuer, TokenVerifier, TrustDomain,
    VerificationOutcome,
};
use common::{T, payload, provider, secret};
use proptest::prelude::*;
use serde_json::{Value, json};

fn issuer() -> TokenIssuer {
    TokenIssuer::from_provider(&provider())
}

fn admin_secret() -> adminauth::Secret {
    provider().resolve(TrustDomain::AdminApi).clone()
}

#[test]
fn test_round_trip_adds_iat_and_expiry() {
    let original = payload(json!({
        "id": 1,
        "username": "admin-user",
        "roles": ["viewer"],
        "nested": {"a": true}
    }));
    let token = issuer().issue_at(original.clone(), T).unwrap();

    let verified = TokenVerifier::default()
        .verify_at(token.as_str(), &admin_secret(), T)
        .into_payload()
        .expect("freshly issued token is valid");

    for (key, value) in &original {
        assert_eq!(verified.get(key), Some(value), "claim {key}");
    }
    assert_eq!(verified["iat"], T);
    assert_eq!(verified["exp"], T + 60);
    assert_eq!(verified.len(), original.len() + 2);
}

#[test]
fn test_session_secret_does_not_verify_admin_tokens() {
    let token = issuer().issue_at(payload(json!({"id": 1})), T).unwrap();
    let session = provider().resolve(TrustDomain::Session).clone();
    assert_eq!(
        TokenVerifier::default().verify_at(token.as_str(), &session, T),
        VerificationOutcome::InvalidSignature
    );
}

#[test]
fn test_past_expiry_is_expired() {
    let token = issuer()
        .issue_at(payload(json!({"exp": T - 1})), T)
        .unwrap();
    assert_eq!(
        TokenVerifier::default().verify_at(token.as_str(), &admin_secret(), T),
        VerificationOutcome::Expired
    );
}

#[test]
fn test_future_not_before_is_expired() {
    let token = issuer()
        .issue_at(payload(json!({"nbf": T + 10})), T)
        .unwrap();
    let verifier = TokenVerifier::default();
    assert_eq!(
        verifier.verify_at(token.as_str(), &admin_secret(), T),
        VerificationOutcome::Expired
    );
    assert!(verifier.verify_at(token.as_str(), &admin_secret(), T + 10).is_valid());
}

#[test]
fn test_unverifiable_time_claims_are_refused_at_issuance() {
    let err = issuer()
        .issue_at(payload(json!({"exp": "tomorrow"})), T)
        .unwrap_err();
    assert!(matches!(err, TokenError::InvalidTimeClaim { name: "exp" }));

    let err = issuer()
        .issue_at(payload(json!({"iat": u64::MAX})), T)
        .unwrap_err();
    assert!(matches!(err, TokenError::ExpiryOverflow { .. }));
}

#[test]
fn test_token_issued_now_verifies_now() {
    let token = issuer().issue(payload(json!({"id": 9}))).unwrap();
    assert!(
        TokenVerifier::default()
            .verify(token.as_str(), &admin_secret())
            .is_valid()
    );
}

#[test]
fn test_custom_expiry_window() {
    let issuer = TokenIssuer::new(
        admin_secret(),
        SigningConfig {
            expires_in: 3_600,
            ..SigningConfig::default()
        },
    );
    let token = issuer.issue_at(payload(json!({})), T).unwrap();
    let verifier = TokenVerifier::default();
    assert!(verifier.verify_at(token.as_str(), &admin_secret(), T + 3_599).is_valid());
    assert_eq!(
        verifier.verify_at(token.as_str(), &admin_secret(), T + 3_600),
        VerificationOutcome::Expired
    );
}

// Connection tokens

fn connection() -> GatewayConnection {
    GatewayConnection::new("gateway-1", "K", secret("S"))
}

#[test]
fn test_connection_token_claims() {
    let token = issuer().issue_connection_token_at(&connection(), T).unwrap();
    let claims = TokenVerifier::default()
        .verify_at(token.as_str(), &secret("S"), T)
        .into_payload()
        .expect("valid at issuance time");

    assert_eq!(claims["iss"], "K");
    assert_eq!(claims["nbf"], T - 60);
    assert_eq!(claims["exp"], T + 120);
    assert_eq!(claims.len(), 3);
}

#[test]
fn test_connection_token_window_edges() {
    let token = issuer().issue_connection_token_at(&connection(), T).unwrap();
    let verifier = TokenVerifier::default();
    let s = secret("S");

    // backdated nbf tolerates a consumer clock running up to 60s behind
    assert!(verifier.verify_at(token.as_str(), &s, T - 60).is_valid());
    assert_eq!(
        verifier.verify_at(token.as_str(), &s, T - 61),
        VerificationOutcome::Expired
    );
    assert!(verifier.verify_at(token.as_str(), &s, T + 119).is_valid());
    assert_eq!(
        verifier.verify_at(token.as_str(), &s, T + 121),
        VerificationOutcome::Expired
    );
}

#[test]
fn test_connection_token_other_secret() {
    let token = issuer().issue_connection_token_at(&connection(), T).unwrap();
    for other in ["s", "SS", "S ", "another-secret"] {
        assert_eq!(
            TokenVerifier::default().verify_at(token.as_str(), &secret(other), T),
            VerificationOutcome::InvalidSignature,
            "secret {other:?}"
        );
    }
}

#[test]
fn test_connections_use_their_own_secrets() {
    let a = GatewayConnection::new("a", "key-a", secret("secret-a"));
    let b = GatewayConnection::new("b", "key-b", secret("secret-b"));
    let token_a = issuer().issue_connection_token_at(&a, T).unwrap();
    let token_b = issuer().issue_connection_token_at(&b, T).unwrap();

    let verifier = TokenVerifier::default();
    assert!(verifier.verify_at(token_a.as_str(), &secret("secret-a"), T).is_valid());
    assert!(verifier.verify_at(token_b.as_str(), &secret("secret-b"), T).is_valid());
    assert_eq!(
        verifier.verify_at(token_a.as_str(), &secret("secret-b"), T),
        VerificationOutcome::InvalidSignature
    );
}

const B64URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

fn claim_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::from),
    ]
}

proptest! {
    #[test]
    fn prop_round_trip(
        claims in proptest::collection::btree_map("[a-z]{1,8}", claim_value(), 0..8),
        key in "[ -~]{1,64}",
    ) {
        let claims: serde_json::Map<String, Value> = claims
            .into_iter()
            .filter(|(k, _)| !matches!(k.as_str(), "iat" | "exp" | "nbf"))
            .collect();
        let s = secret(&key);
        let token = TokenIssuer::new(s.clone(), SigningConfig::default())
            .issue_at(claims.clone(), T)
            .unwrap();

        let verified = TokenVerifier::default()
            .verify_at(token.as_str(), &s, T)
            .into_payload();
        prop_assert!(verified.is_some());
        let verified = verified.unwrap();

        let mut expected = claims;
        expected.insert("iat".to_string(), Value::from(T));
        expected.insert("exp".to_string(), Value::from(T + 60));
        prop_assert_eq!(verified, expected);
    }

    #[test]
    fn prop_signature_tamper_is_rejected(position in any::<prop::sample::Index>(), replacement in 0usize..64) {
        let token = issuer().issue_at(payload(json!({"id": 1})), T).unwrap().into_string();
        let signature_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let at = signature_start + position.index(bytes.len() - signature_start);

        let mut new_char = B64URL[replacement];
        if new_char == bytes[at] {
            new_char = B64URL[(replacement + 1) % B64URL.len()];
        }
        bytes[at] = new_char;
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert_eq!(
            TokenVerifier::default().verify_at(&tampered, &admin_secret(), T),
            VerificationOutcome::InvalidSignature
        );
    }
}
