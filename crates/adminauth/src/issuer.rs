//! Token issuing for both trust domains.
//!
//! - [`TokenIssuer::issue`] signs arbitrary payloads with the admin API secret.
//! - [`TokenIssuer::issue_connection_token`] signs a short-lived credential with a
//!   gateway connection's own secret.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::claims::{
    ConnectionClaims, GatewayConnection, IssuedToken, TokenPayload, current_timestamp, names,
};
use crate::config::{Secret, SecretProvider, SigningConfig, TrustDomain};
use crate::error::TokenError;

/// How far `nbf` is backdated on connection tokens, to tolerate clock skew
/// between this process and the gateway.
pub const CONNECTION_NOT_BEFORE_SKEW_SECS: u64 = 60;

/// Lifetime of a connection token after issuance
pub const CONNECTION_TOKEN_TTL_SECS: u64 = 120;

/// Algorithm used for connection tokens; the gateway's default for HMAC credentials
pub const CONNECTION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs tokens
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: Secret,
    config: SigningConfig,
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`
    pub fn new(secret: Secret, config: SigningConfig) -> Self {
        Self { secret, config }
    }

    /// Create an issuer for the admin API's own tokens with default signing options
    pub fn from_provider(provider: &SecretProvider) -> Self {
        Self::new(
            provider.resolve(TrustDomain::AdminApi).clone(),
            SigningConfig::default(),
        )
    }

    /// Signing options in use
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Sign `payload` with the admin API secret.
    ///
    /// Adds `iat` (unless disabled or already present) and `exp` (unless already
    /// present) before signing.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue_at`].
    pub fn issue(&self, payload: TokenPayload) -> Result<IssuedToken, TokenError> {
        self.issue_at(payload, current_timestamp())
    }

    /// [`TokenIssuer::issue`] with an explicit signing time in Unix seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidTimeClaim`] if the payload carries a
    /// non-numeric `iat`, `exp` or `nbf`, [`TokenError::ExpiryOverflow`] if the
    /// default expiry does not fit, or [`TokenError::Signing`].
    pub fn issue_at(&self, mut payload: TokenPayload, now: u64) -> Result<IssuedToken, TokenError> {
        check_time_claims(&payload)?;

        let issued_at = payload
            .get(names::IAT)
            .and_then(Value::as_u64)
            .unwrap_or(now);

        if !self.config.no_timestamp {
            payload
                .entry(names::IAT)
                .or_insert_with(|| Value::from(issued_at));
        }
        if !payload.contains_key(names::EXP) {
            let exp = issued_at.checked_add(self.config.expires_in).ok_or(
                TokenError::ExpiryOverflow {
                    issued_at,
                    expires_in: self.config.expires_in,
                },
            )?;
            payload.insert(names::EXP.to_string(), Value::from(exp));
        }

        let token = sign(&payload, &self.secret, self.config.algorithm)?;
        debug!(
            algorithm = ?self.config.algorithm,
            claims = payload.len(),
            "issued admin API token"
        );
        Ok(token)
    }

    /// Sign a serializable claims struct; it must serialize to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidPayload`] if `claims` is not an object,
    /// [`TokenError::Payload`] if it cannot be serialized, or [`TokenError::Signing`].
    pub fn issue_claims<T: Serialize>(&self, claims: &T) -> Result<IssuedToken, TokenError> {
        match serde_json::to_value(claims)? {
            Value::Object(payload) => self.issue(payload),
            _ => Err(TokenError::InvalidPayload),
        }
    }

    /// Issue a short-lived token for a downstream gateway connection.
    ///
    /// The token is signed with the connection's own secret, which is used for
    /// this call only.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the signing backend fails.
    pub fn issue_connection_token(
        &self,
        connection: &GatewayConnection,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_connection_token_at(connection, current_timestamp())
    }

    /// [`TokenIssuer::issue_connection_token`] with an explicit time in Unix seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the signing backend fails.
    pub fn issue_connection_token_at(
        &self,
        connection: &GatewayConnection,
        now: u64,
    ) -> Result<IssuedToken, TokenError> {
        issue_connection_token_at(connection, now)
    }
}

/// Issue a connection token without an admin API issuer at hand.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the signing backend fails.
pub fn issue_connection_token(connection: &GatewayConnection) -> Result<IssuedToken, TokenError> {
    issue_connection_token_at(connection, current_timestamp())
}

/// [`issue_connection_token`] with an explicit time in Unix seconds.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the signing backend fails.
pub fn issue_connection_token_at(
    connection: &GatewayConnection,
    now: u64,
) -> Result<IssuedToken, TokenError> {
    let claims = connection_claims(&connection.key, now);
    let token = sign(&claims, &connection.secret, CONNECTION_ALGORITHM)?;
    debug!(
        connection = %connection.id,
        nbf = claims.nbf,
        exp = claims.exp,
        "issued connection token"
    );
    Ok(token)
}

/// Claims of a connection token issued at `now`
pub fn connection_claims(key: &str, now: u64) -> ConnectionClaims {
    ConnectionClaims {
        iss: key.to_string(),
        nbf: now.saturating_sub(CONNECTION_NOT_BEFORE_SKEW_SECS),
        exp: now + CONNECTION_TOKEN_TTL_SECS,
    }
}

/// Time claims supplied by the caller must be numeric, or the token could never verify
fn check_time_claims(payload: &TokenPayload) -> Result<(), TokenError> {
    for name in [names::IAT, names::EXP, names::NBF] {
        match payload.get(name) {
            None | Some(Value::Number(_)) => {}
            Some(_) => return Err(TokenError::InvalidTimeClaim { name }),
        }
    }
    Ok(())
}

fn sign<T: Serialize>(
    claims: &T,
    secret: &Secret,
    algorithm: Algorithm,
) -> Result<IssuedToken, TokenError> {
    let key = EncodingKey::from_secret(secret.expose().as_bytes());
    let token = encode(&Header::new(algorithm), claims, &key)?;
    Ok(IssuedToken::new(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            Secret::new("issuer_test_key_0123456789abcdef0123").unwrap(),
            SigningConfig::default(),
        )
    }

    fn decode_segment(token: &IssuedToken, index: usize) -> Value {
        let segment = token.as_str().split('.').nth(index).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_issue_adds_iat_and_default_expiry() {
        let payload = json!({"id": 7}).as_object().cloned().unwrap();
        let token = issuer().issue_at(payload, 1_000).unwrap();

        let claims = decode_segment(&token, 1);
        assert_eq!(claims["id"], 7);
        assert_eq!(claims["iat"], 1_000);
        assert_eq!(claims["exp"], 1_060);
    }

    #[test]
    fn test_issue_uses_hs512() {
        let token = issuer().issue_at(TokenPayload::new(), 1_000).unwrap();
        let header = decode_segment(&token, 0);
        assert_eq!(header["alg"], "HS512");
    }

    #[test]
    fn test_issue_keeps_caller_expiry() {
        let payload = json!({"exp": 5}).as_object().cloned().unwrap();
        let token = issuer().issue_at(payload, 1_000).unwrap();
        assert_eq!(decode_segment(&token, 1)["exp"], 5);
    }

    #[test]
    fn test_no_timestamp_skips_iat() {
        let issuer = TokenIssuer::new(
            Secret::new("k").unwrap(),
            SigningConfig {
                no_timestamp: true,
                ..SigningConfig::default()
            },
        );
        let token = issuer.issue_at(TokenPayload::new(), 1_000).unwrap();
        let claims = decode_segment(&token, 1);
        assert!(claims.get("iat").is_none());
        assert_eq!(claims["exp"], 1_060);
    }

    #[test]
    fn test_issue_is_deterministic() {
        let payload = json!({"user": "a"}).as_object().cloned().unwrap();
        let a = issuer().issue_at(payload.clone(), 42).unwrap();
        let b = issuer().issue_at(payload, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_issue_rejects_non_numeric_time_claims() {
        for name in ["iat", "exp", "nbf"] {
            let mut payload = TokenPayload::new();
            payload.insert(name.to_string(), json!("tomorrow"));
            let err = issuer().issue_at(payload, 1_000).unwrap_err();
            assert!(
                matches!(err, TokenError::InvalidTimeClaim { name: n } if n == name),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_issue_rejects_overflowing_expiry() {
        let payload = json!({"iat": u64::MAX}).as_object().cloned().unwrap();
        let err = issuer().issue_at(payload, 1_000).unwrap_err();
        assert!(matches!(
            err,
            TokenError::ExpiryOverflow {
                issued_at: u64::MAX,
                expires_in: 60
            }
        ));
    }

    #[test]
    fn test_large_iat_with_caller_expiry_is_signed() {
        let payload = json!({"iat": u64::MAX, "exp": u64::MAX}).as_object().cloned().unwrap();
        let token = issuer().issue_at(payload, 1_000).unwrap();
        assert_eq!(decode_segment(&token, 1)["exp"], u64::MAX);
    }

    #[test]
    fn test_issue_claims_rejects_non_object() {
        assert!(issuer().issue_claims(&"just a string").is_err());
    }

    #[test]
    fn test_connection_claims_window() {
        let claims = connection_claims("K", 10_000);
        assert_eq!(claims.iss, "K");
        assert_eq!(claims.nbf, 9_940);
        assert_eq!(claims.exp, 10_120);
    }

    #[test]
    fn test_connection_token_carries_exactly_three_claims() {
        let connection = GatewayConnection::new("conn-1", "K", Secret::new("S").unwrap());
        let token = issuer().issue_connection_token_at(&connection, 10_000).unwrap();

        let claims = decode_segment(&token, 1);
        assert_eq!(claims, json!({"iss": "K", "nbf": 9_940, "exp": 10_120}));
        assert_eq!(decode_segment(&token, 0)["alg"], "HS256");
    }

    #[test]
    fn test_issued_token_debug_is_redacted() {
        let token = issuer().issue_at(TokenPayload::new(), 1).unwrap();
        assert_eq!(format!("{token:?}"), "IssuedToken([REDACTED])");
    }
}
