//! Session credential codec
//!
//! Signs and verifies the client-held session credential carried in the
//! `session` cookie. Verification accepts two keys (current + previous) so
//! that key rotation does not invalidate sessions mid-rotation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Cookie name carrying the signed credential
pub const SESSION_COOKIE_NAME: &str = "session";

/// Fixed expiry horizon measured from issuance
pub const SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 3600;

/// Session claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Opaque collaborator-owned session state
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl SessionClaims {
    /// Check if the credential is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Codec for the signed session credential
///
/// Issues with the primary key only; verifies with the primary key first
/// and falls back to the secondary (rotated-out) key until it is retired.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    primary: DecodingKey,
    secondary: DecodingKey,
    max_age_secs: i64,
}

impl SessionCodec {
    /// Create a codec from the configured key pair
    #[must_use]
    pub fn new(primary_key: &str, secondary_key: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(primary_key.as_bytes()),
            primary: DecodingKey::from_secret(primary_key.as_bytes()),
            secondary: DecodingKey::from_secret(secondary_key.as_bytes()),
            max_age_secs: SESSION_MAX_AGE_SECS,
        }
    }

    #[cfg(test)]
    fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Issue a signed credential carrying collaborator session state
    ///
    /// # Errors
    /// Returns an error if encoding fails
    pub fn issue(&self, data: serde_json::Value) -> Result<String, GatewayError> {
        let now = Utc::now();
        let claims = SessionClaims {
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.max_age_secs)).timestamp(),
            data,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| GatewayError::internal(anyhow::anyhow!("Failed to encode session token")))
    }

    /// Verify a credential and return its claims
    ///
    /// # Errors
    /// Returns `SessionExpired` for a well-signed but stale credential and
    /// `SessionInvalid` for anything else.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, GatewayError> {
        match self.decode_with(token, &self.primary) {
            Ok(claims) => Ok(claims),
            // A credential signed with the rotated-out key still verifies
            Err(GatewayError::SessionInvalid) => self.decode_with(token, &self.secondary),
            Err(err) => Err(err),
        }
    }

    fn decode_with(&self, token: &str, key: &DecodingKey) -> Result<SessionClaims, GatewayError> {
        let validation = Validation::default();

        decode::<SessionClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => GatewayError::SessionExpired,
                _ => GatewayError::SessionInvalid,
            })
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("max_age_secs", &self.max_age_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> SessionCodec {
        SessionCodec::new("current-key", "previous-key")
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let codec = codec();
        let token = codec.issue(json!({"user": "42"})).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.data, json!({"user": "42"}));
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, SESSION_MAX_AGE_SECS);
    }

    #[test]
    fn test_rotated_out_key_still_accepted() {
        // A credential issued before rotation is signed with what is now
        // the secondary key
        let old = SessionCodec::new("previous-key", "unused");
        let token = old.issue(json!({"user": "42"})).unwrap();

        let claims = codec().verify(&token).unwrap();
        assert_eq!(claims.data, json!({"user": "42"}));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let foreign = SessionCodec::new("some-other-key", "unused");
        let token = foreign.issue(json!({})).unwrap();

        assert!(matches!(
            codec().verify(&token),
            Err(GatewayError::SessionInvalid)
        ));
    }

    #[test]
    fn test_expired_credential_rejected() {
        // jsonwebtoken applies 60s of leeway, so back-date well past it
        let codec = codec().with_max_age(-120);
        let token = codec.issue(json!({})).unwrap();

        assert!(matches!(
            codec.verify(&token),
            Err(GatewayError::SessionExpired)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            codec().verify("not-a-token"),
            Err(GatewayError::SessionInvalid)
        ));
    }
}
