//! Service token management
//!
//! Mints the short-lived JWTs presented to the internal backend and
//! verifies caller-supplied bearer tokens against the same signing secret.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// Claims carried by a service token.
///
/// `sub` and `user_id` both carry the user id; the backend reads either.
/// Caller-supplied bearer tokens are decoded into the same shape, where
/// `user_id` and `jti` may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClaims {
    /// Subject, the user id.
    #[serde(default)]
    pub sub: String,
    /// Duplicate of the subject for backends that read `user_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Issued-at, seconds since the epoch.
    #[serde(default)]
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Token id, fresh per mint. Confirms no token is ever reused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl ServiceClaims {
    /// Create claims for a freshly minted token.
    fn new(user_id: &str, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            user_id: Some(user_id.to_string()),
            iat: now,
            exp: now + ttl_secs,
            jti: Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}

#[derive(Clone, Debug)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// Token manager wrapping the HS256 signing configuration.
///
/// Constructed once from [`RelayConfig`]; holds no per-request state.
/// Tokens are never cached: every mint produces a fresh credential.
#[derive(Clone, Debug)]
pub struct TokenManager {
    /// `None` when the signing secret is absent. Minting and verification
    /// then fail closed with a configuration error.
    keys: Option<SigningKeys>,
    ttl_secs: i64,
}

impl TokenManager {
    /// Create a token manager from the relay configuration.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        Self::from_secret(&config.signing_secret, config.service_token_ttl_secs)
    }

    /// Create a token manager from a raw secret and token lifetime.
    #[must_use]
    pub fn from_secret(secret: &str, ttl_secs: i64) -> Self {
        let keys = if secret.is_empty() {
            None
        } else {
            let mut validation = Validation::new(Algorithm::HS256);
            validation.validate_exp = true;
            validation.validate_nbf = false;
            validation.leeway = 5;

            Some(SigningKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
            })
        };

        Self { keys, ttl_secs }
    }

    /// Mint a service token for `user_id` with the configured lifetime.
    pub fn mint(&self, user_id: &str) -> Result<String> {
        self.mint_with_ttl(user_id, self.ttl_secs)
    }

    /// Mint a service token with an explicit lifetime.
    ///
    /// Used by the session layer, whose cookie cache outlives the
    /// short-lived backend tokens.
    pub fn mint_with_ttl(&self, user_id: &str, ttl_secs: i64) -> Result<String> {
        if user_id.is_empty() {
            return Err(RelayError::internal(
                "refusing to mint a token for an empty user id",
            ));
        }
        let keys = self.signing_keys()?;

        let claims = ServiceClaims::new(user_id, ttl_secs);
        let header = Header::new(Algorithm::HS256);

        encode(&header, &claims, &keys.encoding)
            .map_err(|e| RelayError::internal_with_source("Token generation failed", e))
    }

    /// Verify a caller-supplied bearer token and return its claims.
    ///
    /// Checks signature and expiry, then requires a non-empty subject.
    pub fn verify(&self, token: &str) -> Result<ServiceClaims> {
        let keys = self.signing_keys()?;

        let token_data: TokenData<ServiceClaims> = decode(token, &keys.decoding, &keys.validation)
            .map_err(|e| {
                let message = match e.kind() {
                    ErrorKind::ExpiredSignature => "token has expired".to_string(),
                    _ => e.to_string(),
                };
                RelayError::invalid_token_with_source(message, e)
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(RelayError::MissingSubject);
        }

        Ok(claims)
    }

    /// Decode claims without verifying the signature. Test-support only.
    #[cfg(test)]
    pub fn decode_unverified(token: &str) -> Option<ServiceClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        decode::<ServiceClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    fn signing_keys(&self) -> Result<&SigningKeys> {
        self.keys
            .as_ref()
            .ok_or_else(|| RelayError::config("signing secret is not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::from_secret("test-secret-key-for-relay-testing", 60)
    }

    #[test]
    fn mint_and_verify_round_trip() {
        let manager = manager();
        let token = manager.mint("user-123").unwrap();

        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.user_id.as_deref(), Some("user-123"));
    }

    #[test]
    fn expiry_is_ttl_after_issued_at() {
        let manager = manager();
        let token = manager.mint("user-123").unwrap();

        let claims = TokenManager::decode_unverified(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn explicit_ttl_is_honored() {
        let manager = manager();
        let token = manager.mint_with_ttl("user-123", 300).unwrap();

        let claims = TokenManager::decode_unverified(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn each_mint_is_independent() {
        let manager = manager();
        let first = manager.mint("user-123").unwrap();
        let second = manager.mint("user-123").unwrap();

        let first_jti = TokenManager::decode_unverified(&first).unwrap().jti;
        let second_jti = TokenManager::decode_unverified(&second).unwrap().jti;
        assert_ne!(first_jti, second_jti);
    }

    #[test]
    fn missing_secret_fails_closed() {
        let manager = TokenManager::from_secret("", 60);

        let err = manager.mint("user-123").unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));

        let err = manager.verify("whatever").unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
    }

    #[test]
    fn empty_user_id_is_rejected() {
        let err = manager().mint("").unwrap_err();
        assert!(matches!(err, RelayError::Internal { .. }));
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = TokenManager::from_secret("test-secret-key-for-relay-testing", -120);
        let token = manager.mint("user-123").unwrap();

        let err = manager.verify(&token).unwrap_err();
        assert!(matches!(err, RelayError::InvalidToken { .. }));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let err = manager().verify("bad.token").unwrap_err();
        assert!(matches!(err, RelayError::InvalidToken { .. }));

        let err = manager().verify("").unwrap_err();
        assert!(matches!(err, RelayError::InvalidToken { .. }));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = manager().mint("user-123").unwrap();
        let other = TokenManager::from_secret("a-completely-different-secret", 60);

        let err = other.verify(&token).unwrap_err();
        assert!(matches!(err, RelayError::InvalidToken { .. }));
    }

    #[test]
    fn token_without_subject_is_rejected() {
        // Sign claims with an empty subject directly.
        let claims = ServiceClaims {
            sub: String::new(),
            user_id: None,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 60,
            jti: None,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-relay-testing"),
        )
        .unwrap();

        let err = manager().verify(&token).unwrap_err();
        assert!(matches!(err, RelayError::MissingSubject));
    }
}
