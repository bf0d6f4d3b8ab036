//! First-party session cookie resolution.
//!
//! The auth provider caches the signed-in session as a signed JWT in a
//! first-party cookie with a short cache lifetime (5 minutes by default).
//! The relay only needs to verify that cookie and read the user id; it
//! never creates browser sessions itself.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

use crate::auth::token::TokenManager;
use crate::error::{RelayError, Result};

/// Name of the session cache cookie set by the auth provider on sign-in.
pub const SESSION_COOKIE: &str = "task_relay.session_token";

/// Identity resolved from a first-party session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// The signed-in user's id.
    pub user_id: String,
}

/// Verifies session cookies against the shared signing secret.
#[derive(Clone, Debug)]
pub struct SessionManager {
    tokens: TokenManager,
    cache_ttl_secs: i64,
}

impl SessionManager {
    /// Create a session manager sharing the relay's token manager.
    #[must_use]
    pub fn new(tokens: TokenManager, cache_ttl_secs: i64) -> Self {
        Self {
            tokens,
            cache_ttl_secs,
        }
    }

    /// Resolve a session identity from the request headers, if any.
    ///
    /// A missing, malformed or expired cookie yields `Ok(None)` so the
    /// caller can fall back to bearer authentication. Configuration
    /// failures (no signing secret) propagate instead of being swallowed.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<Option<SessionIdentity>> {
        let Some(cookie_value) = session_cookie_value(headers) else {
            return Ok(None);
        };

        match self.tokens.verify(&cookie_value) {
            Ok(claims) => Ok(Some(SessionIdentity {
                user_id: claims.sub,
            })),
            Err(err @ RelayError::Config { .. }) => Err(err),
            Err(_) => Ok(None),
        }
    }

    /// Issue a fresh session cookie value for `user_id`.
    ///
    /// This is the cookie-cache refresh path of the sign-in flow; the
    /// cookie lifetime is the configured session cache TTL, not the
    /// service token TTL.
    pub fn issue(&self, user_id: &str) -> Result<String> {
        self.tokens.mint_with_ttl(user_id, self.cache_ttl_secs)
    }
}

/// Extract the session cookie value from the `Cookie` headers.
fn session_cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn manager() -> SessionManager {
        let tokens = TokenManager::from_secret("test-secret-key-for-relay-testing", 60);
        SessionManager::new(tokens, 300)
    }

    fn headers_with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    #[test]
    fn valid_cookie_resolves_to_session_identity() {
        let manager = manager();
        let cookie = manager.issue("user-123").unwrap();
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE}={cookie}"));

        let identity = manager.resolve(&headers).unwrap().unwrap();
        assert_eq!(identity.user_id, "user-123");
    }

    #[test]
    fn cookie_is_found_among_others() {
        let manager = manager();
        let cookie = manager.issue("user-123").unwrap();
        let headers = headers_with_cookie(&format!(
            "theme=dark; {SESSION_COOKIE}={cookie}; locale=en"
        ));

        let identity = manager.resolve(&headers).unwrap().unwrap();
        assert_eq!(identity.user_id, "user-123");
    }

    #[test]
    fn missing_cookie_resolves_to_none() {
        let manager = manager();
        assert!(manager.resolve(&HeaderMap::new()).unwrap().is_none());

        let headers = headers_with_cookie("theme=dark");
        assert!(manager.resolve(&headers).unwrap().is_none());
    }

    #[test]
    fn tampered_cookie_resolves_to_none() {
        let manager = manager();
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE}=not.a.jwt"));
        assert!(manager.resolve(&headers).unwrap().is_none());
    }

    #[test]
    fn cookie_signed_with_other_secret_resolves_to_none() {
        let manager = manager();
        let other = SessionManager::new(
            TokenManager::from_secret("a-completely-different-secret", 60),
            300,
        );
        let cookie = other.issue("user-123").unwrap();
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE}={cookie}"));

        assert!(manager.resolve(&headers).unwrap().is_none());
    }

    #[test]
    fn session_cookie_uses_cache_ttl() {
        let manager = manager();
        let cookie = manager.issue("user-123").unwrap();

        let claims = TokenManager::decode_unverified(&cookie).unwrap();
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn missing_secret_propagates_as_config_error() {
        let manager = SessionManager::new(TokenManager::from_secret("", 60), 300);
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE}=some.cookie.value"));

        let err = manager.resolve(&headers).unwrap_err();
        assert!(matches!(err, RelayError::Config { .. }));
    }
}
