//! Caller identity resolution.
//!
//! Exactly one identity must resolve per request: a first-party session
//! cookie is tried first, then a bearer token from the `Authorization`
//! header. Absence of both is an authentication failure.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::auth::session::SessionManager;
use crate::auth::token::TokenManager;
use crate::error::{RelayError, Result};

/// The authenticated caller of a relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerIdentity {
    /// Resolved from the first-party session cookie.
    Session {
        /// The signed-in user's id.
        user_id: String,
    },
    /// Resolved from a verified `Authorization: Bearer` token.
    Bearer {
        /// The token's subject claim.
        user_id: String,
    },
}

impl CallerIdentity {
    /// The resolved user id. Never empty.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Session { user_id } | Self::Bearer { user_id } => user_id,
        }
    }
}

/// Resolves caller identities from inbound request headers.
#[derive(Clone, Debug)]
pub struct Authenticator {
    sessions: SessionManager,
    tokens: TokenManager,
}

impl Authenticator {
    /// Create an authenticator from the shared session and token managers.
    #[must_use]
    pub fn new(sessions: SessionManager, tokens: TokenManager) -> Self {
        Self { sessions, tokens }
    }

    /// Resolve the caller's identity, session cookie first.
    ///
    /// Guarantees a non-empty user id on success. Fails with
    /// `Unauthorized` when neither credential is usable, `InvalidToken`
    /// when a bearer token fails verification, and `MissingSubject` when
    /// a verified token carries no subject.
    pub fn resolve_identity(&self, headers: &HeaderMap) -> Result<CallerIdentity> {
        if let Some(session) = self.sessions.resolve(headers)? {
            if session.user_id.is_empty() {
                return Err(RelayError::unauthorized());
            }
            return Ok(CallerIdentity::Session {
                user_id: session.user_id,
            });
        }

        let auth_header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(RelayError::unauthorized)?;

        let token = extract_bearer_token(auth_header).ok_or_else(RelayError::unauthorized)?;

        let claims = self.tokens.verify(&token)?;
        Ok(CallerIdentity::Bearer { user_id: claims.sub })
    }

    /// The session manager, for issuing cookies in the sign-in flow.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The header must match the literal `Bearer <token>` scheme with a
/// non-empty token; anything else is rejected.
#[must_use]
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SESSION_COOKIE;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn authenticator() -> Authenticator {
        let tokens = TokenManager::from_secret("test-secret-key-for-relay-testing", 60);
        let sessions = SessionManager::new(tokens.clone(), 300);
        Authenticator::new(sessions, tokens)
    }

    #[rstest]
    #[case("Bearer abc123", Some("abc123"))]
    #[case("Bearer ", None)]
    #[case("Bearer", None)]
    #[case("bearer abc123", None)]
    #[case("Basic dXNlcjpwYXNz", None)]
    #[case("", None)]
    fn bearer_extraction(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            extract_bearer_token(header),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn session_cookie_wins_over_bearer() {
        let auth = authenticator();
        let cookie = auth.sessions().issue("cookie-user").unwrap();
        let bearer = auth.tokens.mint("bearer-user").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={cookie}")).unwrap(),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}")).unwrap(),
        );

        let identity = auth.resolve_identity(&headers).unwrap();
        assert_eq!(
            identity,
            CallerIdentity::Session {
                user_id: "cookie-user".to_string()
            }
        );
    }

    #[test]
    fn bearer_fallback_when_no_session() {
        let auth = authenticator();
        let bearer = auth.tokens.mint("bearer-user").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}")).unwrap(),
        );

        let identity = auth.resolve_identity(&headers).unwrap();
        assert_eq!(identity.user_id(), "bearer-user");
        assert!(matches!(identity, CallerIdentity::Bearer { .. }));
    }

    #[test]
    fn no_credentials_is_unauthorized() {
        let auth = authenticator();
        let err = auth.resolve_identity(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, RelayError::Unauthorized { .. }));
    }

    #[test]
    fn malformed_authorization_header_is_unauthorized() {
        let auth = authenticator();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc123"));

        let err = auth.resolve_identity(&headers).unwrap_err();
        assert!(matches!(err, RelayError::Unauthorized { .. }));
    }

    #[test]
    fn bad_bearer_token_is_invalid_token() {
        let auth = authenticator();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bad.token"));

        let err = auth.resolve_identity(&headers).unwrap_err();
        assert!(matches!(err, RelayError::InvalidToken { .. }));
    }

    #[test]
    fn invalid_session_cookie_falls_back_to_bearer() {
        let auth = authenticator();
        let bearer = auth.tokens.mint("bearer-user").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}=garbage")).unwrap(),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}")).unwrap(),
        );

        let identity = auth.resolve_identity(&headers).unwrap();
        assert_eq!(identity.user_id(), "bearer-user");
    }
}
