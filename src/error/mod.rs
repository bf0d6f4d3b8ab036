//! The unified error handling system for the relay.
//!
//! Every failure is converted to a JSON error response at the request
//! boundary; no error ever escapes as a panic or a non-JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// A unified `Result` type for the entire application.
///
/// All functions that can fail should return this type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay error taxonomy.
///
/// Client-caused failures (missing or bad credentials) map to 4xx status
/// codes; server-side failures (configuration, transport) map to generic
/// 5xx bodies that never expose internal detail.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No session cookie and no usable `Authorization: Bearer` header.
    #[error("unauthorized: {message}")]
    Unauthorized {
        message: String,
    },

    /// A bearer token was supplied but failed signature or expiry checks.
    #[error("invalid token: {message}")]
    InvalidToken {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A bearer token verified but carries no subject claim.
    #[error("token subject missing")]
    MissingSubject,

    /// Server-side configuration failure, e.g. the signing secret is absent.
    /// Fatal and non-retryable; surfaced to callers as a generic 500.
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The backend answered with a non-success status. The status and the
    /// normalized body are passed through to the caller unchanged.
    #[error("backend returned status {status}")]
    Backend {
        status: u16,
        body: serde_json::Value,
    },

    /// The outbound call failed before a response arrived (connection
    /// refused, DNS failure, ...).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Anything else that went wrong inside the relay.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RelayError {
    /// Authentication failure with the standard caller hint.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            message: "Please provide valid session cookie or Bearer token".to_string(),
        }
    }

    /// Token verification failure.
    pub fn invalid_token<T: Into<String>>(message: T) -> Self {
        Self::InvalidToken {
            message: message.into(),
            source: None,
        }
    }

    /// Token verification failure with the underlying error attached.
    pub fn invalid_token_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::InvalidToken {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Configuration failure.
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Backend failure carrying the passthrough status and body.
    #[must_use]
    pub fn backend(status: u16, body: serde_json::Value) -> Self {
        Self::Backend { status, body }
    }

    /// Transport failure with the underlying error attached.
    pub fn transport_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Internal failure.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Internal failure with the underlying error attached.
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this failure was caused by the server rather than the caller.
    ///
    /// Server-side failures are logged at error level with their source;
    /// client failures only at debug.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Transport { .. } | Self::Internal { .. }
        )
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Unauthorized { message } => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthorized", "hint": message }),
            ),
            Self::InvalidToken { message, .. } => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid or expired token", "message": message }),
            ),
            Self::MissingSubject => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "User ID not found in token" }),
            ),
            Self::Config { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Server misconfiguration" }),
            ),
            Self::Backend { status, body } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            ),
            Self::Transport { message, .. } | Self::Internal { message, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "message": message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
