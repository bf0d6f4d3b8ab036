//! # Relay configuration
//!
//! All environment-derived settings are resolved once at startup into a
//! [`RelayConfig`] and injected into the relay at construction. Nothing
//! reads ambient environment state inside request handling.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Default backend base URL when `BACKEND_API_URL` is unset.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
/// Default service token lifetime in seconds.
pub const DEFAULT_SERVICE_TOKEN_TTL_SECS: i64 = 60;
/// Default session cookie cache lifetime in seconds.
pub const DEFAULT_SESSION_CACHE_TTL_SECS: i64 = 300;
/// Default listen address for the relay server.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Application configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Shared secret used to sign service tokens and verify inbound
    /// credentials (`BETTER_AUTH_SECRET`). Required and never logged.
    pub signing_secret: String,
    /// Base URL of the internal task/chat backend (`BACKEND_API_URL`).
    pub backend_base_url: String,
    /// Lifetime of minted service tokens in seconds
    /// (`SERVICE_TOKEN_TTL_SECS`). Short by design to bound leak exposure.
    pub service_token_ttl_secs: i64,
    /// Lifetime of the cached session cookie in seconds
    /// (`SESSION_CACHE_TTL_SECS`).
    pub session_cache_ttl_secs: i64,
    /// Address the relay server binds to (`LISTEN_ADDR`).
    pub listen_addr: String,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    ///
    /// Fails closed when the signing secret is absent or empty; that is a
    /// fatal configuration error, not a retryable condition.
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Split out of [`from_env`](Self::from_env) so tests can supply
    /// settings without mutating process-wide environment state.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_secret = lookup("BETTER_AUTH_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| RelayError::config("BETTER_AUTH_SECRET is not set"))?;

        let backend_base_url =
            lookup("BACKEND_API_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let service_token_ttl_secs = parse_ttl(
            lookup("SERVICE_TOKEN_TTL_SECS"),
            "SERVICE_TOKEN_TTL_SECS",
            DEFAULT_SERVICE_TOKEN_TTL_SECS,
        )?;
        let session_cache_ttl_secs = parse_ttl(
            lookup("SESSION_CACHE_TTL_SECS"),
            "SESSION_CACHE_TTL_SECS",
            DEFAULT_SESSION_CACHE_TTL_SECS,
        )?;

        let listen_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        Ok(Self {
            signing_secret,
            backend_base_url,
            service_token_ttl_secs,
            session_cache_ttl_secs,
            listen_addr,
        })
    }
}

/// Parse an optional TTL override, rejecting non-numeric and non-positive
/// values instead of silently falling back.
fn parse_ttl(raw: Option<String>, key: &str, default: i64) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let ttl: i64 = raw
        .parse()
        .map_err(|_| RelayError::config(format!("{key} must be an integer, got '{raw}'")))?;
    if ttl <= 0 {
        return Err(RelayError::config(format!(
            "{key} must be positive, got {ttl}"
        )));
    }
    Ok(ttl)
}
