//! # Request relay
//!
//! The core of the service: authenticate the caller, mint a short-lived
//! service token, forward the request to the internal backend and return
//! a normalized response.
//!
//! Per request the flow is strictly sequential with no retry edges:
//! identity resolved, token minted, one forward attempt, then either the
//! backend response or an error is returned.

use std::sync::Arc;

use axum::http::{HeaderMap, Method, header::CONTENT_TYPE};
use bytes::Bytes;
use serde_json::{Value, json};
use url::Url;

use crate::auth::{Authenticator, SessionManager, TokenManager};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// Backend collection a relay request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCollection {
    /// `/api/{user_id}/tasks`
    Tasks,
    /// `/api/{user_id}/conversations`
    Conversations,
}

impl BackendCollection {
    /// Path segment for this collection.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Conversations => "conversations",
        }
    }
}

/// A fully constructed outbound request. Built fresh per inbound request
/// and never mutated after construction; the inbound `Authorization`
/// header is never carried over.
#[derive(Debug)]
pub struct RelayRequest {
    /// HTTP method, forwarded from the inbound request.
    pub method: Method,
    /// Resolved backend URL with the user id substituted in.
    pub url: String,
    /// JSON body forwarded verbatim, for non-GET requests.
    pub body: Option<Value>,
}

impl RelayRequest {
    /// Build the outbound request from the path template
    /// `{base}/api/{user_id}/{collection}`.
    #[must_use]
    pub fn new(
        base_url: &str,
        collection: BackendCollection,
        user_id: &str,
        method: Method,
        body: Option<Value>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            method,
            url: format!("{base}/api/{user_id}/{}", collection.as_str()),
            body,
        }
    }
}

/// The backend's answer to a successful relay: status and JSON body,
/// passed through to the caller unchanged.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    /// Backend status code.
    pub status: u16,
    /// Backend JSON body.
    pub body: Value,
}

/// Authenticates callers and relays their requests to the backend.
///
/// Stateless across requests: tokens are never cached, and the only
/// shared resource is the HTTP client's connection pool.
#[derive(Debug)]
pub struct AuthRelay {
    auth: Authenticator,
    tokens: TokenManager,
    client: reqwest::Client,
    backend_base_url: String,
}

impl AuthRelay {
    /// Build the relay from its configuration.
    ///
    /// Validates the backend base URL up front so a malformed value fails
    /// at startup rather than on the first request.
    pub fn new(config: &Arc<RelayConfig>) -> Result<Self> {
        Url::parse(&config.backend_base_url).map_err(|e| RelayError::Config {
            message: format!("invalid BACKEND_API_URL '{}'", config.backend_base_url),
            source: Some(e.into()),
        })?;

        let tokens = TokenManager::new(config);
        let sessions = SessionManager::new(tokens.clone(), config.session_cache_ttl_secs);
        let auth = Authenticator::new(sessions, tokens.clone());

        Ok(Self {
            auth,
            tokens,
            client: reqwest::Client::new(),
            backend_base_url: config.backend_base_url.clone(),
        })
    }

    /// Handle one inbound request end to end.
    ///
    /// Resolves the caller's identity, parses the forwarded body (when
    /// present), and performs the single forward attempt. Every failure
    /// comes back as a [`RelayError`] for the transport layer to map.
    pub async fn handle(
        &self,
        headers: &HeaderMap,
        collection: BackendCollection,
        method: Method,
        body: Option<Bytes>,
    ) -> Result<RelayResponse> {
        let identity = self.auth.resolve_identity(headers)?;

        let payload = match body {
            Some(raw) => Some(serde_json::from_slice(&raw).map_err(|e| {
                RelayError::internal_with_source("request body is not valid JSON", e)
            })?),
            None => None,
        };

        self.forward(collection, method, identity.user_id(), payload)
            .await
    }

    /// Forward a request to the backend on behalf of `user_id`.
    ///
    /// Mints a fresh service token, performs exactly one attempt with no
    /// retries and no timeout override, and normalizes non-success and
    /// transport failures per the error taxonomy.
    pub async fn forward(
        &self,
        collection: BackendCollection,
        method: Method,
        user_id: &str,
        payload: Option<Value>,
    ) -> Result<RelayResponse> {
        let service_token = self.tokens.mint(user_id)?;
        let request = RelayRequest::new(
            &self.backend_base_url,
            collection,
            user_id,
            method,
            payload,
        );

        tracing::debug!(method = %request.method, url = %request.url, "forwarding to backend");

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(&service_token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let message = e.to_string();
            RelayError::transport_with_source(message, e)
        })?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await.map_err(|e| {
                RelayError::internal_with_source("backend returned a non-JSON success body", e)
            })?;
            return Ok(RelayResponse {
                status: status.as_u16(),
                body,
            });
        }

        // Best-effort normalization: keep the backend's JSON error shape
        // when it parses, otherwise wrap the raw text.
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or_else(|_| {
            json!({ "error": "Backend request failed", "details": text })
        });

        Err(RelayError::backend(status.as_u16(), body))
    }

    /// The authenticator, exposed for the sign-in flow and tests.
    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }
}
