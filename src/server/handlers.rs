//! Route handlers for the relay API.
//!
//! Handlers are thin: each one hands the inbound headers, method and raw
//! body to [`crate::relay::AuthRelay::handle`] and maps the result to an
//! HTTP response.
//! Bodies are taken as raw bytes so that a malformed payload still gets a
//! JSON error response instead of the framework's plain-text rejection.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Value, json};

use crate::relay::BackendCollection;
use crate::server::AppState;

/// Liveness probe. No authentication.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "task-relay" }))
}

/// `GET /api/tasks`
pub async fn list_tasks(State(state): State<AppState>, headers: HeaderMap) -> Response {
    relay(&state, &headers, BackendCollection::Tasks, Method::GET, None).await
}

/// `POST /api/tasks`
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    relay(
        &state,
        &headers,
        BackendCollection::Tasks,
        Method::POST,
        Some(body),
    )
    .await
}

/// `GET /api/chat` (conversations)
pub async fn list_conversations(State(state): State<AppState>, headers: HeaderMap) -> Response {
    relay(
        &state,
        &headers,
        BackendCollection::Conversations,
        Method::GET,
        None,
    )
    .await
}

/// `POST /api/chat` (conversations)
pub async fn create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    relay(
        &state,
        &headers,
        BackendCollection::Conversations,
        Method::POST,
        Some(body),
    )
    .await
}

/// Run the relay and convert the outcome to an HTTP response.
///
/// Success passes the backend's status and body through unchanged;
/// failures are logged (server-side ones with their source at error
/// level) and mapped by the [`crate::error::RelayError`] response
/// conversion.
async fn relay(
    state: &AppState,
    headers: &HeaderMap,
    collection: BackendCollection,
    method: Method,
    body: Option<Bytes>,
) -> Response {
    match state.relay.handle(headers, collection, method, body).await {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
            (status, Json(response.body)).into_response()
        }
        Err(err) => {
            if err.is_server_error() {
                tracing::error!(error = ?err, collection = collection.as_str(), "relay request failed");
            } else {
                tracing::debug!(error = %err, collection = collection.as_str(), "request rejected");
            }
            err.into_response()
        }
    }
}
