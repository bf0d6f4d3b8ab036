//! # HTTP transport layer
//!
//! The axum router and shared application state. All request semantics
//! live in [`crate::relay`]; this module only wires routes, CORS and
//! request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::relay::AuthRelay;

pub mod handlers;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// The relay, shared across requests. Holds no per-request state.
    pub relay: Arc<AuthRelay>,
}

/// Build the relay router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/chat",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
