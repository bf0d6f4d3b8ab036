//! # Task Relay
//!
//! Session-to-service-token exchange and request relay for the task/chat
//! backend. Each inbound request is authenticated (first-party session
//! cookie or bearer token), a short-lived service JWT is minted for the
//! user, and the request is forwarded to the internal backend scoped to
//! that user. Responses and failures come back as normalized JSON.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod server;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use relay::{AuthRelay, BackendCollection, RelayRequest, RelayResponse};
pub use server::{AppState, router};
