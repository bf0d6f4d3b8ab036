//! # Authentication
//!
//! Resolves caller identities (session cookie or bearer token) and mints
//! the short-lived service tokens presented to the internal backend.

pub mod identity;
pub mod session;
pub mod token;

pub use identity::{Authenticator, CallerIdentity, extract_bearer_token};
pub use session::{SESSION_COOKIE, SessionIdentity, SessionManager};
pub use token::{ServiceClaims, TokenManager};
