//! # Provenance Server
//!
//! HTTP surface for the Provenance kernel. Browser clients start a session,
//! stream captured characters into it, finalize it, and anyone can later ask
//! whether the sealed record still verifies.
//!
//! The router is generic over the store so tests can drive it with an
//! in-memory backend; the binary always uses SQLite.

pub mod config;
pub mod error;
pub mod routes;

pub use config::Args;
pub use error::ApiError;
pub use routes::{router, AppState};
