//! Error types for the Kernel.

use provenance_core::{CoreError, SessionId};
use provenance_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
///
/// Failed verification is not an error; see
/// [`VerificationOutcome`](provenance_core::VerificationOutcome).
#[derive(Debug, Error)]
pub enum KernelError {
    /// Session not found.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session is finalized and accepts no further changes.
    #[error("session {0} is already finalized")]
    AlreadyFinalized(SessionId),

    /// Rejected input (bad character, oversize batch).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Canonicalization or encoding failure.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
