//! Error types for Provenance Core.

use thiserror::Error;

/// Core errors that can occur while building or checking a session proof.
///
/// Cryptographic mismatches are never reported here; they are verification
/// outcomes (see [`crate::proof::VerificationOutcome`]).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid character: {0}")]
    InvalidCharacter(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("unsupported format version: {0}")]
    UnsupportedFormat(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("batch of {got} events exceeds the limit of {max}")]
    BatchTooLarge { got: usize, max: usize },
}
