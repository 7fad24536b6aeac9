//! Session proofs: sealing an event log and re-checking it later.
//!
//! Sealing runs canonicalize → digest → sign. Verification re-runs the first
//! two steps and then performs two independent checks, in order:
//! 1. The recomputed digest equals the stored `data_hash` (data integrity)
//! 2. The stored signature verifies over that digest (authenticity)
//!
//! Neither check ever returns an error for a cryptographic mismatch; the
//! outcome is data.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::canonical::document_digest;
use crate::crypto::{Ed25519PublicKey, Keypair, SignatureCheck};
use crate::error::CoreError;
use crate::event::Event;
use crate::session::{FormatVersion, Seal, Session};

/// Message reported for a successful verification.
pub const MSG_VERIFIED: &str = "Verification successful.";
/// Message reported when there is nothing to check.
pub const MSG_UNVERIFIABLE: &str = "No signature or data hash found.";
/// Message reported when stored events no longer match the stored hash.
pub const MSG_INTEGRITY: &str = "Data hash mismatch, data may have been tampered with.";
/// Message reported when the hash matches but the signature does not.
pub const MSG_SIGNATURE: &str = "Signature verification failed.";

/// Why a signature check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureFault {
    /// The stored signature could not be decoded.
    Malformed(String),
    /// The signature is well-formed but not valid for the digest.
    Mismatch,
}

/// Result of verifying a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Digest matched and signature verified.
    Verified,
    /// No hash or signature recorded; nothing to check.
    Unverifiable,
    /// Recomputed digest differs from the stored one.
    IntegrityFailure { stored: String, recomputed: String },
    /// Digest matched but the signature check failed.
    SignatureFailure(SignatureFault),
}

impl VerificationOutcome {
    /// Whether both checks passed.
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }

    /// Human-readable message for the outcome.
    pub fn message(&self) -> String {
        match self {
            VerificationOutcome::Verified => MSG_VERIFIED.to_string(),
            VerificationOutcome::Unverifiable => MSG_UNVERIFIABLE.to_string(),
            VerificationOutcome::IntegrityFailure { .. } => MSG_INTEGRITY.to_string(),
            VerificationOutcome::SignatureFailure(SignatureFault::Mismatch) => {
                MSG_SIGNATURE.to_string()
            }
            VerificationOutcome::SignatureFailure(SignatureFault::Malformed(reason)) => {
                format!("{} Malformed signature: {}", MSG_SIGNATURE, reason)
            }
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Seal an event log, already in canonical order.
pub fn seal_events(
    format: FormatVersion,
    events: &[Event],
    keypair: &Keypair,
    finalized_at: DateTime<Utc>,
) -> Result<Seal, CoreError> {
    let digest = document_digest(format, events)?;
    let signature = keypair.sign_digest(&digest);

    Ok(Seal {
        format,
        data_hash: digest.to_hex(),
        signature: signature.to_base64(),
        finalized_at,
    })
}

/// Verify a session against its events, already in canonical order.
///
/// Sessions with a hash but no recorded format are checked as
/// [`FormatVersion::LEGACY`].
pub fn verify_session(
    session: &Session,
    events: &[Event],
    public_key: &Ed25519PublicKey,
) -> Result<VerificationOutcome, CoreError> {
    let (stored_hash, stored_signature) = match (&session.data_hash, &session.signature) {
        (Some(hash), Some(signature)) => (hash, signature),
        _ => return Ok(VerificationOutcome::Unverifiable),
    };

    let format = session.format.unwrap_or(FormatVersion::LEGACY);
    let recomputed = document_digest(format, events)?;
    let recomputed_hex = recomputed.to_hex();

    if &recomputed_hex != stored_hash {
        return Ok(VerificationOutcome::IntegrityFailure {
            stored: stored_hash.clone(),
            recomputed: recomputed_hex,
        });
    }

    let outcome = match public_key.check_encoded(&recomputed, stored_signature) {
        SignatureCheck::Valid => VerificationOutcome::Verified,
        SignatureCheck::Malformed(reason) => {
            VerificationOutcome::SignatureFailure(SignatureFault::Malformed(reason))
        }
        SignatureCheck::Mismatch => VerificationOutcome::SignatureFailure(SignatureFault::Mismatch),
    };
    Ok(outcome)
}
