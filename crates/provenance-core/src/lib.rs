//! # Provenance Core
//!
//! Pure primitives for Provenance: events, sessions, canonicalization,
//! digests and signatures.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the session proof.
//!
//! ## Key Types
//!
//! - [`Event`] - A timestamped character recorded against a session
//! - [`Session`] - The unit of provenance, open until finalized
//! - [`FormatVersion`] - Binds the canonical document to a digest and signature scheme
//! - [`VerificationOutcome`] - Result of re-checking a finalized session
//!
//! ## Canonicalization
//!
//! Event logs are encoded as compact JSON with a fixed field order and fixed
//! timestamp precision. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod digest;
pub mod error;
pub mod event;
pub mod proof;
pub mod session;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_timestamp, document_digest};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, SignatureCheck};
pub use digest::{Digest, DigestAlgorithm};
pub use error::CoreError;
pub use event::{sort_canonical, Event, PendingEvent};
pub use proof::{seal_events, verify_session, SignatureFault, VerificationOutcome};
pub use session::{FormatVersion, Seal, Session, SessionState};
pub use types::{Character, SessionId};
pub use validation::{parse_batch, DEFAULT_MAX_EVENTS_PER_APPEND};
