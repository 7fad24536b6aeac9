//! # Provenance
//!
//! Tamper-evident records of typed input. Characters are captured into a
//! session with timestamps; finalizing the session seals its event log with
//! a digest and an Ed25519 signature, and anyone holding the public key can
//! later check that the log is unchanged.
//!
//! ## Overview
//!
//! - **Sessions**: start open, accept events, and are finalized exactly once
//! - **Seals**: canonical JSON document → digest → signature, stored atomically
//! - **Verification**: re-derives the digest and checks the signature,
//!   reporting integrity and signature failures separately
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provenance::{Kernel, KernelConfig, SigningKeys};
//! use provenance::store::SqliteStore;
//!
//! async fn example() -> provenance::Result<()> {
//!     let keys = SigningKeys::generate();
//!     let store = SqliteStore::open("provenance.db")?;
//!     let kernel = Kernel::new(keys, store, KernelConfig::default());
//!
//!     let id = kernel.start().await?;
//!     kernel.append_text(id, &["h", "i"]).await?;
//!     kernel.finalize(id).await?;
//!
//!     let outcome = kernel.verify(id).await?;
//!     assert!(outcome.is_verified());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `provenance::core` - Pure primitives (events, canonical form, crypto)
//! - `provenance::store` - Storage abstraction and SQLite

pub mod clock;
pub mod error;
pub mod kernel;
pub mod keys;

// Re-export component crates
pub use provenance_core as core;
pub use provenance_store as store;

// Re-export main types for convenience
pub use clock::{Clock, SystemClock};
pub use error::{KernelError, Result};
pub use kernel::{Kernel, KernelConfig, SessionStatus};
pub use keys::{KeyError, SigningKeys};

// Re-export commonly used core types
pub use provenance_core::{
    Character, Ed25519PublicKey, FormatVersion, SessionId, SessionState, VerificationOutcome,
};
