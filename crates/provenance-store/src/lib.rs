//! # Provenance Store
//!
//! Storage abstraction for Provenance. Provides a trait-based interface
//! for session and event persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`Store`] trait,
//! allowing the kernel to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AppendResult`] - Result of appending a batch of events
//! - [`SealResult`] - Result of sealing a session
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provenance_store::{SqliteStore, Store};
//!
//! async fn example() -> provenance_store::Result<()> {
//!     let store = SqliteStore::open("provenance.db")?;
//!     let session = store.create_session(chrono::Utc::now()).await?;
//!     println!("started session {}", session.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once seals**: sealing an already finalized session returns
//!   `AlreadyFinalized` and leaves the stored proof untouched
//! - **Guarded appends**: appends to finalized sessions return `Finalized`
//! - **Insertion order**: every event gets a per-session `seq` used to break
//!   timestamp ties

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AppendResult, SealResult, Store, StoreExt};
