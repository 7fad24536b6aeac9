//! Store trait: the abstract interface for session persistence.
//!
//! This trait allows the kernel to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use provenance_core::{Event, PendingEvent, Seal, Session, SessionId};

use crate::error::Result;

/// Result of appending a batch of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// Every event in the batch was appended.
    Appended {
        /// `seq` assigned to the first event of the batch.
        first_seq: u64,
        /// Number of events appended.
        count: usize,
    },
    /// The session does not exist. Nothing was written.
    NotFound,
    /// The session is finalized. Nothing was written.
    Finalized,
}

/// Result of sealing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealResult {
    /// Seal written and session marked finalized.
    Sealed,
    /// The session does not exist.
    NotFound,
    /// The session was already finalized. Existing seal left untouched.
    AlreadyFinalized,
}

/// The Store trait: async interface for session persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Guarded writes**: `append_events` and `seal_session` re-check the
///   finalized flag inside their own atomic unit, so the lifecycle invariant
///   holds even with several writers over one database.
/// - **All-or-nothing appends**: a batch is written completely or not at all.
/// - **Stable order**: events are returned ordered by `(timestamp, seq)`.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Session Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new open session with no events.
    async fn create_session(&self, started_at: DateTime<Utc>) -> Result<Session>;

    /// Get a session by ID.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>>;

    /// Atomically record the seal and mark the session finalized.
    async fn seal_session(&self, id: SessionId, seal: &Seal) -> Result<SealResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Event Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append events to an open session, assigning consecutive `seq` values.
    async fn append_events(&self, id: SessionId, events: &[PendingEvent]) -> Result<AppendResult>;

    /// Get all events of a session in canonical order.
    async fn get_events(&self, id: SessionId) -> Result<Vec<Event>>;

    /// Number of events recorded for a session.
    async fn count_events(&self, id: SessionId) -> Result<u64>;

    /// Timestamp of the latest event, if any.
    async fn last_event_timestamp(&self, id: SessionId) -> Result<Option<DateTime<Utc>>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Load a session together with its events in canonical order.
    fn load_session(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<(Session, Vec<Event>)>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn load_session(&self, id: SessionId) -> Result<Option<(Session, Vec<Event>)>> {
        let Some(session) = self.get_session(id).await? else {
            return Ok(None);
        };
        let events = self.get_events(id).await?;
        Ok(Some((session, events)))
    }
}
