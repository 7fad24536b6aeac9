//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use provenance_core::{sort_canonical, Event, PendingEvent, Seal, Session, SessionId};

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, SealResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Last assigned session ID.
    last_id: u64,

    /// Sessions indexed by ID.
    sessions: HashMap<SessionId, StoredSession>,
}

struct StoredSession {
    session: Session,
    /// Events in insertion order.
    events: Vec<Event>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                last_id: 0,
                sessions: HashMap::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Mutate a session's stored events directly, bypassing every lifecycle
    /// guard, as an out-of-band writer to the backing store would.
    ///
    /// Returns `false` if the session does not exist.
    pub fn tamper_events(&self, id: SessionId, f: impl FnOnce(&mut Vec<Event>)) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(match inner.sessions.get_mut(&id) {
            Some(stored) => {
                f(&mut stored.events);
                true
            }
            None => false,
        })
    }

    /// Mutate a stored session record directly, bypassing every lifecycle guard.
    ///
    /// Returns `false` if the session does not exist.
    pub fn tamper_session(&self, id: SessionId, f: impl FnOnce(&mut Session)) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(match inner.sessions.get_mut(&id) {
            Some(stored) => {
                f(&mut stored.session);
                true
            }
            None => false,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_session(&self, started_at: DateTime<Utc>) -> Result<Session> {
        let mut inner = self.write()?;

        inner.last_id += 1;
        let id = SessionId::new(inner.last_id);
        let session = Session::new(id, started_at);

        inner.sessions.insert(
            id,
            StoredSession {
                session: session.clone(),
                events: Vec::new(),
            },
        );

        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        let inner = self.read()?;
        Ok(inner.sessions.get(&id).map(|s| s.session.clone()))
    }

    async fn seal_session(&self, id: SessionId, seal: &Seal) -> Result<SealResult> {
        let mut inner = self.write()?;

        let Some(stored) = inner.sessions.get_mut(&id) else {
            return Ok(SealResult::NotFound);
        };
        if stored.session.finalized {
            return Ok(SealResult::AlreadyFinalized);
        }

        stored.session.apply_seal(seal);
        Ok(SealResult::Sealed)
    }

    async fn append_events(&self, id: SessionId, events: &[PendingEvent]) -> Result<AppendResult> {
        let mut inner = self.write()?;

        let Some(stored) = inner.sessions.get_mut(&id) else {
            return Ok(AppendResult::NotFound);
        };
        if stored.session.finalized {
            return Ok(AppendResult::Finalized);
        }

        let first_seq = stored.events.last().map_or(1, |e| e.seq + 1);
        for (offset, pending) in events.iter().enumerate() {
            stored.events.push(Event {
                seq: first_seq + offset as u64,
                character: pending.character,
                timestamp: pending.timestamp,
            });
        }

        Ok(AppendResult::Appended {
            first_seq,
            count: events.len(),
        })
    }

    async fn get_events(&self, id: SessionId) -> Result<Vec<Event>> {
        let inner = self.read()?;

        let mut events = inner
            .sessions
            .get(&id)
            .map(|s| s.events.clone())
            .unwrap_or_default();
        sort_canonical(&mut events);

        Ok(events)
    }

    async fn count_events(&self, id: SessionId) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.sessions.get(&id).map_or(0, |s| s.events.len() as u64))
    }

    async fn last_event_timestamp(&self, id: SessionId) -> Result<Option<DateTime<Utc>>> {
        let inner = self.read()?;
        Ok(inner
            .sessions
            .get(&id)
            .and_then(|s| s.events.iter().map(|e| e.timestamp).max()))
    }
}
