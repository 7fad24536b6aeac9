//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Provenance. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use provenance_core::{Character, Event, FormatVersion, PendingEvent, Seal, Session, SessionId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AppendResult, SealResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and missing parent directories) and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the raw connection, bypassing every guard the
    /// Store methods enforce.
    ///
    /// Intended for maintenance and for tests that simulate out-of-band edits.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.blocking(f).await
    }

    /// Execute a blocking operation on the connection.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw session row, before validation.
struct SessionRow {
    id: i64,
    started_at: i64,
    finalized: bool,
    format: Option<String>,
    data_hash: Option<String>,
    signature: Option<String>,
    finalized_at: Option<i64>,
}

const SESSION_COLUMNS: &str =
    "id, started_at, finalized, format, data_hash, signature, finalized_at";

fn read_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get("id")?,
        started_at: row.get("started_at")?,
        finalized: row.get("finalized")?,
        format: row.get("format")?,
        data_hash: row.get("data_hash")?,
        signature: row.get("signature")?,
        finalized_at: row.get("finalized_at")?,
    })
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let format = row
            .format
            .as_deref()
            .map(str::parse::<FormatVersion>)
            .transpose()
            .map_err(|e| StoreError::InvalidData(format!("session {}: {}", row.id, e)))?;

        Ok(Session {
            id: SessionId::new(to_u64(row.id, "session id")?),
            started_at: to_timestamp(row.started_at)?,
            finalized: row.finalized,
            format,
            data_hash: row.data_hash,
            signature: row.signature,
            finalized_at: row.finalized_at.map(to_timestamp).transpose()?,
        })
    }
}

/// Raw event row, before validation.
struct EventRow {
    seq: i64,
    character: String,
    timestamp: i64,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self> {
        let character = Character::parse(&row.character)
            .map_err(|e| StoreError::InvalidData(format!("event {}: {}", row.seq, e)))?;

        Ok(Event {
            seq: to_u64(row.seq, "event seq")?,
            character,
            timestamp: to_timestamp(row.timestamp)?,
        })
    }
}

fn to_timestamp(micros: i64) -> Result<DateTime<Utc>> {
    provenance_core::event::from_unix_micros(micros)
        .ok_or_else(|| StoreError::InvalidData(format!("timestamp out of range: {}", micros)))
}

fn to_u64(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative {}: {}", what, value)))
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("value out of range: {}", value)))
}

fn session_exists(conn: &Connection, id: i64) -> Result<Option<bool>> {
    Ok(conn
        .query_row(
            "SELECT finalized FROM sessions WHERE id = ?1",
            params![id],
            |row| row.get::<_, bool>(0),
        )
        .optional()?)
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_session(&self, started_at: DateTime<Utc>) -> Result<Session> {
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO sessions (started_at, finalized) VALUES (?1, 0)",
                params![started_at.timestamp_micros()],
            )?;
            let id = to_u64(conn.last_insert_rowid(), "session id")?;

            Ok(Session::new(SessionId::new(id), started_at))
        })
        .await
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        let id = to_i64(id.get())?;

        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
                    params![id],
                    read_session_row,
                )
                .optional()?;

            row.map(Session::try_from).transpose()
        })
        .await
    }

    async fn seal_session(&self, id: SessionId, seal: &Seal) -> Result<SealResult> {
        let id = to_i64(id.get())?;
        let seal = seal.clone();

        self.blocking(move |conn| {
            // The finalized check lives in the UPDATE itself, so a concurrent
            // finalize can never overwrite an existing seal.
            let updated = conn.execute(
                "UPDATE sessions
                 SET finalized = 1, format = ?2, data_hash = ?3, signature = ?4, finalized_at = ?5
                 WHERE id = ?1 AND finalized = 0",
                params![
                    id,
                    seal.format.as_str(),
                    seal.data_hash,
                    seal.signature,
                    seal.finalized_at.timestamp_micros(),
                ],
            )?;

            if updated == 1 {
                return Ok(SealResult::Sealed);
            }

            match session_exists(conn, id)? {
                Some(_) => Ok(SealResult::AlreadyFinalized),
                None => Ok(SealResult::NotFound),
            }
        })
        .await
    }

    async fn append_events(&self, id: SessionId, events: &[PendingEvent]) -> Result<AppendResult> {
        let id = to_i64(id.get())?;
        let events = events.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            match session_exists(&tx, id)? {
                None => return Ok(AppendResult::NotFound),
                Some(true) => return Ok(AppendResult::Finalized),
                Some(false) => {}
            }

            let last_seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM events WHERE session_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            let first_seq = last_seq + 1;

            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO events (session_id, seq, character, timestamp)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (offset, event) in events.iter().enumerate() {
                    stmt.execute(params![
                        id,
                        first_seq + offset as i64,
                        event.character.to_string(),
                        event.timestamp.timestamp_micros(),
                    ])?;
                }
            }

            tx.commit()?;

            Ok(AppendResult::Appended {
                first_seq: to_u64(first_seq, "event seq")?,
                count: events.len(),
            })
        })
        .await
    }

    async fn get_events(&self, id: SessionId) -> Result<Vec<Event>> {
        let id = to_i64(id.get())?;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT seq, character, timestamp FROM events
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC, seq ASC",
            )?;

            let rows = stmt
                .query_map(params![id], |row| {
                    Ok(EventRow {
                        seq: row.get(0)?,
                        character: row.get(1)?,
                        timestamp: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(Event::try_from).collect()
        })
        .await
    }

    async fn count_events(&self, id: SessionId) -> Result<u64> {
        let id = to_i64(id.get())?;

        self.blocking(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM events WHERE session_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            to_u64(count, "event count")
        })
        .await
    }

    async fn last_event_timestamp(&self, id: SessionId) -> Result<Option<DateTime<Utc>>> {
        let id = to_i64(id.get())?;

        self.blocking(move |conn| {
            let micros: Option<i64> = conn.query_row(
                "SELECT MAX(timestamp) FROM events WHERE session_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            micros.map(to_timestamp).transpose()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_core::event::from_unix_micros;

    fn at(micros: i64) -> DateTime<Utc> {
        from_unix_micros(micros).unwrap()
    }

    fn seal(hash: &str) -> Seal {
        Seal {
            format: FormatVersion::V2,
            data_hash: hash.to_string(),
            signature: "c2ln".to_string(),
            finalized_at: at(500),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let store = SqliteStore::open_memory().unwrap();

        let created = store.create_session(at(1_000)).await.unwrap();
        assert_eq!(created.id, SessionId::new(1));

        let loaded = store.get_session(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(!loaded.finalized);
        assert_eq!(loaded.data_hash, None);

        assert!(store.get_session(SessionId::new(77)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_assigns_consecutive_seq() {
        let store = SqliteStore::open_memory().unwrap();
        let s = store.create_session(at(0)).await.unwrap();

        let first = store
            .append_events(s.id, &[PendingEvent::new('h', at(10)), PendingEvent::new('i', at(10))])
            .await
            .unwrap();
        assert_eq!(first, AppendResult::Appended { first_seq: 1, count: 2 });

        let second = store
            .append_events(s.id, &[PendingEvent::new('é', at(9))])
            .await
            .unwrap();
        assert_eq!(second, AppendResult::Appended { first_seq: 3, count: 1 });

        let empty = store.append_events(s.id, &[]).await.unwrap();
        assert_eq!(empty, AppendResult::Appended { first_seq: 4, count: 0 });

        let events = store.get_events(s.id).await.unwrap();
        let order: Vec<(u64, char)> = events.iter().map(|e| (e.seq, e.character.as_char())).collect();
        assert_eq!(order, vec![(3, 'é'), (1, 'h'), (2, 'i')]);

        assert_eq!(store.count_events(s.id).await.unwrap(), 3);
        assert_eq!(store.last_event_timestamp(s.id).await.unwrap(), Some(at(10)));
    }

    #[tokio::test]
    async fn test_seal_is_write_once() {
        let store = SqliteStore::open_memory().unwrap();
        let s = store.create_session(at(0)).await.unwrap();
        store.append_events(s.id, &[PendingEvent::new('a', at(1))]).await.unwrap();

        assert_eq!(store.seal_session(s.id, &seal("aa")).await.unwrap(), SealResult::Sealed);
        assert_eq!(
            store.seal_session(s.id, &seal("bb")).await.unwrap(),
            SealResult::AlreadyFinalized
        );
        assert_eq!(
            store.seal_session(SessionId::new(9), &seal("cc")).await.unwrap(),
            SealResult::NotFound
        );

        let loaded = store.get_session(s.id).await.unwrap().unwrap();
        assert!(loaded.finalized);
        assert_eq!(loaded.format, Some(FormatVersion::V2));
        assert_eq!(loaded.data_hash.as_deref(), Some("aa"));
        assert_eq!(loaded.signature.as_deref(), Some("c2ln"));
        assert_eq!(loaded.finalized_at, Some(at(500)));

        assert_eq!(
            store.append_events(s.id, &[PendingEvent::new('b', at(2))]).await.unwrap(),
            AppendResult::Finalized
        );
        assert_eq!(store.count_events(s.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_append_to_missing_session() {
        let store = SqliteStore::open_memory().unwrap();
        let result = store
            .append_events(SessionId::new(3), &[PendingEvent::new('a', at(1))])
            .await
            .unwrap();
        assert_eq!(result, AppendResult::NotFound);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("provenance.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            let s = store.create_session(at(0)).await.unwrap();
            store.append_events(s.id, &[PendingEvent::new('x', at(1))]).await.unwrap();
            store.seal_session(s.id, &seal("dd")).await.unwrap();
            s.id
        };

        let store = SqliteStore::open(&path).unwrap();
        let session = store.get_session(id).await.unwrap().unwrap();
        assert!(session.finalized);
        assert_eq!(session.data_hash.as_deref(), Some("dd"));
        assert_eq!(store.get_events(id).await.unwrap()[0].character.as_char(), 'x');
    }

    #[tokio::test]
    async fn test_corrupt_character_is_invalid_data() {
        let store = SqliteStore::open_memory().unwrap();
        let s = store.create_session(at(0)).await.unwrap();
        store.append_events(s.id, &[PendingEvent::new('a', at(1))]).await.unwrap();

        store
            .with_connection(|conn| {
                conn.execute("UPDATE events SET character = 'ab'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            store.get_events(s.id).await,
            Err(StoreError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_unique_seq() {
        let store = SqliteStore::open_memory().unwrap();
        let s = store.create_session(at(0)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_events(s.id, &[PendingEvent::new('a', at(i)), PendingEvent::new('b', at(i))])
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut seqs: Vec<u64> = store.get_events(s.id).await.unwrap().iter().map(|e| e.seq).collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=16).collect::<Vec<_>>());
    }
}
