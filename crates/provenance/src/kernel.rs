//! The Kernel: session integrity state machine.
//!
//! The Kernel ties the pure proof primitives to a store, a clock and a
//! signing key. It owns the lifecycle rules:
//!
//! - events are accepted only while a session is open
//! - finalize seals a session exactly once
//! - verify may run at any time and reports an outcome, never an error, for
//!   cryptographic failures

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use provenance_core::event::truncate_to_micros;
use provenance_core::validation::validate_batch_len;
use provenance_core::{
    parse_batch, seal_events, verify_session, Character, Ed25519PublicKey, FormatVersion,
    PendingEvent, Session, SessionId, SessionState, VerificationOutcome,
    DEFAULT_MAX_EVENTS_PER_APPEND,
};
use provenance_store::{AppendResult, SealResult, Store, StoreExt};

use crate::clock::{Clock, SystemClock};
use crate::error::{KernelError, Result};
use crate::keys::SigningKeys;

/// Configuration for the Kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Canonical format used for newly finalized sessions.
    pub format: FormatVersion,
    /// Largest batch accepted by a single append.
    pub max_events_per_append: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            format: FormatVersion::default(),
            max_events_per_append: DEFAULT_MAX_EVENTS_PER_APPEND,
        }
    }
}

/// Read-only view of a session for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: SessionId,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub event_count: u64,
    pub format: Option<FormatVersion>,
    pub data_hash: Option<String>,
    pub signature: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl SessionStatus {
    fn new(session: Session, event_count: u64) -> Self {
        Self {
            id: session.id,
            state: session.state(),
            started_at: session.started_at,
            event_count,
            format: session.format,
            data_hash: session.data_hash,
            signature: session.signature,
            finalized_at: session.finalized_at,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.state == SessionState::Finalized
    }
}

/// The main Kernel struct.
///
/// Provides the session lifecycle:
/// - Starting sessions
/// - Appending characters to open sessions
/// - Finalizing (sealing) sessions
/// - Verifying sessions
pub struct Kernel<S: Store> {
    /// The signing capability.
    keys: SigningKeys,
    /// The storage backend.
    store: Arc<S>,
    /// Time source for event timestamps.
    clock: Arc<dyn Clock>,
    /// Configuration.
    config: KernelConfig,
    /// Per-session locks serializing append and finalize.
    locks: StdMutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl<S: Store> Kernel<S> {
    /// Create a new kernel using the system clock.
    pub fn new(keys: SigningKeys, store: S, config: KernelConfig) -> Self {
        Self::with_clock(keys, store, config, Arc::new(SystemClock))
    }

    /// Create a new kernel with an explicit clock.
    pub fn with_clock(
        keys: SigningKeys,
        store: S,
        config: KernelConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            keys,
            store: Arc::new(store),
            clock,
            config,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Get the public key that verifies this kernel's seals.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keys.public_key()
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a new, empty, open session.
    pub async fn start(&self) -> Result<SessionId> {
        let session = self.store.create_session(self.now()).await?;
        tracing::info!(session_id = %session.id, "session started");
        Ok(session.id)
    }

    /// Append characters to an open session.
    ///
    /// The whole batch is recorded or none of it is. Each event gets the
    /// current time, never earlier than the latest event already recorded.
    ///
    /// A missing or finalized session is reported before an invalid batch.
    pub async fn append(&self, id: SessionId, characters: &[Character]) -> Result<()> {
        let guard = self.lock_session(id).await?;
        let result = self.record(id, characters).await;
        self.release_lock(id, guard)?;
        result
    }

    async fn record(&self, id: SessionId, characters: &[Character]) -> Result<()> {
        let session = self.require_session(id).await?;
        if session.is_finalized() {
            return Err(KernelError::AlreadyFinalized(id));
        }
        validate_batch_len(characters.len(), self.config.max_events_per_append)
            .map_err(|e| KernelError::InvalidInput(e.to_string()))?;

        let mut floor = self.store.last_event_timestamp(id).await?;
        let events: Vec<PendingEvent> = characters
            .iter()
            .map(|&character| {
                let now = self.now();
                let timestamp = match floor {
                    Some(prev) if prev > now => prev,
                    _ => now,
                };
                floor = Some(timestamp);
                PendingEvent::new(character, timestamp)
            })
            .collect();

        match self.store.append_events(id, &events).await? {
            AppendResult::Appended { first_seq, count } => {
                tracing::debug!(session_id = %id, first_seq, count, "events appended");
                Ok(())
            }
            AppendResult::NotFound => Err(KernelError::SessionNotFound(id)),
            AppendResult::Finalized => Err(KernelError::AlreadyFinalized(id)),
        }
    }

    /// Append characters given as text, one code point per entry.
    ///
    /// Any entry that is not exactly one code point rejects the whole batch.
    pub async fn append_text<T: AsRef<str>>(&self, id: SessionId, characters: &[T]) -> Result<()> {
        let session = self.require_session(id).await?;
        if session.is_finalized() {
            return Err(KernelError::AlreadyFinalized(id));
        }
        let characters = parse_batch(characters, self.config.max_events_per_append)
            .map_err(|e| KernelError::InvalidInput(e.to_string()))?;
        self.append(id, &characters).await
    }

    /// Seal a session: canonicalize its events, digest, sign and persist the
    /// proof atomically. Allowed once per session.
    pub async fn finalize(&self, id: SessionId) -> Result<()> {
        let guard = self.lock_session(id).await?;
        let result = self.seal(id).await;
        self.release_lock(id, guard)?;
        result
    }

    async fn seal(&self, id: SessionId) -> Result<()> {
        let (session, events) = self
            .store
            .load_session(id)
            .await?
            .ok_or(KernelError::SessionNotFound(id))?;
        if session.is_finalized() {
            return Err(KernelError::AlreadyFinalized(id));
        }

        let format = self.config.format;
        let seal = seal_events(format, &events, self.keys.keypair(), self.now())?;

        match self.store.seal_session(id, &seal).await? {
            SealResult::Sealed => {
                tracing::info!(
                    session_id = %id,
                    format = %format,
                    digest = format.digest_algorithm().name(),
                    events = events.len(),
                    data_hash = %seal.data_hash,
                    "session finalized"
                );
                Ok(())
            }
            SealResult::NotFound => Err(KernelError::SessionNotFound(id)),
            SealResult::AlreadyFinalized => Err(KernelError::AlreadyFinalized(id)),
        }
    }

    /// Verify a session against its stored events.
    ///
    /// Valid in any state. A session that was never sealed is reported as
    /// [`VerificationOutcome::Unverifiable`].
    pub async fn verify(&self, id: SessionId) -> Result<VerificationOutcome> {
        let (session, events) = self
            .store
            .load_session(id)
            .await?
            .ok_or(KernelError::SessionNotFound(id))?;

        let outcome = verify_session(&session, &events, &self.keys.public_key())?;
        match &outcome {
            VerificationOutcome::Verified => {
                tracing::debug!(session_id = %id, "session verified");
            }
            VerificationOutcome::IntegrityFailure { stored, recomputed } => {
                tracing::warn!(session_id = %id, %stored, %recomputed, "session data hash mismatch");
            }
            other => {
                tracing::warn!(session_id = %id, outcome = %other, "session verification failed");
            }
        }

        Ok(outcome)
    }

    /// Look up a session's status.
    pub async fn session(&self, id: SessionId) -> Result<SessionStatus> {
        let session = self.require_session(id).await?;
        let event_count = self.store.count_events(id).await?;
        Ok(SessionStatus::new(session, event_count))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn now(&self) -> DateTime<Utc> {
        truncate_to_micros(self.clock.now())
    }

    async fn require_session(&self, id: SessionId) -> Result<Session> {
        self.store
            .get_session(id)
            .await?
            .ok_or(KernelError::SessionNotFound(id))
    }

    /// Acquire the lock serializing writes to one session.
    async fn lock_session(&self, id: SessionId) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|e| {
                KernelError::Store(provenance_store::StoreError::LockPoisoned(e.to_string()))
            })?;
            Arc::clone(locks.entry(id).or_default())
        };
        Ok(lock.lock_owned().await)
    }

    /// Unlock a session and drop its lock entry once no other task holds or
    /// waits on it.
    ///
    /// Clones of the entry are only taken under the map lock, so a count of
    /// one after the guard is gone means nobody else can be inside or queued.
    fn release_lock(&self, id: SessionId, guard: OwnedMutexGuard<()>) -> Result<()> {
        let mut locks = self.locks.lock().map_err(|e| {
            KernelError::Store(provenance_store::StoreError::LockPoisoned(e.to_string()))
        })?;
        drop(guard);
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
        Ok(())
    }
}
