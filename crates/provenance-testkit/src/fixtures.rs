//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::TimeDelta;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::SigningKey;

use provenance::{Kernel, KernelConfig, SessionId, SigningKeys};
use provenance_core::Character;
use provenance_store::MemoryStore;

use crate::clock::ManualClock;

/// Seed used by [`TestFixture::new`].
pub const DEFAULT_SEED: [u8; 32] = [0x42; 32];

/// 2025-01-14T16:00:00Z in Unix microseconds.
pub const T0_MICROS: i64 = 1_736_870_400_000_000;

/// A kernel over a memory store, with deterministic keys and a manual clock.
pub struct TestFixture {
    pub kernel: Kernel<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub seed: [u8; 32],
}

impl TestFixture {
    /// Fixture with [`DEFAULT_SEED`] and the default configuration.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_SEED, KernelConfig::default())
    }

    /// Fixture with a chosen seed and configuration.
    pub fn with_config(seed: [u8; 32], config: KernelConfig) -> Self {
        let clock = Arc::new(ManualClock::at_micros(T0_MICROS));
        let kernel = Kernel::with_clock(
            SigningKeys::from_seed(&seed),
            MemoryStore::new(),
            config,
            clock.clone(),
        );
        Self {
            kernel,
            clock,
            seed,
        }
    }

    /// The backing store, for direct inspection and tampering.
    pub fn store(&self) -> &MemoryStore {
        self.kernel.store()
    }

    /// Start a session and record `text` one character per event, advancing
    /// the clock by `step_micros` before each character.
    pub async fn session_with_text(&self, text: &str, step_micros: i64) -> SessionId {
        let id = self.kernel.start().await.unwrap();
        for c in text.chars() {
            self.clock.advance_micros(step_micros);
            self.kernel.append(id, &[Character::from(c)]).await.unwrap();
        }
        id
    }

    /// Start, fill and finalize a session.
    pub async fn sealed_session(&self, text: &str) -> SessionId {
        let id = self.session_with_text(text, 1_000).await;
        self.kernel.finalize(id).await.unwrap();
        id
    }

    /// Overwrite the character of the event at canonical position `index`.
    pub fn tamper_character(&self, id: SessionId, index: usize, c: char) {
        self.store()
            .tamper_events(id, |events| {
                provenance_core::sort_canonical(events);
                events[index].character = Character::from(c);
            })
            .unwrap();
    }

    /// Shift the timestamp of the event at canonical position `index`.
    pub fn tamper_timestamp(&self, id: SessionId, index: usize, delta_micros: i64) {
        self.store()
            .tamper_events(id, |events| {
                provenance_core::sort_canonical(events);
                events[index].timestamp += TimeDelta::microseconds(delta_micros);
            })
            .unwrap();
    }

    /// Exchange the timestamps of two events at canonical positions `a` and `b`.
    pub fn swap_timestamps(&self, id: SessionId, a: usize, b: usize) {
        self.store()
            .tamper_events(id, |events| {
                provenance_core::sort_canonical(events);
                let ta = events[a].timestamp;
                events[a].timestamp = events[b].timestamp;
                events[b].timestamp = ta;
            })
            .unwrap();
    }

    /// Replace the stored signature text.
    pub fn tamper_signature(&self, id: SessionId, signature: &str) {
        self.store()
            .tamper_session(id, |session| session.signature = Some(signature.to_string()))
            .unwrap();
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// PEM encodings (PKCS#8 private, SPKI public) of the key pair for `seed`.
pub fn pem_keys(seed: &[u8; 32]) -> (String, String) {
    let signing = SigningKey::from_bytes(seed);
    let private = signing
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode private key")
        .to_string();
    let public = signing
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("encode public key");
    (private, public)
}

/// Write `private.pem` and `public.pem` for `seed` into `dir`.
pub fn write_pem_keys(dir: &Path, seed: &[u8; 32]) -> (PathBuf, PathBuf) {
    let (private, public) = pem_keys(seed);
    let private_path = dir.join("private.pem");
    let public_path = dir.join("public.pem");
    std::fs::write(&private_path, private).expect("write private key");
    std::fs::write(&public_path, public).expect("write public key");
    (private_path, public_path)
}
