//! Session lifecycle, tamper detection and concurrency through the Kernel API.

use std::sync::Arc;

use provenance::core::proof::{MSG_INTEGRITY, MSG_SIGNATURE, MSG_UNVERIFIABLE, MSG_VERIFIED};
use provenance::core::{Digest, Keypair, SignatureFault};
use provenance::store::{MemoryStore, SqliteStore, Store};
use provenance::{
    Character, FormatVersion, Kernel, KernelConfig, KernelError, SessionId, SessionState,
    SigningKeys, VerificationOutcome,
};
use provenance_testkit::{write_pem_keys, TestFixture, DEFAULT_SEED, T0_MICROS};

fn chars(s: &str) -> Vec<Character> {
    s.chars().map(Character::from).collect()
}

fn config(format: FormatVersion) -> KernelConfig {
    KernelConfig {
        format,
        ..KernelConfig::default()
    }
}

#[tokio::test]
async fn finalize_then_verify_round_trip() {
    for format in [FormatVersion::V1, FormatVersion::V2] {
        let fixture = TestFixture::with_config(DEFAULT_SEED, config(format));
        let id = fixture.sealed_session("hello, world").await;

        let outcome = fixture.kernel.verify(id).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::Verified);
        assert_eq!(outcome.message(), MSG_VERIFIED);

        let status = fixture.kernel.session(id).await.unwrap();
        assert_eq!(status.state, SessionState::Finalized);
        assert_eq!(status.event_count, 12);
        assert_eq!(status.format, Some(format));
        assert!(status.finalized_at.is_some());
    }
}

#[tokio::test]
async fn empty_session_seals_and_verifies() {
    let fixture = TestFixture::new();
    let id = fixture.kernel.start().await.unwrap();
    fixture.kernel.finalize(id).await.unwrap();

    let status = fixture.kernel.session(id).await.unwrap();
    assert_eq!(
        status.data_hash.as_deref(),
        Some("4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945")
    );
    assert!(fixture.kernel.verify(id).await.unwrap().is_verified());
}

#[tokio::test]
async fn open_session_is_unverifiable() {
    let fixture = TestFixture::new();
    let id = fixture.session_with_text("abc", 1).await;

    let outcome = fixture.kernel.verify(id).await.unwrap();
    assert_eq!(outcome, VerificationOutcome::Unverifiable);
    assert_eq!(outcome.message(), MSG_UNVERIFIABLE);
    assert!(!outcome.is_verified());
}

#[tokio::test]
async fn tampered_character_fails_integrity() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("secret").await;

    fixture.tamper_character(id, 2, 'X');

    let outcome = fixture.kernel.verify(id).await.unwrap();
    assert!(matches!(outcome, VerificationOutcome::IntegrityFailure { .. }));
    assert_eq!(outcome.message(), MSG_INTEGRITY);
}

#[tokio::test]
async fn tampered_timestamp_fails_integrity() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("secret").await;

    fixture.tamper_timestamp(id, 0, 1);

    let outcome = fixture.kernel.verify(id).await.unwrap();
    assert_eq!(outcome.message(), MSG_INTEGRITY);
}

#[tokio::test]
async fn forged_signature_fails_signature_check() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("signed").await;

    let status = fixture.kernel.session(id).await.unwrap();
    let digest = Digest::from_hex(status.data_hash.as_deref().unwrap()).unwrap();
    let forged = Keypair::from_seed(&[0x99; 32]).sign_digest(&digest);
    fixture.tamper_signature(id, &forged.to_base64());

    let outcome = fixture.kernel.verify(id).await.unwrap();
    assert_eq!(
        outcome,
        VerificationOutcome::SignatureFailure(SignatureFault::Mismatch)
    );
    assert_eq!(outcome.message(), MSG_SIGNATURE);
}

#[tokio::test]
async fn malformed_signature_is_an_outcome_not_an_error() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("signed").await;

    fixture.tamper_signature(id, "not base64!");

    let outcome = fixture.kernel.verify(id).await.unwrap();
    assert!(matches!(
        outcome,
        VerificationOutcome::SignatureFailure(SignatureFault::Malformed(_))
    ));
    assert!(outcome.message().starts_with(MSG_SIGNATURE));
}

#[tokio::test]
async fn wrong_verifying_key_fails_signature_check() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("abc").await;

    let (session, events) = {
        use provenance::store::StoreExt;
        fixture.store().load_session(id).await.unwrap().unwrap()
    };
    let other = SigningKeys::from_seed(&[0x01; 32]).public_key();
    let outcome = provenance::core::verify_session(&session, &events, &other).unwrap();
    assert_eq!(
        outcome,
        VerificationOutcome::SignatureFailure(SignatureFault::Mismatch)
    );
}

#[tokio::test]
async fn swapped_timestamps_fail_integrity() {
    // start, 'a' at t1, 'b' at t2 > t1, finalize, verify; then swap t1 and t2.
    let fixture = TestFixture::new();
    let id = fixture.kernel.start().await.unwrap();
    fixture.clock.set_micros(T0_MICROS + 100);
    fixture.kernel.append(id, &chars("a")).await.unwrap();
    fixture.clock.set_micros(T0_MICROS + 200);
    fixture.kernel.append(id, &chars("b")).await.unwrap();
    fixture.kernel.finalize(id).await.unwrap();

    assert!(fixture.kernel.verify(id).await.unwrap().is_verified());

    fixture.swap_timestamps(id, 0, 1);

    let events = fixture.store().get_events(id).await.unwrap();
    let order: String = events.iter().map(|e| e.character.as_char()).collect();
    assert_eq!(order, "ba");

    let outcome = fixture.kernel.verify(id).await.unwrap();
    assert_eq!(outcome.message(), MSG_INTEGRITY);
}

#[tokio::test]
async fn same_characters_different_order_differ() {
    let fixture = TestFixture::new();
    let ab = fixture.sealed_session("ab").await;

    let fixture2 = TestFixture::new();
    let ba = fixture2.sealed_session("ba").await;

    let h1 = fixture.kernel.session(ab).await.unwrap().data_hash;
    let h2 = fixture2.kernel.session(ba).await.unwrap().data_hash;
    assert_ne!(h1, h2);
}

#[tokio::test]
async fn append_after_finalize_rejected() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("done").await;
    let before = fixture.kernel.session(id).await.unwrap();

    let err = fixture.kernel.append(id, &chars("x")).await.unwrap_err();
    assert!(matches!(err, KernelError::AlreadyFinalized(e) if e == id));

    let after = fixture.kernel.session(id).await.unwrap();
    assert_eq!(before, after);
    assert!(fixture.kernel.verify(id).await.unwrap().is_verified());
}

#[tokio::test]
async fn finalize_twice_rejected_and_seal_unchanged() {
    let fixture = TestFixture::new();
    let id = fixture.sealed_session("once").await;
    let before = fixture.kernel.session(id).await.unwrap();

    fixture.clock.advance_micros(5_000_000);
    let err = fixture.kernel.finalize(id).await.unwrap_err();
    assert!(matches!(err, KernelError::AlreadyFinalized(_)));

    let after = fixture.kernel.session(id).await.unwrap();
    assert_eq!(before.data_hash, after.data_hash);
    assert_eq!(before.signature, after.signature);
    assert_eq!(before.finalized_at, after.finalized_at);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let fixture = TestFixture::new();
    let missing = SessionId::new(404);

    assert!(matches!(
        fixture.kernel.append(missing, &chars("a")).await,
        Err(KernelError::SessionNotFound(_))
    ));
    assert!(matches!(
        fixture.kernel.finalize(missing).await,
        Err(KernelError::SessionNotFound(_))
    ));
    assert!(matches!(
        fixture.kernel.verify(missing).await,
        Err(KernelError::SessionNotFound(_))
    ));
    assert!(matches!(
        fixture.kernel.session(missing).await,
        Err(KernelError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn empty_append_records_nothing() {
    let fixture = TestFixture::new();
    let id = fixture.kernel.start().await.unwrap();
    fixture.kernel.append(id, &[]).await.unwrap();
    assert_eq!(fixture.kernel.session(id).await.unwrap().event_count, 0);
}

#[tokio::test]
async fn invalid_batch_writes_nothing() {
    let fixture = TestFixture::with_config(
        DEFAULT_SEED,
        KernelConfig {
            max_events_per_append: 3,
            ..KernelConfig::default()
        },
    );
    let id = fixture.kernel.start().await.unwrap();

    let err = fixture.kernel.append_text(id, &["a", "b", "c", "d"]).await.unwrap_err();
    assert!(matches!(err, KernelError::InvalidInput(_)));

    let err = fixture.kernel.append_text(id, &["a", ""]).await.unwrap_err();
    assert!(matches!(err, KernelError::InvalidInput(_)));

    assert_eq!(fixture.kernel.session(id).await.unwrap().event_count, 0);
}

#[tokio::test]
async fn sessions_are_independent() {
    let fixture = TestFixture::new();
    let a = fixture.session_with_text("aaa", 1).await;
    let b = fixture.session_with_text("bb", 1).await;

    fixture.kernel.finalize(a).await.unwrap();
    fixture.kernel.append(b, &chars("b")).await.unwrap();

    assert_eq!(fixture.kernel.session(a).await.unwrap().event_count, 3);
    assert_eq!(fixture.kernel.session(b).await.unwrap().event_count, 3);
    assert_eq!(
        fixture.kernel.session(b).await.unwrap().state,
        SessionState::Open
    );
}

#[tokio::test]
async fn v1_session_verifies_after_default_moves_to_v2() {
    let store = SqliteStore::open_memory().unwrap();
    let keys = SigningKeys::from_seed(&DEFAULT_SEED);

    let old = Kernel::new(keys.clone(), store.clone(), config(FormatVersion::V1));
    let id = old.start().await.unwrap();
    old.append(id, &chars("legacy")).await.unwrap();
    old.finalize(id).await.unwrap();

    let new = Kernel::new(keys, store, config(FormatVersion::V2));
    assert_eq!(new.session(id).await.unwrap().format, Some(FormatVersion::V1));
    assert!(new.verify(id).await.unwrap().is_verified());

    let fresh = new.start().await.unwrap();
    new.finalize(fresh).await.unwrap();
    assert_eq!(new.session(fresh).await.unwrap().format, Some(FormatVersion::V2));
}

#[tokio::test]
async fn sqlite_end_to_end_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("provenance.db");
    let (private, public) = write_pem_keys(dir.path(), &DEFAULT_SEED);

    let id = {
        let keys = SigningKeys::load(&private, Some(&public)).unwrap();
        let kernel = Kernel::new(keys, SqliteStore::open(&db).unwrap(), KernelConfig::default());
        let id = kernel.start().await.unwrap();
        kernel.append_text(id, &["o", "k"]).await.unwrap();
        kernel.finalize(id).await.unwrap();
        id
    };

    let keys = SigningKeys::load(&private, None).unwrap();
    let store = SqliteStore::open(&db).unwrap();
    let kernel = Kernel::new(keys, store.clone(), KernelConfig::default());
    assert!(kernel.verify(id).await.unwrap().is_verified());

    store
        .with_connection(move |conn| {
            conn.execute("UPDATE events SET character = 'K' WHERE seq = 2", [])?;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(kernel.verify(id).await.unwrap().message(), MSG_INTEGRITY);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_and_finalize_keep_seal_valid() {
    let kernel = Arc::new(Kernel::new(
        SigningKeys::from_seed(&DEFAULT_SEED),
        MemoryStore::new(),
        KernelConfig::default(),
    ));
    let id = kernel.start().await.unwrap();

    let mut writers = Vec::new();
    for i in 0..32u32 {
        let kernel = Arc::clone(&kernel);
        writers.push(tokio::spawn(async move {
            let c = char::from_u32('a' as u32 + i % 26).unwrap();
            kernel.append(id, &[Character::from(c)]).await
        }));
    }
    let finalizer = {
        let kernel = Arc::clone(&kernel);
        tokio::spawn(async move { kernel.finalize(id).await })
    };

    let mut accepted = 0u64;
    for writer in writers {
        match writer.await.unwrap() {
            Ok(()) => accepted += 1,
            Err(KernelError::AlreadyFinalized(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    finalizer.await.unwrap().unwrap();

    let status = kernel.session(id).await.unwrap();
    assert!(status.is_finalized());
    assert_eq!(status.event_count, accepted);
    assert!(kernel.verify(id).await.unwrap().is_verified());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finalize_seals_once() {
    let kernel = Arc::new(Kernel::new(
        SigningKeys::from_seed(&DEFAULT_SEED),
        MemoryStore::new(),
        KernelConfig::default(),
    ));
    let id = kernel.start().await.unwrap();
    kernel.append(id, &chars("race")).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let kernel = Arc::clone(&kernel);
            tokio::spawn(async move { kernel.finalize(id).await })
        })
        .collect();

    let mut sealed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => sealed += 1,
            Err(KernelError::AlreadyFinalized(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(sealed, 1);
    assert!(kernel.verify(id).await.unwrap().is_verified());
}
