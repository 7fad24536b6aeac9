//! Proptest generators for property-based testing.

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use provenance_core::event::from_unix_micros;
use provenance_core::{Character, Event, FormatVersion, Keypair};

/// Upper bound for generated timestamps: 2100-01-01T00:00:00Z.
pub const MAX_TIMESTAMP_MICROS: i64 = 4_102_444_800_000_000;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate any single code point.
pub fn character() -> impl Strategy<Value = Character> {
    any::<char>().prop_map(Character::from)
}

/// Generate a timestamp between the epoch and 2100.
pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..=MAX_TIMESTAMP_MICROS).prop_map(|micros| from_unix_micros(micros).unwrap())
}

/// Generate a format version.
pub fn format_version() -> impl Strategy<Value = FormatVersion> {
    prop_oneof![Just(FormatVersion::V1), Just(FormatVersion::V2)]
}

/// Generate an event log in canonical order, as a session would record it:
/// consecutive `seq` from 1 and non-decreasing timestamps, with ties.
pub fn event_log(max_len: usize) -> impl Strategy<Value = Vec<Event>> {
    (
        0i64..=1_000_000_000_000_000i64,
        prop::collection::vec((character(), 0i64..=5_000), 0..=max_len),
    )
        .prop_map(|(start, steps)| {
            let mut micros = start;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (character, step))| {
                    micros += step;
                    Event::new(i as u64 + 1, character, from_unix_micros(micros).unwrap())
                })
                .collect()
        })
}

/// Generate a non-empty event log.
pub fn non_empty_event_log(max_len: usize) -> impl Strategy<Value = Vec<Event>> {
    event_log(max_len).prop_filter("non-empty", |events| !events.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use provenance_core::{canonical_bytes, document_digest, seal_events, verify_session};
    use provenance_core::{Session, SessionId};

    proptest! {
        #[test]
        fn test_canonical_bytes_deterministic(events in event_log(32)) {
            let b1 = canonical_bytes(&events).unwrap();
            let b2 = canonical_bytes(&events.clone()).unwrap();
            prop_assert_eq!(b1, b2);
        }

        #[test]
        fn test_canonical_bytes_are_json_array(events in event_log(32)) {
            let bytes = canonical_bytes(&events).unwrap();
            prop_assert_eq!(bytes.first(), Some(&b'['));
            prop_assert_eq!(bytes.last(), Some(&b']'));
        }

        #[test]
        fn test_changed_character_changes_digest(
            events in non_empty_event_log(16),
            index in any::<prop::sample::Index>(),
            replacement in character(),
            format in format_version(),
        ) {
            let i = index.index(events.len());
            prop_assume!(events[i].character != replacement);

            let mut changed = events.clone();
            changed[i].character = replacement;

            prop_assert_ne!(
                document_digest(format, &events).unwrap(),
                document_digest(format, &changed).unwrap()
            );
        }

        #[test]
        fn test_shifted_timestamp_changes_digest(
            events in non_empty_event_log(16),
            index in any::<prop::sample::Index>(),
            shift in 1i64..=1_000_000,
        ) {
            let i = index.index(events.len());
            let mut changed = events.clone();
            changed[i].timestamp += TimeDelta::microseconds(shift);

            prop_assert_ne!(
                canonical_bytes(&events).unwrap(),
                canonical_bytes(&changed).unwrap()
            );
        }

        #[test]
        fn test_reordering_changes_bytes(
            events in non_empty_event_log(16),
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
        ) {
            let (i, j) = (a.index(events.len()), b.index(events.len()));
            prop_assume!(events[i].character != events[j].character
                || events[i].timestamp != events[j].timestamp);

            let mut swapped = events.clone();
            swapped.swap(i, j);

            prop_assert_ne!(
                canonical_bytes(&events).unwrap(),
                canonical_bytes(&swapped).unwrap()
            );
        }

        #[test]
        fn test_seal_then_verify(
            events in event_log(16),
            keypair in keypair(),
            format in format_version(),
        ) {
            let now = from_unix_micros(MAX_TIMESTAMP_MICROS).unwrap();
            let seal = seal_events(format, &events, &keypair, now).unwrap();
            let mut session = Session::new(SessionId::new(1), now);
            session.apply_seal(&seal);

            let outcome = verify_session(&session, &events, &keypair.public_key()).unwrap();
            prop_assert!(outcome.is_verified());
        }
    }
}
