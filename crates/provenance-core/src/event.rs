//! Events: timestamped characters recorded against a session.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Character;

/// A recorded input event.
///
/// `seq` is the store-assigned insertion position within the session (1-based)
/// and breaks timestamp ties. It is not part of the canonical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Insertion sequence number within the session.
    pub seq: u64,
    /// The captured code point.
    pub character: Character,
    /// When the event was recorded, at microsecond precision.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a new event.
    pub fn new(seq: u64, character: impl Into<Character>, timestamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            character: character.into(),
            timestamp,
        }
    }
}

/// An event accepted for append but not yet assigned a `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    pub character: Character,
    pub timestamp: DateTime<Utc>,
}

impl PendingEvent {
    /// Create a pending event.
    pub fn new(character: impl Into<Character>, timestamp: DateTime<Utc>) -> Self {
        Self {
            character: character.into(),
            timestamp,
        }
    }
}

/// Sort events into canonical order: timestamp, then insertion order.
pub fn sort_canonical(events: &mut [Event]) {
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.seq.cmp(&b.seq)));
}

/// Truncate a timestamp to the microsecond precision the canonical form keeps.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(ts)
}

/// Convert microseconds since the Unix epoch to a timestamp.
pub fn from_unix_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
}
