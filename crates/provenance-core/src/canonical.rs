//! Canonical JSON encoding of a session's event log.
//!
//! The canonical document is the thing that is hashed and signed:
//! - A JSON array with one object per event, in canonical order
//! - Each object has exactly `character` then `timestamp`
//! - Timestamps are UTC, six fractional digits, `Z` suffix
//! - Compact: no insignificant whitespace
//!
//! **CRITICAL**: this encoding is versioned by [`FormatVersion`]. Changing it
//! without a new version breaks verification of every finalized session.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::digest::Digest;
use crate::error::CoreError;
use crate::event::Event;
use crate::session::FormatVersion;

/// One entry of the canonical document. Field order is the wire order.
#[derive(Serialize)]
struct CanonicalEntry {
    character: String,
    timestamp: String,
}

/// Render a timestamp in its canonical text form.
///
/// Sub-microsecond precision is truncated; events are stored at microsecond
/// precision so this is lossless for persisted events.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Encode events, already in canonical order, to canonical bytes.
pub fn canonical_bytes(events: &[Event]) -> Result<Vec<u8>, CoreError> {
    let entries: Vec<CanonicalEntry> = events
        .iter()
        .map(|event| CanonicalEntry {
            character: event.character.as_char().to_string(),
            timestamp: canonical_timestamp(&event.timestamp),
        })
        .collect();

    serde_json::to_vec(&entries).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Canonicalize and hash in one step, using the format's digest algorithm.
pub fn document_digest(format: FormatVersion, events: &[Event]) -> Result<Digest, CoreError> {
    let bytes = canonical_bytes(events)?;
    Ok(Digest::compute(format.digest_algorithm(), &bytes))
}
