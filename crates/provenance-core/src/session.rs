//! Sessions: the unit of provenance.
//!
//! A session starts `Open`, accumulates events, and is finalized exactly once.
//! Finalization stores the digest, signature and format version together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::digest::DigestAlgorithm;
use crate::error::CoreError;
use crate::types::SessionId;

/// Version of the canonical document, digest and signature scheme.
///
/// Persisted alongside every finalized session so that old sessions remain
/// verifiable after the default changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    /// Compact JSON document, SHA-256, Ed25519.
    #[default]
    V1,
    /// Compact JSON document, BLAKE3, Ed25519.
    V2,
}

impl FormatVersion {
    /// The version sessions without a recorded format are assumed to use.
    pub const LEGACY: Self = FormatVersion::V1;

    /// The digest algorithm bound to this version.
    pub const fn digest_algorithm(&self) -> DigestAlgorithm {
        match self {
            FormatVersion::V1 => DigestAlgorithm::Sha256,
            FormatVersion::V2 => DigestAlgorithm::Blake3,
        }
    }

    /// Stable identifier persisted with the session.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FormatVersion::V1 => "v1",
            FormatVersion::V2 => "v2",
        }
    }

    /// Signature scheme name.
    pub const fn signature_scheme(&self) -> &'static str {
        "ed25519"
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(FormatVersion::V1),
            "v2" => Ok(FormatVersion::V2),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Accepting events.
    Open,
    /// Events frozen; digest and signature recorded. Terminal.
    Finalized,
}

/// The persisted proof written atomically at finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seal {
    pub format: FormatVersion,
    /// Lowercase hex of the digest.
    pub data_hash: String,
    /// Standard padded base64 of the raw signature bytes.
    pub signature: String,
    pub finalized_at: DateTime<Utc>,
}

/// A session as stored.
///
/// `data_hash` and `signature` are kept as their stored text so verification
/// can report malformed values instead of failing to load them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub finalized: bool,
    pub format: Option<FormatVersion>,
    pub data_hash: Option<String>,
    pub signature: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A freshly started, open session.
    pub fn new(id: SessionId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            finalized: false,
            format: None,
            data_hash: None,
            signature: None,
            finalized_at: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.finalized {
            SessionState::Finalized
        } else {
            SessionState::Open
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Apply a seal, moving the session to `Finalized`.
    pub fn apply_seal(&mut self, seal: &Seal) {
        self.finalized = true;
        self.format = Some(seal.format);
        self.data_hash = Some(seal.data_hash.clone());
        self.signature = Some(seal.signature.clone());
        self.finalized_at = Some(seal.finalized_at);
    }
}
