//! Digest engine: fixed-length hashes over canonical bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::error::CoreError;

/// Length of every supported digest, in bytes.
pub const DIGEST_LEN: usize = 32;

/// Hash functions a canonical format version may bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlgorithm {
    /// SHA-256.
    #[serde(rename = "sha-256")]
    Sha256,
    /// BLAKE3 with 32-byte output.
    Blake3,
}

impl DigestAlgorithm {
    /// Stable name used in diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha-256",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }
}

/// A 32-byte digest of a canonical document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// Hash `data` with the given algorithm.
    pub fn compute(alg: DigestAlgorithm, data: &[u8]) -> Self {
        match alg {
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                Self(hasher.finalize().into())
            }
            DigestAlgorithm::Blake3 => Self(*blake3::hash(data).as_bytes()),
        }
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, the stored form of `data_hash`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidDigest(e.to_string()))?;
        let arr: [u8; DIGEST_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::InvalidDigest(format!("expected {} bytes, got {}", DIGEST_LEN, b.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}
