//! Signer and verifier: Ed25519 over session digests.
//!
//! The signed message is the raw digest, never a re-hash or a text encoding
//! of it. Signatures are persisted as standard padded base64.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::digest::Digest;
use crate::error::CoreError;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Parse a SubjectPublicKeyInfo PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, CoreError> {
        let key = VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Ok(Self(key.to_bytes()))
    }

    /// Check a signature over a digest, classifying any failure.
    pub fn check_digest(&self, digest: &Digest, signature: &[u8]) -> SignatureCheck {
        let verifying_key = match VerifyingKey::from_bytes(&self.0) {
            Ok(key) => key,
            Err(_) => return SignatureCheck::Malformed("invalid public key".into()),
        };

        let bytes: [u8; SIGNATURE_LEN] = match signature.try_into() {
            Ok(bytes) => bytes,
            Err(_) => {
                return SignatureCheck::Malformed(format!(
                    "expected {} signature bytes, got {}",
                    SIGNATURE_LEN,
                    signature.len()
                ))
            }
        };

        let sig = Signature::from_bytes(&bytes);
        match verifying_key.verify(digest.as_bytes(), &sig) {
            Ok(()) => SignatureCheck::Valid,
            Err(_) => SignatureCheck::Mismatch,
        }
    }

    /// Check a base64-encoded signature over a digest.
    pub fn check_encoded(&self, digest: &Digest, encoded: &str) -> SignatureCheck {
        match B64.decode(encoded) {
            Ok(bytes) => self.check_digest(digest, &bytes),
            Err(e) => SignatureCheck::Malformed(format!("invalid base64: {}", e)),
        }
    }

    /// True iff `signature` was produced over exactly `digest` by this key's holder.
    pub fn verify(&self, digest: &Digest, signature: &[u8]) -> bool {
        self.check_digest(digest, signature).is_valid()
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Ed25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; SIGNATURE_LEN]);

impl Ed25519Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Standard padded base64, the stored form of `signature`.
    pub fn to_base64(&self) -> String {
        B64.encode(self.0)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_LEN]> for Ed25519Signature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

/// Result of checking a signature.
///
/// Callers that only need a yes/no answer use [`SignatureCheck::is_valid`];
/// the variants keep malformed input apart from a genuine mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature is valid for this digest and key.
    Valid,
    /// The signature could not be decoded or has the wrong length.
    Malformed(String),
    /// Well-formed signature that does not verify.
    Mismatch,
}

impl SignatureCheck {
    /// Whether the check passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureCheck::Valid)
    }
}

/// A keypair for signing session digests.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Parse a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, CoreError> {
        let signing_key =
            SigningKey::from_pkcs8_pem(pem).map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a digest. Ed25519 signing is deterministic.
    pub fn sign_digest(&self, digest: &Digest) -> Ed25519Signature {
        let sig = self.signing_key.sign(digest.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}
