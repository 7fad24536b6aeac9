//! Signing key capability.
//!
//! The kernel never reads key files on its own. A [`SigningKeys`] value is
//! built once at startup and handed to the kernel; it is cheap to clone and
//! shared read-only between tasks.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use provenance_core::{CoreError, Ed25519PublicKey, Keypair};
use thiserror::Error;

/// Errors loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// A key file could not be read.
    #[error("failed to read key file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key material could not be parsed.
    #[error(transparent)]
    Parse(#[from] CoreError),

    /// The configured public key is not the private key's counterpart.
    #[error("public key {configured} does not match private key (expected {derived})")]
    Mismatch {
        configured: String,
        derived: String,
    },
}

/// The Ed25519 key pair used to sign sealed sessions.
#[derive(Clone)]
pub struct SigningKeys {
    keypair: Arc<Keypair>,
    public_key: Ed25519PublicKey,
}

impl SigningKeys {
    /// Wrap an existing keypair.
    pub fn new(keypair: Keypair) -> Self {
        let public_key = keypair.public_key();
        Self {
            keypair: Arc::new(keypair),
            public_key,
        }
    }

    /// Deterministic keys from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(Keypair::from_seed(seed))
    }

    /// Fresh random keys.
    pub fn generate() -> Self {
        Self::new(Keypair::generate())
    }

    /// Parse a PKCS#8 PEM private key, optionally checked against an SPKI PEM
    /// public key.
    pub fn from_pem(private_pem: &str, public_pem: Option<&str>) -> Result<Self, KeyError> {
        let keys = Self::new(Keypair::from_pkcs8_pem(private_pem)?);

        if let Some(public_pem) = public_pem {
            let configured = Ed25519PublicKey::from_pem(public_pem)?;
            if configured != keys.public_key {
                return Err(KeyError::Mismatch {
                    configured: configured.to_hex(),
                    derived: keys.public_key.to_hex(),
                });
            }
        }

        Ok(keys)
    }

    /// Load keys from PEM files.
    pub fn load(private_path: &Path, public_path: Option<&Path>) -> Result<Self, KeyError> {
        let private_pem = read_pem(private_path)?;
        let public_pem = public_path.map(read_pem).transpose()?;
        Self::from_pem(&private_pem, public_pem.as_deref())
    }

    /// The verifying key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.public_key
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

fn read_pem(path: &Path) -> Result<String, KeyError> {
    std::fs::read_to_string(path).map_err(|source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
    use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
    use ed25519_dalek::SigningKey;

    fn pems(seed: [u8; 32]) -> (String, String) {
        let signing = SigningKey::from_bytes(&seed);
        let private = signing.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public = signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (private, public)
    }

    #[test]
    fn test_from_pem_matches_seed() {
        let (private, public) = pems([7u8; 32]);
        let keys = SigningKeys::from_pem(&private, Some(&public)).unwrap();
        assert_eq!(keys.public_key(), SigningKeys::from_seed(&[7u8; 32]).public_key());
    }

    #[test]
    fn test_mismatched_public_key_rejected() {
        let (private, _) = pems([7u8; 32]);
        let (_, other_public) = pems([8u8; 32]);

        let err = SigningKeys::from_pem(&private, Some(&other_public)).unwrap_err();
        assert!(matches!(err, KeyError::Mismatch { .. }));
    }

    #[test]
    fn test_garbage_pem_rejected() {
        let err = SigningKeys::from_pem("not a key", None).unwrap_err();
        assert!(matches!(err, KeyError::Parse(_)));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let (private, public) = pems([9u8; 32]);
        let private_path = dir.path().join("private.pem");
        let public_path = dir.path().join("public.pem");
        std::fs::write(&private_path, private).unwrap();
        std::fs::write(&public_path, public).unwrap();

        let keys = SigningKeys::load(&private_path, Some(&public_path)).unwrap();
        assert_eq!(keys.public_key(), SigningKeys::from_seed(&[9u8; 32]).public_key());

        let missing = SigningKeys::load(&dir.path().join("absent.pem"), None).unwrap_err();
        assert!(matches!(missing, KeyError::Read { .. }));
    }

    #[test]
    fn test_debug_hides_secret() {
        let keys = SigningKeys::from_seed(&[1u8; 32]);
        let rendered = format!("{:?}", keys);
        assert!(rendered.contains("Ed25519Pub("));
        assert!(!rendered.contains(&hex_seed()));
    }

    fn hex_seed() -> String {
        "01".repeat(32)
    }
}
