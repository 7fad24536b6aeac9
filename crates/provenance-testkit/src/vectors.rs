//! Golden test vectors for the canonical session document.
//!
//! Each vector pins the canonical document, its digest under both format
//! versions, and the Ed25519 signature produced by [`VECTOR_SEED`]. Any
//! implementation that seals sessions must reproduce these byte for byte.

use provenance_core::event::from_unix_micros;
use provenance_core::{
    canonical_bytes, document_digest, seal_events, Event, FormatVersion, Keypair, Seal,
};

use crate::fixtures::T0_MICROS;

/// Seed of the signing key used for every vector.
pub const VECTOR_SEED: [u8; 32] = [0x42; 32];

/// Hex public key derived from [`VECTOR_SEED`].
pub const VECTOR_PUBLIC_KEY: &str =
    "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12";

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Events in canonical order: character and Unix microseconds.
    pub events: &'static [(char, i64)],
    /// Expected canonical document.
    pub document: &'static str,
    /// Expected SHA-256 digest (format v1), hex.
    pub sha256: &'static str,
    /// Expected BLAKE3 digest (format v2), hex.
    pub blake3: &'static str,
    /// Expected v1 signature, base64.
    pub signature_v1: &'static str,
    /// Expected v2 signature, base64.
    pub signature_v2: &'static str,
}

impl GoldenVector {
    /// The vector's events with `seq` assigned from 1.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .iter()
            .enumerate()
            .map(|(i, &(c, micros))| {
                Event::new(i as u64 + 1, c, from_unix_micros(micros).expect("valid timestamp"))
            })
            .collect()
    }

    /// Expected hex digest for a format.
    pub fn expected_hash(&self, format: FormatVersion) -> &'static str {
        match format {
            FormatVersion::V1 => self.sha256,
            FormatVersion::V2 => self.blake3,
        }
    }

    /// Expected base64 signature for a format.
    pub fn expected_signature(&self, format: FormatVersion) -> &'static str {
        match format {
            FormatVersion::V1 => self.signature_v1,
            FormatVersion::V2 => self.signature_v2,
        }
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty session",
            events: &[],
            document: "[]",
            sha256: "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945",
            blake3: "d53d18c23212ea7b6300594bb89bce60218f6eff2b9d628b8cc42d3e79bbd5ab",
            signature_v1: "UT1NCB5K9RYlS7CW1mPmVbmqJ7MWFXTciSTKzfbjkMbi+3QbUqX4mX5sjtGLxbRagjWmfcvTndGvl/JHRyw5Dw==",
            signature_v2: "SSq1+EwRam7aDx70lGSiLWRNy0444OOdYuZAOEWa5LmEnmIpPUsdwdc8nEmA6HYLU53GHFbCrmMynIvZlnonDw==",
        },
        GoldenVector {
            name: "two characters",
            events: &[('a', T0_MICROS), ('b', T0_MICROS + 1_500)],
            document: r#"[{"character":"a","timestamp":"2025-01-14T16:00:00.000000Z"},{"character":"b","timestamp":"2025-01-14T16:00:00.001500Z"}]"#,
            sha256: "9615e8cc2d44879ad765b2eeac11435855f95b4f871e80aa44f15b6ec0b58ce2",
            blake3: "1db85f4e45118c35d431d8a92788e133ea641fe418d0a80cbf1605e20da5c72d",
            signature_v1: "K4TSxmLM2lr2HpvsgZTgZUw0Sp3kEl7mwvGUiMk8VqXc5vSiw57DpbXI039ih47mVMHfAouFlzDrwwi+ZJDqAQ==",
            signature_v2: "m9lBxMgF8BlRIAEUZugS7n8GCpDRVCsJ2Yi2wSFuLWkje9YdQC1/PDcO8AbrofZrmkhnapr6SyBarUuJth8/Cg==",
        },
        GoldenVector {
            name: "non-ascii and escaped characters",
            events: &[
                ('é', T0_MICROS),
                ('"', T0_MICROS),
                ('\n', T0_MICROS + 1),
                ('🦀', T0_MICROS + 2),
            ],
            document: r#"[{"character":"é","timestamp":"2025-01-14T16:00:00.000000Z"},{"character":"\"","timestamp":"2025-01-14T16:00:00.000000Z"},{"character":"\n","timestamp":"2025-01-14T16:00:00.000001Z"},{"character":"🦀","timestamp":"2025-01-14T16:00:00.000002Z"}]"#,
            sha256: "d848ff2ae1426c31195a94d84fda8c4ea0d3da2fab8c47bc350e9ea8434ccea6",
            blake3: "f64d4ae6f8d45f87a534686bae7abdf3fc1997307187091a51477294c74a4a63",
            signature_v1: "72mhmP12xOFJkd81t/x++mYW/hJN+ZgEho05P1CNg9xgWS3TzrcP/AaAS9sm6ZKtSlip2JKGs0GnYn2YQp2SBw==",
            signature_v2: "HbgVT9g7hpGIpJ+hwrbIWPt3SYOzo3HVOog1GxGMnh56NpC4nHTqRwGlZV5Fk07JvdeMhFzYhCMHuBOoMCAuCw==",
        },
        GoldenVector {
            name: "epoch timestamps",
            events: &[('x', 0), ('y', 999_999)],
            document: r#"[{"character":"x","timestamp":"1970-01-01T00:00:00.000000Z"},{"character":"y","timestamp":"1970-01-01T00:00:00.999999Z"}]"#,
            sha256: "fb8e54113294e2e7dd8211176d17773358639f41bea21d5f3cc40d8f293dc78e",
            blake3: "b132b2c7af5750ba5954bb62486cc26f459c2f0ed124c4459ec18563b9c8bcaa",
            signature_v1: "jexdVzxC7rlYA7SRttWznw8P7a+to0cfY24H+/H5w/ILFsNDMA2aNQW7xHC0UWazv2t9W2pegpa0vG4F0ChvDg==",
            signature_v2: "Y8++/7JA3upoUIQrriA0xA1i6mQq6VEn/j8kWRgVh0j6SF2n+kdlV1CKK30VubWdX5KX++XkBbzTeNxz75FeCg==",
        },
    ]
}

/// Seal a vector's events with the vector key.
pub fn seal_vector(vector: &GoldenVector, format: FormatVersion) -> Seal {
    let keypair = Keypair::from_seed(&VECTOR_SEED);
    let finalized_at = from_unix_micros(T0_MICROS).expect("valid timestamp");
    seal_events(format, &vector.events(), &keypair, finalized_at).expect("vector seals")
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches)` per vector and format.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    let mut results = Vec::new();
    for vector in all_vectors() {
        let document_ok = canonical_bytes(&vector.events())
            .map(|bytes| bytes == vector.document.as_bytes())
            .unwrap_or(false);

        for format in [FormatVersion::V1, FormatVersion::V2] {
            let hash_ok = document_digest(format, &vector.events())
                .map(|d| d.to_hex() == vector.expected_hash(format))
                .unwrap_or(false);
            let seal = seal_vector(&vector, format);
            let signature_ok = seal.signature == vector.expected_signature(format);

            results.push((
                format!("{} ({})", vector.name, format),
                document_ok && hash_ok && signature_ok,
            ));
        }
    }
    results
}
