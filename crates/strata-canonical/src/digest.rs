use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::validation::ValidationError;

/// Domain separator for document digests: `b"strata:document:v1\0"`.
const DOCUMENT_DOMAIN_SEPARATOR: &[u8] = b"strata:document:v1\0";

/// Supported digest algorithms for canonical document identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlg {
    /// SHA-256 (the current Strata default).
    #[serde(rename = "sha-256")]
    Sha256,
}

/// Algorithm + bytes digest, encoded as base64url without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// Digest algorithm (currently always `sha-256`).
    pub alg: DigestAlg,
    /// Base64URL (no padding) digest bytes.
    #[serde(rename = "b64")]
    pub b64: String,
}

impl Digest {
    /// Constructs a validated digest.
    pub fn new(alg: DigestAlg, b64: impl Into<String>) -> Result<Self, ValidationError> {
        let b64 = b64.into();
        let re = Regex::new(r"^[A-Za-z0-9_-]{43,44}$").expect("invalid regex");
        if !re.is_match(&b64) {
            return Err(ValidationError::PatternMismatch {
                field: "digest",
                value: b64,
            });
        }
        Ok(Digest { alg, b64 })
    }
}

/// Computes the content digest of canonical document bytes.
///
/// Formula: `sha256(domain_separator || canonical_bytes)`. Because canonical
/// bytes are deterministic, this digest is the addressable identity of the
/// logical document.
pub fn digest_canonical_bytes(bytes: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(DOCUMENT_DOMAIN_SEPARATOR);
    hasher.update(bytes);
    let hash = hasher.finalize();
    Digest {
        alg: DigestAlg::Sha256,
        b64: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash),
    }
}
