// auth/token.rs - Signed fixed-length bearer tokens
//
// A token is `payload ‖ HMAC(key, payload)` encoded as URL-safe base64 without
// padding. Admin card-login tokens and start tokens share this format and only
// differ by the key they are checked against.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Number of bytes produced by the keyed digest
    pub fn digest_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(DigestAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(TokenError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha1 => write!(f, "sha1"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Largest payload a token layout may declare
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Fixed layout of a token. Issuance and verification must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub algorithm: DigestAlgorithm,
    pub payload_size: usize,
}

impl TokenSpec {
    /// Layout with a payload as long as the digest (the format printed cards use)
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            payload_size: algorithm.digest_size(),
        }
    }

    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    /// Decoded length of a well-formed token.
    ///
    /// Saturates, so an absurd payload size yields a length no input can match.
    pub fn token_len(&self) -> usize {
        self.payload_size.saturating_add(self.algorithm.digest_size())
    }
}

impl Default for TokenSpec {
    fn default() -> Self {
        Self::new(DigestAlgorithm::Sha1)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Random source unavailable: {0}")]
    Random(#[from] rand::Error),

    #[error("Token payload size must be greater than zero")]
    EmptyPayload,

    #[error("Token payload size must not exceed 1024 bytes")]
    PayloadTooLarge,

    #[error("Invalid signing key")]
    InvalidKey,

    #[error("Unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// HMAC over the concatenation of `parts`
pub fn keyed_digest(
    key: &[u8],
    algorithm: DigestAlgorithm,
    parts: &[&[u8]],
) -> Result<Vec<u8>, TokenError> {
    match algorithm {
        DigestAlgorithm::Sha1 => {
            let mut mac =
                <Hmac<Sha1> as Mac>::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
            for part in parts {
                mac.update(part);
            }
            Ok(mac.finalize().into_bytes().to_vec())
        }
        DigestAlgorithm::Sha256 => {
            let mut mac =
                <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
            for part in parts {
                mac.update(part);
            }
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}

/// Generate a fresh token signed with `key`
pub fn generate(key: &[u8], spec: TokenSpec) -> Result<String, TokenError> {
    if spec.payload_size == 0 {
        return Err(TokenError::EmptyPayload);
    }
    if spec.payload_size > MAX_PAYLOAD_SIZE {
        return Err(TokenError::PayloadTooLarge);
    }

    let mut raw = vec![0u8; spec.payload_size];
    OsRng.try_fill_bytes(&mut raw)?;

    let digest = keyed_digest(key, spec.algorithm, &[&raw])?;
    raw.extend_from_slice(&digest);

    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// Check a presented token against `key`.
///
/// Fails closed: undecodable input, a wrong length and a digest mismatch all
/// return `false` and are indistinguishable to the caller.
pub fn verify(token: &str, key: &[u8], spec: TokenSpec) -> bool {
    let Ok(raw) = URL_SAFE_NO_PAD.decode(token.as_bytes()) else {
        return false;
    };

    if raw.len() != spec.token_len() {
        tracing::debug!("Rejected token with decoded length {}", raw.len());
        return false;
    }

    let (payload, presented) = raw.split_at(spec.payload_size);
    match keyed_digest(key, spec.algorithm, &[payload]) {
        Ok(expected) => bool::from(expected.as_slice().ct_eq(presented)),
        Err(_) => false,
    }
}

/// Token check bound to one purpose and one key
#[derive(Clone)]
pub struct TokenVerifier {
    key: Vec<u8>,
    spec: TokenSpec,
    optional: bool,
}

impl TokenVerifier {
    /// A verifier that rejects everything when the key is empty
    pub fn required(key: impl Into<Vec<u8>>, spec: TokenSpec) -> Self {
        Self {
            key: key.into(),
            spec,
            optional: false,
        }
    }

    /// A verifier that accepts everything when the key is empty
    pub fn optional(key: impl Into<Vec<u8>>, spec: TokenSpec) -> Self {
        Self {
            key: key.into(),
            spec,
            optional: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn accepts(&self, token: &str) -> bool {
        if self.key.is_empty() {
            return self.optional;
        }
        verify(token, &self.key, self.spec)
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("enabled", &self.is_enabled())
            .field("optional", &self.optional)
            .field("spec", &self.spec)
            .finish()
    }
}
