use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::auth::token::{keyed_digest, DigestAlgorithm};

use super::SessionError;

const ID_LEN: usize = 16;
const MAC_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

/// Signs session identifiers for the cookie and the `Authorization: Cookie` header.
///
/// Encoded form: URL-safe base64 of `id ‖ HMAC-SHA256(key, name ‖ id)`. The
/// cookie name is part of the MAC so a value minted for one cookie cannot be
/// replayed under another.
pub struct SessionCodec {
    key: Vec<u8>,
    name: String,
}

impl SessionCodec {
    pub fn new(key: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encode(&self, id: &Uuid) -> Result<String, SessionError> {
        let mac = self.mac(id.as_bytes())?;
        let mut raw = Vec::with_capacity(ID_LEN + mac.len());
        raw.extend_from_slice(id.as_bytes());
        raw.extend_from_slice(&mac);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    pub fn decode(&self, value: &str) -> Result<Uuid, SessionError> {
        let raw = URL_SAFE_NO_PAD
            .decode(value.trim().as_bytes())
            .map_err(|_| SessionError::InvalidCredential)?;

        if raw.len() != ID_LEN + MAC_ALGORITHM.digest_size() {
            return Err(SessionError::InvalidCredential);
        }

        let (id, presented) = raw.split_at(ID_LEN);
        let expected = self.mac(id)?;
        if !bool::from(expected.as_slice().ct_eq(presented)) {
            return Err(SessionError::InvalidCredential);
        }

        Uuid::from_slice(id).map_err(|_| SessionError::InvalidCredential)
    }

    fn mac(&self, id: &[u8]) -> Result<Vec<u8>, SessionError> {
        keyed_digest(&self.key, MAC_ALGORITHM, &[self.name.as_bytes(), id])
            .map_err(|_| SessionError::InvalidCredential)
    }
}
