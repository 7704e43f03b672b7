//! Plaintext framing for the envelope protocol.
//!
//! Layout (20-byte header + variable body):
//! - \[0..16\]:    random prefix
//! - \[16..20\]:   payload length (big-endian u32)
//! - \[20..20+L\]: payload
//! - \[20+L..\]:   identifier (app id)

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::types::{
    EnvelopeError, Result, FRAME_HEADER_SIZE, LENGTH_PREFIX_SIZE, RANDOM_PREFIX_SIZE,
};

/// Plaintext as it exists immediately before encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPlaintext {
    /// Per-message random bytes.
    pub random_prefix: [u8; RANDOM_PREFIX_SIZE],
    /// Application payload.
    pub payload: Vec<u8>,
    /// Trailing identifier bytes.
    pub identifier: Vec<u8>,
}

impl FramedPlaintext {
    /// Frame a payload with a fresh random prefix.
    pub fn new(payload: impl Into<Vec<u8>>, identifier: &str) -> Self {
        Self::with_prefix(random_prefix(), payload, identifier)
    }

    /// Frame a payload with a caller-supplied prefix.
    pub fn with_prefix(
        random_prefix: [u8; RANDOM_PREFIX_SIZE],
        payload: impl Into<Vec<u8>>,
        identifier: &str,
    ) -> Self {
        Self {
            random_prefix,
            payload: payload.into(),
            identifier: identifier.as_bytes().to_vec(),
        }
    }

    /// Encode the frame to bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload_len = u32::try_from(self.payload.len())
            .map_err(|_| EnvelopeError::PayloadTooLarge(self.payload.len()))?;

        let mut data =
            Vec::with_capacity(FRAME_HEADER_SIZE + self.payload.len() + self.identifier.len());
        data.extend_from_slice(&self.random_prefix);
        data.extend_from_slice(&payload_len.to_be_bytes());
        data.extend_from_slice(&self.payload);
        data.extend_from_slice(&self.identifier);
        Ok(data)
    }

    /// Decode a decrypted buffer into its parts.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(EnvelopeError::InvalidFrame(format!(
                "Data too short: {} bytes (minimum {})",
                data.len(),
                FRAME_HEADER_SIZE
            )));
        }

        let mut random_prefix = [0u8; RANDOM_PREFIX_SIZE];
        random_prefix.copy_from_slice(&data[..RANDOM_PREFIX_SIZE]);

        let mut length_bytes = [0u8; LENGTH_PREFIX_SIZE];
        length_bytes.copy_from_slice(&data[RANDOM_PREFIX_SIZE..FRAME_HEADER_SIZE]);
        let payload_len = u32::from_be_bytes(length_bytes) as usize;

        let body = &data[FRAME_HEADER_SIZE..];
        if payload_len > body.len() {
            return Err(EnvelopeError::InvalidFrame(format!(
                "Declared payload length {} exceeds remaining {} bytes",
                payload_len,
                body.len()
            )));
        }

        Ok(Self {
            random_prefix,
            payload: body[..payload_len].to_vec(),
            identifier: body[payload_len..].to_vec(),
        })
    }

    /// Identifier as text; invalid UTF-8 is replaced, so it can never
    /// compare equal to a configured identifier by accident.
    pub fn identifier_str(&self) -> String {
        String::from_utf8_lossy(&self.identifier).into_owned()
    }
}

/// 16 alphanumeric bytes from the thread-local CSPRNG.
fn random_prefix() -> [u8; RANDOM_PREFIX_SIZE] {
    let mut rng = rand::thread_rng();
    let mut prefix = [0u8; RANDOM_PREFIX_SIZE];
    for byte in prefix.iter_mut() {
        *byte = rng.sample(Alphanumeric);
    }
    prefix
}
