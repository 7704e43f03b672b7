//! AES-256-CBC cipher wrapper for envelope payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::keys::{EnvelopeKey, LENIENT_BASE64};
use crate::padding::{pad, unpad};
use crate::types::{EnvelopeError, Result, BLOCK_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Symmetric layer between framed plaintext and the base64 `Encrypt` field.
pub trait CipherWrapper: Send + Sync {
    /// Pad, encrypt and base64-encode a framed plaintext.
    fn encrypt(&self, plaintext: &[u8]) -> Result<String>;

    /// Base64-decode, decrypt and unpad a ciphertext.
    fn decrypt(&self, cipher_text: &str) -> Result<Vec<u8>>;
}

/// AES-256-CBC with the IV fixed to the first 16 key bytes.
///
/// The peer expects this IV convention. Per-message uniqueness comes from
/// the random prefix of the framed plaintext, not from the IV.
#[derive(Debug, Clone)]
pub struct FixedIvCipher {
    key: EnvelopeKey,
}

impl FixedIvCipher {
    pub fn new(key: EnvelopeKey) -> Self {
        Self { key }
    }

    /// Build from the configured 43-character key string.
    pub fn from_encoded(encoded_key: &str) -> Result<Self> {
        Ok(Self::new(EnvelopeKey::from_encoded(encoded_key)?))
    }

    pub fn key(&self) -> &EnvelopeKey {
        &self.key
    }
}

impl CipherWrapper for FixedIvCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut buffer = pad(plaintext, BLOCK_SIZE)?;
        let len = buffer.len();

        Aes256CbcEnc::new(
            GenericArray::from_slice(self.key.as_bytes()),
            GenericArray::from_slice(self.key.iv()),
        )
        .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
        .map_err(|_| EnvelopeError::InvalidPadding(format!("{} bytes not block aligned", len)))?;

        Ok(STANDARD.encode(&buffer))
    }

    /// Line breaks in `cipher_text` are skipped before decoding, as the
    /// platform's own base64 decoder does.
    fn decrypt(&self, cipher_text: &str) -> Result<Vec<u8>> {
        let encoded: Vec<u8> = cipher_text
            .bytes()
            .filter(|b| !matches!(b, b'\r' | b'\n'))
            .collect();
        let mut buffer = LENIENT_BASE64.decode(&encoded)?;
        let len = buffer.len();
        if len % BLOCK_SIZE != 0 {
            return Err(EnvelopeError::UnalignedCiphertext(len));
        }

        Aes256CbcDec::new(
            GenericArray::from_slice(self.key.as_bytes()),
            GenericArray::from_slice(self.key.iv()),
        )
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| EnvelopeError::UnalignedCiphertext(len))?;

        let plain_len = unpad(&buffer)?.len();
        buffer.truncate(plain_len);
        Ok(buffer)
    }
}
