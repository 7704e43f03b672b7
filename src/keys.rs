//! Key material and endpoint identity for the envelope codec.

use std::fmt;

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::{EnvelopeError, Result, IV_SIZE, KEY_SIZE};

/// Standard-alphabet base64 that tolerates non-zero trailing bits.
///
/// The platform issues 43-character keys whose last symbol is not
/// canonical, so a strict decoder would reject valid keys.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// AES-256 key decoded from the platform's `EncodingAESKey`.
///
/// The IV is always the first 16 bytes of the key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey {
    bytes: [u8; KEY_SIZE],
}

impl EnvelopeKey {
    /// Decode a configured key string.
    ///
    /// The stored string omits the trailing `=`; it is re-added here before
    /// decoding.
    ///
    /// # Arguments
    /// * `encoded` - 43-character base64 key string
    ///
    /// # Returns
    /// The decoded 32-byte key
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let mut padded = String::with_capacity(encoded.len() + 1);
        padded.push_str(encoded);
        padded.push('=');

        let mut decoded = LENIENT_BASE64.decode(padded.as_bytes())?;
        if decoded.len() != KEY_SIZE {
            let len = decoded.len();
            decoded.zeroize();
            return Err(EnvelopeError::InvalidKeyLength(len));
        }

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }

    /// Build a key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| EnvelopeError::InvalidKeyLength(bytes.len()))?;
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// The fixed CBC IV: the first 16 key bytes.
    pub fn iv(&self) -> &[u8] {
        &self.bytes[..IV_SIZE]
    }

    /// Short SHA-256 fingerprint, safe to log.
    ///
    /// # Returns
    /// 16 lowercase hex characters
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.bytes);
        hex::encode(&hash[..8])
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Signing token and expected identifier of one endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointIdentity {
    token: String,
    identifier: String,
}

impl EndpointIdentity {
    /// Create a new identity.
    ///
    /// # Arguments
    /// * `token` - Shared signing secret
    /// * `identifier` - Expected trailing identifier, usually the app id
    pub fn new(token: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identifier: identifier.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Debug for EndpointIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointIdentity")
            .field("token", &"<redacted>")
            .field("identifier", &self.identifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SAMPLE_KEY_HEX: &str =
        "69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a69a6";

    #[test]
    fn test_decode_sample_key() {
        let key = EnvelopeKey::from_encoded(SAMPLE_KEY).unwrap();
        assert_eq!(hex::encode(key.as_bytes()), SAMPLE_KEY_HEX);
    }

    #[test]
    fn test_iv_is_key_prefix() {
        let key = EnvelopeKey::from_encoded(SAMPLE_KEY).unwrap();
        assert_eq!(key.iv().len(), IV_SIZE);
        assert_eq!(key.iv(), &key.as_bytes()[..16]);
    }

    #[test]
    fn test_short_key_rejected() {
        // 40 chars + "=" is not a valid base64 length
        let result = EnvelopeKey::from_encoded(&"a".repeat(40));
        assert!(matches!(result, Err(EnvelopeError::InvalidBase64(_))));

        // 39 chars + "=" decodes cleanly to 29 bytes
        let result = EnvelopeKey::from_encoded(&"A".repeat(39));
        assert!(matches!(result, Err(EnvelopeError::InvalidKeyLength(29))));
    }

    #[test]
    fn test_non_base64_key_rejected() {
        let result = EnvelopeKey::from_encoded(&"!".repeat(43));
        assert!(matches!(result, Err(EnvelopeError::InvalidBase64(_))));
    }

    #[test]
    fn test_from_bytes_length() {
        assert!(EnvelopeKey::from_bytes(&[7u8; 32]).is_ok());
        assert!(matches!(
            EnvelopeKey::from_bytes(&[7u8; 16]),
            Err(EnvelopeError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn test_fingerprint() {
        let key = EnvelopeKey::from_encoded(SAMPLE_KEY).unwrap();
        assert_eq!(key.fingerprint(), "d665e03ddfb278d2");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let key = EnvelopeKey::from_encoded(SAMPLE_KEY).unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains(SAMPLE_KEY_HEX));

        let identity = EndpointIdentity::new("mytoken", "wx123");
        let printed = format!("{:?}", identity);
        assert!(!printed.contains("mytoken"));
        assert!(printed.contains("wx123"));
    }
}
