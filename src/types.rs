//! Type definitions and protocol constants for the envelope codec.

use thiserror::Error;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of the decoded AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// Length of the configured base64 key string (one `=` short of canonical).
pub const ENCODED_KEY_LEN: usize = 43;

/// Size of the random prefix at the start of a framed plaintext.
pub const RANDOM_PREFIX_SIZE: usize = 16;

/// Size of the big-endian payload length field.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Minimum size of a framed plaintext (random prefix + length field).
pub const FRAME_HEADER_SIZE: usize = RANDOM_PREFIX_SIZE + LENGTH_PREFIX_SIZE;

/// Inbound element carrying the recipient account.
pub const RECIPIENT_ELEMENT: &str = "ToUserName";

/// Element carrying the base64 ciphertext, in both directions.
pub const ENCRYPT_ELEMENT: &str = "Encrypt";

/// Outbound element carrying the hex signature.
pub const SIGNATURE_ELEMENT: &str = "MsgSignature";

/// Outbound element carrying the timestamp.
pub const TIMESTAMP_ELEMENT: &str = "TimeStamp";

/// Outbound element carrying the nonce.
pub const NONCE_ELEMENT: &str = "Nonce";

/// Root element of both envelopes.
pub const ROOT_ELEMENT: &str = "xml";

/// Coarse failure category, for hosts that only care which class of
/// failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad XML, base64, padding or framing.
    MalformedInput,
    /// The envelope signature did not verify.
    SignatureMismatch,
    /// The decrypted identifier belongs to another endpoint.
    IdentityMismatch,
    /// Key length or block alignment violation.
    Cipher,
    /// Codec construction from configuration failed.
    Config,
}

/// Errors that can occur while opening or sealing envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    // Malformed input
    /// The envelope XML could not be parsed or produced.
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// A key or ciphertext string is not valid base64.
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// PKCS#7 padding is missing or inconsistent.
    #[error("Invalid padding: {0}")]
    InvalidPadding(String),

    /// The decrypted buffer does not hold a well-formed frame.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Payload length does not fit the 4-byte length field.
    #[error("Payload too large: {0} bytes (max {})", u32::MAX)]
    PayloadTooLarge(usize),

    // Authentication
    /// The recomputed signature does not match the transmitted one.
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// The identifier inside the plaintext is not ours.
    #[error("Identity mismatch: expected {expected:?}, got {actual:?}")]
    IdentityMismatch { expected: String, actual: String },

    // Cipher
    /// The decoded key is not 32 bytes.
    #[error("Invalid key length: expected {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Ciphertext length is not a multiple of the block size.
    #[error("Ciphertext length {0} is not a multiple of {BLOCK_SIZE}")]
    UnalignedCiphertext(usize),

    // Configuration
    /// Codec configuration is incomplete or malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EnvelopeError {
    /// Returns the failure category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidXml(_)
            | Self::InvalidBase64(_)
            | Self::InvalidPadding(_)
            | Self::InvalidFrame(_)
            | Self::PayloadTooLarge(_) => ErrorKind::MalformedInput,
            Self::SignatureMismatch => ErrorKind::SignatureMismatch,
            Self::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            Self::InvalidKeyLength(_) | Self::UnalignedCiphertext(_) => ErrorKind::Cipher,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

impl From<quick_xml::Error> for EnvelopeError {
    fn from(e: quick_xml::Error) -> Self {
        Self::InvalidXml(e.to_string())
    }
}

impl From<base64::DecodeError> for EnvelopeError {
    fn from(e: base64::DecodeError) -> Self {
        Self::InvalidBase64(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
