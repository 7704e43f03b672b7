//! Envelope signatures.
//!
//! The platform signs `{token, timestamp, nonce, encrypt}` by sorting the four
//! strings byte-wise, concatenating them without a separator and hashing the
//! result with SHA-1. The sort is over values, not roles, so the field order
//! at the call site does not matter.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Computes an envelope signature.
///
/// # Arguments
/// * `token` - Shared signing secret
/// * `timestamp` - Timestamp string as transmitted
/// * `nonce` - Nonce string as transmitted
/// * `cipher_text` - Base64 ciphertext (the `Encrypt` field)
///
/// # Returns
/// 40 lowercase hex characters
pub fn sign(token: &str, timestamp: &str, nonce: &str, cipher_text: &str) -> String {
    let mut parts = [token, timestamp, nonce, cipher_text];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Verifies a transmitted signature in constant time.
///
/// # Returns
/// `true` if `expected` matches the recomputed signature
pub fn verify(expected: &str, token: &str, timestamp: &str, nonce: &str, cipher_text: &str) -> bool {
    let actual = sign(token, timestamp, nonce, cipher_text);
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}
