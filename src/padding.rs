//! PKCS#7 padding.

use crate::types::{EnvelopeError, Result};

/// Pad `data` to a multiple of `block_size`.
///
/// Padding is always added: input that is already aligned gains a full
/// block of `block_size` bytes.
pub fn pad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if block_size == 0 || block_size > u8::MAX as usize {
        return Err(EnvelopeError::InvalidPadding(format!(
            "Block size must be 1..=255, got {}",
            block_size
        )));
    }

    let count = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + count);
    padded.extend_from_slice(data);
    padded.resize(data.len() + count, count as u8);
    Ok(padded)
}

/// Strip PKCS#7 padding.
///
/// Only the final byte is consulted, matching what the platform checks.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    let count = match data.last() {
        Some(&b) => b as usize,
        None => {
            return Err(EnvelopeError::InvalidPadding("Empty input".into()));
        }
    };

    if count == 0 || count > data.len() {
        return Err(EnvelopeError::InvalidPadding(format!(
            "Padding count {} invalid for {} bytes",
            count,
            data.len()
        )));
    }

    Ok(&data[..data.len() - count])
}
