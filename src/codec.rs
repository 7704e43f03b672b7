//! Envelope codec for encrypted platform callbacks.
//!
//! This module provides the primary interface: [`EnvelopeCodec::open`]
//! verifies and decrypts an inbound callback body, and
//! [`EnvelopeCodec::seal`] encrypts and signs a reply.

use tracing::debug;

use crate::cipher::{CipherWrapper, FixedIvCipher};
use crate::config::CodecConfig;
use crate::frame::FramedPlaintext;
use crate::keys::EndpointIdentity;
use crate::signature::{sign, verify};
use crate::types::{EnvelopeError, Result};
use crate::xml::{InboundEnvelope, SealedEnvelope};

/// Result of opening an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedEnvelope {
    /// Recipient account from `ToUserName`; empty when absent.
    pub recipient: String,
    /// Decrypted payload.
    pub payload: Vec<u8>,
}

/// Opens and seals envelopes for one key/token/identifier triple.
///
/// The codec holds no mutable state; a single instance can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec<C = FixedIvCipher> {
    cipher: C,
    identity: EndpointIdentity,
}

impl EnvelopeCodec<FixedIvCipher> {
    /// Creates a codec from the platform-issued key string.
    ///
    /// # Arguments
    /// * `encoded_key` - 43-character base64 `EncodingAESKey`
    /// * `token` - Shared signing token
    /// * `identifier` - App id expected inside every plaintext
    pub fn new(
        encoded_key: &str,
        token: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<Self> {
        let cipher = FixedIvCipher::from_encoded(encoded_key)?;
        debug!(key = %cipher.key().fingerprint(), "envelope codec created");
        Ok(Self::with_cipher(
            cipher,
            EndpointIdentity::new(token, identifier),
        ))
    }

    /// Creates a codec from validated configuration.
    pub fn from_config(config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.aes_key, config.token.as_str(), config.app_id.as_str())
    }
}

impl<C: CipherWrapper> EnvelopeCodec<C> {
    /// Creates a codec around any cipher implementation.
    pub fn with_cipher(cipher: C, identity: EndpointIdentity) -> Self {
        Self { cipher, identity }
    }

    pub fn identity(&self) -> &EndpointIdentity {
        &self.identity
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    /// Verifies and decrypts an inbound callback body.
    ///
    /// The signature is checked against the `Encrypt` string exactly as
    /// transmitted, before any decryption is attempted.
    ///
    /// # Arguments
    /// * `signature` - `msg_signature` query parameter
    /// * `timestamp` - `timestamp` query parameter
    /// * `nonce` - `nonce` query parameter
    /// * `xml` - Raw request body
    pub fn open(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        xml: &[u8],
    ) -> Result<OpenedEnvelope> {
        let inbound = InboundEnvelope::from_xml(xml)?;
        let payload = self.open_parts(signature, timestamp, nonce, &inbound.encrypt)?;

        debug!(
            recipient = %inbound.recipient,
            payload_len = payload.len(),
            "envelope opened"
        );

        Ok(OpenedEnvelope {
            recipient: inbound.recipient,
            payload,
        })
    }

    /// Verifies and decrypts an already extracted `Encrypt` value.
    pub fn open_parts(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        cipher_text: &str,
    ) -> Result<Vec<u8>> {
        if !verify(signature, self.identity.token(), timestamp, nonce, cipher_text) {
            return Err(EnvelopeError::SignatureMismatch);
        }

        let plaintext = self.cipher.decrypt(cipher_text)?;
        let frame = FramedPlaintext::decode(&plaintext)?;

        if frame.identifier != self.identity.identifier().as_bytes() {
            return Err(EnvelopeError::IdentityMismatch {
                expected: self.identity.identifier().to_string(),
                actual: frame.identifier_str(),
            });
        }

        Ok(frame.payload)
    }

    /// Encrypts and signs a reply, returning the XML body.
    pub fn seal(&self, timestamp: &str, nonce: &str, payload: &[u8]) -> Result<Vec<u8>> {
        self.seal_envelope(timestamp, nonce, payload)?.to_xml()
    }

    /// Encrypts and signs a reply without marshalling it.
    pub fn seal_envelope(
        &self,
        timestamp: &str,
        nonce: &str,
        payload: &[u8],
    ) -> Result<SealedEnvelope> {
        let frame = FramedPlaintext::new(payload, self.identity.identifier());
        self.seal_frame(timestamp, nonce, &frame)
    }

    /// Encrypts and signs a caller-built frame.
    ///
    /// The frame's identifier is used as-is; [`EnvelopeCodec::seal_envelope`]
    /// is the usual entry point.
    pub fn seal_frame(
        &self,
        timestamp: &str,
        nonce: &str,
        frame: &FramedPlaintext,
    ) -> Result<SealedEnvelope> {
        let encrypt = self.cipher.encrypt(&frame.encode()?)?;
        let msg_signature = sign(self.identity.token(), timestamp, nonce, &encrypt);

        debug!(payload_len = frame.payload.len(), "envelope sealed");

        Ok(SealedEnvelope {
            encrypt,
            msg_signature,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
        })
    }
}
