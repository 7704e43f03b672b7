//! wxenvelope - Secure message envelopes for WeChat-style callbacks
//!
//! Rust implementation of the official-account callback encryption scheme:
//! AES-256-CBC with a key-derived IV, PKCS#7 padding, length-prefixed
//! framing and a sorted SHA-1 signature.

mod types;
mod keys;
mod padding;
mod cipher;
mod frame;
mod signature;
mod xml;
mod config;
mod codec;

pub use types::*;
pub use keys::{EndpointIdentity, EnvelopeKey};
pub use padding::{pad, unpad};
pub use cipher::{CipherWrapper, FixedIvCipher};
pub use frame::FramedPlaintext;
pub use signature::{sign, verify};
pub use xml::{InboundEnvelope, SealedEnvelope};
pub use config::{CodecConfig, ENV_AES_KEY, ENV_APP_ID, ENV_TOKEN};
pub use codec::{EnvelopeCodec, OpenedEnvelope};
