//! Codec configuration.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{EnvelopeError, Result, ENCODED_KEY_LEN};

/// Environment variable holding the 43-character `EncodingAESKey`.
pub const ENV_AES_KEY: &str = "WECHAT_ENCODING_AES_KEY";

/// Environment variable holding the signing token.
pub const ENV_TOKEN: &str = "WECHAT_TOKEN";

/// Environment variable holding the app id.
pub const ENV_APP_ID: &str = "WECHAT_APP_ID";

/// Key, token and app id for one callback endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecConfig {
    /// Base64 AES key as issued by the platform, without the trailing `=`.
    #[serde(alias = "encodingAesKey")]
    pub aes_key: String,
    /// Shared signing token.
    pub token: String,
    /// Application id embedded in every plaintext.
    pub app_id: String,
}

impl CodecConfig {
    pub fn new(
        aes_key: impl Into<String>,
        token: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            aes_key: aes_key.into(),
            token: token.into(),
            app_id: app_id.into(),
        }
    }

    /// Parse and validate a JSON config object.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EnvelopeError::InvalidConfig(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            aes_key: read_env(ENV_AES_KEY)?,
            token: read_env(ENV_TOKEN)?,
            app_id: read_env(ENV_APP_ID)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check field shapes without decoding the key.
    pub fn validate(&self) -> Result<()> {
        if self.aes_key.len() != ENCODED_KEY_LEN {
            return Err(EnvelopeError::InvalidConfig(format!(
                "AES key must be {} characters, got {}",
                ENCODED_KEY_LEN,
                self.aes_key.len()
            )));
        }
        if self.token.is_empty() {
            return Err(EnvelopeError::InvalidConfig("Token is empty".into()));
        }
        if self.app_id.is_empty() {
            return Err(EnvelopeError::InvalidConfig("App id is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecConfig")
            .field("aes_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("app_id", &self.app_id)
            .finish()
    }
}

fn read_env(name: &str) -> Result<String> {
    env::var(name).map_err(|e| EnvelopeError::InvalidConfig(format!("{}: {}", name, e)))
}
