//! Verification token codec.
//!
//! A token is the candidate email encrypted with AES-256-GCM under the
//! process-wide key, laid out as `base64url(nonce || ciphertext)`. Clients treat
//! it as opaque; the store only ever sees its SHA-256 digest.

use crate::config::CoreConfig;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the symmetric key in bytes.
pub const TOKEN_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

/// Token codec failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The configured key is not base64 for exactly 32 bytes.
    #[error("encryption key must be base64 for {TOKEN_KEY_LEN} bytes")]
    MalformedKey,

    /// The cipher refused to encrypt the plaintext.
    #[error("encryption failed")]
    Encrypt,

    /// The token was not produced by this key, or was altered.
    #[error("token could not be decrypted")]
    Decrypt,
}

/// Reversible email-to-token encryption keyed by a single shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
    ephemeral: bool,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ephemeral", &self.ephemeral)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build the codec from config, generating a key when none is configured.
    ///
    /// Tokens issued under a generated key stop verifying after a restart.
    pub fn from_config(config: &CoreConfig) -> Result<Self, TokenError> {
        match config.encryption_key.as_deref() {
            Some(key) => Self::from_base64(key),
            None => {
                tracing::warn!(
                    "no encryption key configured; using an ephemeral key, \
                     outstanding verification links will break on restart"
                );
                Ok(Self::generate())
            }
        }
    }

    /// Build the codec from a base64 (standard or url-safe, padding optional) key.
    pub fn from_base64(key: &str) -> Result<Self, TokenError> {
        let trimmed = key.trim().trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
            .map_err(|_| TokenError::MalformedKey)?;

        if bytes.len() != TOKEN_KEY_LEN {
            return Err(TokenError::MalformedKey);
        }

        let cipher = Aes256Gcm::new_from_slice(&bytes).map_err(|_| TokenError::MalformedKey)?;
        Ok(Self {
            cipher,
            ephemeral: false,
        })
    }

    /// Build the codec around a fresh random key.
    pub fn generate() -> Self {
        let key: [u8; TOKEN_KEY_LEN] = rand::rng().random();
        Self {
            cipher: Aes256Gcm::new(&key.into()),
            ephemeral: true,
        }
    }

    /// Whether the key was generated for this process only.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Encrypt an email into a url-safe token.
    pub fn encode(&self, email: &str) -> Result<String, TokenError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::rng().random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), email.as_bytes())
            .map_err(|_| TokenError::Encrypt)?;

        let mut raw = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Recover the email a token was issued for.
    pub fn decode(&self, token: &str) -> Result<String, TokenError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| TokenError::Decrypt)?;
        if raw.len() <= NONCE_LEN {
            return Err(TokenError::Decrypt);
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| TokenError::Decrypt)
    }
}

/// Hash a token for storage (SHA-256, hex).
pub fn token_hash_sha256(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
