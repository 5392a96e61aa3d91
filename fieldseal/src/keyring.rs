//! Key material derivation and configuration.
//!
//! The keyring is an explicit dependency threaded through the cipher and
//! codec layers, never ambient process state. It is built once from
//! [`SealConfig`] at initialization and is read-only afterwards, which is
//! what makes concurrent use safe without locking.

use crate::error::Error;
use secrecy::{ExposeSecret, SecretString, SecretVec};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Cipher key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Configuration surface consumed by [`Keyring::new`].
///
/// Deserializable so the host application can embed it in its own
/// configuration file.
///
/// # Example
///
/// ```
/// use fieldseal::keyring::SealConfig;
///
/// let config = SealConfig::new("operator-managed secret")
///     .with_legacy_key("ab".repeat(32));
/// ```
#[derive(Clone, Deserialize)]
pub struct SealConfig {
    /// Operator-supplied high-entropy secret. Used both for cipher key
    /// derivation and as blind-index key material.
    pub secret: SecretString,

    /// Optional pre-derived legacy key as 64 hex characters. Decrypt-only:
    /// never used for new writes.
    #[serde(default)]
    pub legacy_key: Option<String>,
}

impl SealConfig {
    /// Creates a configuration with the given secret and no legacy key.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: SecretString::new(secret.into()), legacy_key: None }
    }

    /// Sets the legacy raw key (hex) for backward decryption.
    #[must_use]
    pub fn with_legacy_key(mut self, key_hex: impl Into<String>) -> Self {
        self.legacy_key = Some(key_hex.into());
        self
    }
}

/// Resolved key material: the derived cipher key, the optional legacy key,
/// and the raw secret for blind indexes.
pub struct Keyring {
    cipher_key: SecretVec<u8>,
    legacy_key: Option<SecretVec<u8>>,
    index_secret: SecretString,
}

impl Keyring {
    /// Resolves key material from configuration.
    ///
    /// This is the only way to obtain a keyring, so a missing secret fails
    /// initialization outright instead of surfacing later as plaintext
    /// written where ciphertext was expected.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingSecret` if the secret is empty, or
    /// `Error::InvalidLegacyKey` if a legacy key is present but is not
    /// 64 hex characters.
    pub fn new(config: &SealConfig) -> Result<Self, Error> {
        let secret = config.secret.expose_secret();
        if secret.is_empty() {
            return Err(Error::MissingSecret);
        }

        let legacy_key = match &config.legacy_key {
            Some(hex_key) => Some(decode_legacy_key(hex_key)?),
            None => None,
        };

        Ok(Self {
            cipher_key: derive_key(secret),
            legacy_key,
            index_secret: config.secret.clone(),
        })
    }

    /// Derived 32-byte cipher key.
    pub(crate) fn cipher_key(&self) -> &SecretVec<u8> {
        &self.cipher_key
    }

    /// Pre-derived legacy key, if configured.
    pub(crate) fn legacy_key(&self) -> Option<&SecretVec<u8>> {
        self.legacy_key.as_ref()
    }

    /// Raw secret used as blind-index key material. Distinct from the
    /// derived cipher key; see DESIGN.md for the compatibility rationale.
    pub(crate) fn index_secret(&self) -> &SecretString {
        &self.index_secret
    }
}

/// Derives the cipher key as the SHA-256 digest of the secret.
///
/// Deterministic on purpose: the same secret must always yield the same
/// key, or previously written data becomes unreadable. The secret is
/// expected to be operator-managed high-entropy material, so a one-way
/// digest suffices and a password-hashing KDF is not used.
#[must_use]
pub fn derive_key(secret: &str) -> SecretVec<u8> {
    let digest = Sha256::digest(secret.as_bytes());
    SecretVec::new(digest.to_vec())
}

fn decode_legacy_key(hex_key: &str) -> Result<SecretVec<u8>, Error> {
    let raw = hex::decode(hex_key)
        .map_err(|e| Error::InvalidLegacyKey(format!("not hex: {e}")))?;

    if raw.len() != KEY_SIZE {
        return Err(Error::InvalidLegacyKey(format!(
            "expected {KEY_SIZE} bytes, got {}",
            raw.len()
        )));
    }

    Ok(SecretVec::new(raw))
}
