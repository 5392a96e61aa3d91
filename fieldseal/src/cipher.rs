//! Field encryption and decryption over the envelope formats.
//!
//! Both formats use AES-256-GCM. The current format carries a 12-byte nonce
//! inside a prefixed base64 envelope; the legacy format carries a 16-byte IV
//! in a colon-delimited hex triple and is decrypt-only. Dispatch runs on
//! [`classify`](crate::envelope::classify) so both encrypt and decrypt are
//! idempotent: already-encrypted input is never encrypted again, and plain
//! input is never "decrypted".

use crate::envelope::{self, EnvelopeV1, Format, LegacyEnvelope, TAG_SIZE, V1_NONCE_SIZE};
use crate::error::Error;
use crate::keyring::Keyring;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use aes_gcm::aes::Aes256;
use aes_gcm::{AeadInPlace, Aes256Gcm, AesGcm, KeyInit};
use secrecy::{ExposeSecret, SecretVec};
use std::sync::Arc;

/// AES-256-GCM with the legacy 128-bit nonce.
type LegacyAesGcm = AesGcm<Aes256, U16>;

/// Encrypts and decrypts individual field values.
///
/// Stateless apart from the shared read-only keyring, so a cipher may be
/// cloned freely and used concurrently across documents.
///
/// # Example
///
/// ```
/// use fieldseal::cipher::FieldCipher;
/// use fieldseal::keyring::{Keyring, SealConfig};
/// use std::sync::Arc;
///
/// let keyring = Arc::new(Keyring::new(&SealConfig::new("secret"))?);
/// let cipher = FieldCipher::new(keyring);
///
/// let sealed = cipher.encrypt("Acme Corp")?;
/// assert!(sealed.starts_with("enc:v1:"));
/// assert_eq!(cipher.decrypt(&sealed)?, "Acme Corp");
/// # Ok::<(), fieldseal::error::Error>(())
/// ```
#[derive(Clone)]
pub struct FieldCipher {
    keyring: Arc<Keyring>,
}

impl FieldCipher {
    /// Creates a cipher over the given keyring.
    #[must_use]
    pub fn new(keyring: Arc<Keyring>) -> Self {
        Self { keyring }
    }

    /// Encrypts a plaintext field value into the current envelope.
    ///
    /// A fresh random nonce is drawn per call, so two encryptions of the
    /// same plaintext differ — equality queries go through the blind index
    /// instead. Values already in either envelope format are returned
    /// unchanged; legacy data is migrated by rewrap, not by write-path
    /// re-encryption.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncryptionFailed` on an underlying cipher fault.
    /// Callers must treat this as fatal to the enclosing write.
    pub fn encrypt(&self, value: &str) -> Result<String, Error> {
        match envelope::classify(value) {
            Format::V1 | Format::Legacy => Ok(value.to_string()),
            Format::Plain => self.encrypt_plain(value),
        }
    }

    fn encrypt_plain(&self, value: &str) -> Result<String, Error> {
        let cipher = Aes256Gcm::new_from_slice(self.keyring.cipher_key().expose_secret())
            .map_err(|e| Error::EncryptionFailed(format!("invalid key: {e}")))?;

        let mut nonce = [0u8; V1_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let mut buffer = value.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
            .map_err(|e| Error::EncryptionFailed(format!("AES-256-GCM failure: {e}")))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);

        Ok(EnvelopeV1 { nonce, tag: tag_bytes, ciphertext: buffer }.encode())
    }

    /// Decrypts a stored field value, dispatching on its detected format.
    ///
    /// Plain values are returned unchanged — administrative data written
    /// before encryption was enabled stays readable. Legacy values are tried
    /// against the derived key first, then once against the configured
    /// legacy raw key; no further fallbacks.
    ///
    /// # Errors
    ///
    /// Returns `Error::AuthenticationFailed` on tag mismatch,
    /// `Error::MalformedEnvelope` if the value does not parse, or
    /// `Error::DecryptionFailed` if the recovered bytes are not UTF-8.
    /// Per-field recovery (leaving the raw value in place) is the caller's
    /// decision, not this engine's.
    pub fn decrypt(&self, value: &str) -> Result<String, Error> {
        match envelope::classify(value) {
            Format::Plain => Ok(value.to_string()),
            Format::V1 => self.decrypt_v1(value),
            Format::Legacy => self.decrypt_legacy(value),
        }
    }

    fn decrypt_v1(&self, value: &str) -> Result<String, Error> {
        let env = EnvelopeV1::decode(value)?;

        let cipher = Aes256Gcm::new_from_slice(self.keyring.cipher_key().expose_secret())
            .map_err(|e| Error::DecryptionFailed(format!("invalid key: {e}")))?;

        let mut buffer = env.ciphertext;
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&env.nonce),
                b"",
                &mut buffer,
                GenericArray::from_slice(&env.tag),
            )
            .map_err(|_| Error::AuthenticationFailed)?;

        into_plaintext(buffer)
    }

    fn decrypt_legacy(&self, value: &str) -> Result<String, Error> {
        let env = LegacyEnvelope::decode(value)?;

        match decrypt_legacy_with(self.keyring.cipher_key(), &env) {
            Ok(plaintext) => Ok(plaintext),
            Err(primary_err) => match self.keyring.legacy_key() {
                Some(legacy_key) => decrypt_legacy_with(legacy_key, &env),
                None => Err(primary_err),
            },
        }
    }
}

fn decrypt_legacy_with(key: &SecretVec<u8>, env: &LegacyEnvelope) -> Result<String, Error> {
    let cipher = LegacyAesGcm::new_from_slice(key.expose_secret())
        .map_err(|e| Error::DecryptionFailed(format!("invalid key: {e}")))?;

    let mut buffer = env.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&env.iv),
            b"",
            &mut buffer,
            GenericArray::from_slice(&env.tag),
        )
        .map_err(|_| Error::AuthenticationFailed)?;

    into_plaintext(buffer)
}

fn into_plaintext(buffer: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(buffer)
        .map_err(|_| Error::DecryptionFailed("plaintext is not valid UTF-8".to_string()))
}
