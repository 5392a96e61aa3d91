//! Encode/decode boundary between plaintext documents and their stored form.
//!
//! This codec is the seam the surrounding application goes through instead
//! of object-mapper lifecycle hooks. A document crosses it once per write
//! (blind indexes computed from still-plaintext values, then encryption) and
//! once per read (decryption, with per-field failures left as ciphertext).
//! Making the transformation an explicit call keeps it testable and keeps
//! "saving" from silently rewriting fields.

use crate::blind_index::blind_index;
use crate::cipher::FieldCipher;
use crate::envelope::{self, Format};
use crate::error::Error;
use crate::keyring::Keyring;
use crate::policy::FieldPolicy;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw field map of a stored document.
pub type Fields = Map<String, Value>;

/// Set operator recognized in update payloads.
const SET_OPERATOR: &str = "$set";

/// An in-memory document: its field map plus the marker that suppresses a
/// second decrypt pass when the same instance flows through
/// [`DocumentCodec::decode`] again.
///
/// The marker is per-instance state only. It is never serialized and never
/// shared between instances; two loads of the same stored document get
/// independent markers.
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: Fields,
    decrypt_attempted: bool,
}

impl Document {
    /// Wraps a raw field map, with no decryption attempted yet.
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self { fields, decrypt_attempted: false }
    }

    /// Field map, as decoded so far.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Mutable field map, for application-side edits before a save.
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Consumes the document, returning its field map.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Convenience accessor for a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Like [`get_str`](Self::get_str), but `None` when the stored value is
    /// still in envelope form, i.e. the field failed to decrypt. Callers can
    /// render an "unavailable" placeholder instead of raw ciphertext.
    #[must_use]
    pub fn readable_str(&self, field: &str) -> Option<&str> {
        self.get_str(field).filter(|value| envelope::classify(value) == Format::Plain)
    }
}

/// Applies a [`FieldPolicy`] to documents and update payloads.
pub struct DocumentCodec {
    cipher: FieldCipher,
    keyring: Arc<Keyring>,
    policy: FieldPolicy,
}

impl DocumentCodec {
    /// Creates a codec for one entity type.
    #[must_use]
    pub fn new(keyring: Arc<Keyring>, policy: FieldPolicy) -> Self {
        Self { cipher: FieldCipher::new(Arc::clone(&keyring)), keyring, policy }
    }

    /// The policy this codec applies.
    #[must_use]
    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    /// Prepares a plaintext field map for persistence.
    ///
    /// Blind indexes are stashed first, while the values they hash are still
    /// plaintext; encryption then replaces the values in place. Fields are
    /// processed one at a time and the two passes are order-independent
    /// across fields. Idempotent: values already in envelope form are left
    /// alone and their stored hashes untouched.
    ///
    /// # Errors
    ///
    /// An encryption or index failure aborts the whole write. Persisting
    /// plaintext where ciphertext is expected is not an acceptable fallback.
    pub fn encode(&self, fields: &mut Fields) -> Result<(), Error> {
        self.stash_blind_indexes(fields)?;
        self.encrypt_fields(fields)
    }

    fn stash_blind_indexes(&self, fields: &mut Fields) -> Result<(), Error> {
        for field in self.policy.blind_index_fields() {
            let Some(Value::String(value)) = fields.get(field) else { continue };
            if value.is_empty() || envelope::classify(value) != Format::Plain {
                continue;
            }
            let hash = blind_index(&self.keyring, value)?;
            fields.insert(FieldPolicy::hash_field(field), Value::String(hash));
        }
        Ok(())
    }

    fn encrypt_fields(&self, fields: &mut Fields) -> Result<(), Error> {
        for field in self.policy.encrypted_fields() {
            let Some(value) = fields.get_mut(field) else { continue };
            let Value::String(plain) = value else { continue };
            if envelope::classify(plain) != Format::Plain {
                continue;
            }
            let sealed = self.cipher.encrypt(plain)?;
            *value = Value::String(sealed);
        }
        Ok(())
    }

    /// Decrypts the policy's encrypted fields in place after a read.
    ///
    /// A field that fails to decrypt keeps its raw stored value, so callers
    /// observe it round-tripping unchanged rather than seeing garbage
    /// plaintext; the failure is reported at warn level since it usually
    /// means a secret-rotation mismatch. The per-instance marker
    /// short-circuits repeated invocations so a genuine failure is logged
    /// once, not masked by a second attempt.
    pub fn decode(&self, document: &mut Document) {
        if document.decrypt_attempted {
            debug!("decode skipped: decryption already attempted on this instance");
            return;
        }
        document.decrypt_attempted = true;
        self.decode_fields(&mut document.fields);
    }

    /// Field-map variant of [`decode`](Self::decode) for callers that do not
    /// hold a [`Document`].
    pub fn decode_fields(&self, fields: &mut Fields) {
        for field in self.policy.encrypted_fields() {
            let Some(value) = fields.get_mut(field) else { continue };
            let Value::String(stored) = value else { continue };
            if envelope::classify(stored) == Format::Plain {
                continue;
            }
            match self.cipher.decrypt(stored) {
                Ok(plain) => *value = Value::String(plain),
                Err(error) => {
                    warn!(field, %error, "field left encrypted: decryption failed");
                }
            }
        }
    }

    /// Applies [`encode`](Self::encode) to an update payload before it
    /// reaches the store.
    ///
    /// Both `$set`-operator and flat payload shapes are scanned. Only fields
    /// present in the payload are touched; absent fields get no spurious
    /// hash recomputation. Payloads that are not objects, or that use other
    /// operators without `$set`, pass through unchanged.
    ///
    /// # Errors
    ///
    /// Same failure semantics as [`encode`](Self::encode).
    pub fn encode_update(&self, update: &mut Value) -> Result<(), Error> {
        let Some(payload) = update.as_object_mut() else {
            return Ok(());
        };

        if payload.keys().any(|key| key.starts_with('$')) {
            if let Some(Value::Object(set)) = payload.get_mut(SET_OPERATOR) {
                self.encode(set)?;
            }
            return Ok(());
        }

        self.encode(payload)
    }

    /// Exact-match search key for an indexed field: the sibling hash field
    /// name and the blind index of the query term. Never touches the cipher
    /// engine; the query term is hashed, not encrypted.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexGenerationFailed` if hashing fails.
    pub fn search_key(&self, field: &str, plaintext: &str) -> Result<(String, String), Error> {
        Ok((FieldPolicy::hash_field(field), blind_index(&self.keyring, plaintext)?))
    }
}
