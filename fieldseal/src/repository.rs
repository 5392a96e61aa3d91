//! Repository: the explicit save/load boundary around a document store.
//!
//! Application code hands plaintext documents in and gets plaintext
//! documents back; blind indexing, encryption, and decryption all happen
//! inside the boundary. Exact-match search on encrypted fields goes through
//! [`Repository::find_by_index`], which hashes the query term and never
//! touches the cipher engine.

use crate::codec::{Document, DocumentCodec, Fields};
use crate::error::Error;
use crate::store::DocumentStore;
use serde_json::Value;

/// Save/load gateway for one entity type.
///
/// # Example
///
/// ```
/// use fieldseal::prelude::*;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let keyring = Arc::new(Keyring::new(&SealConfig::new("secret"))?);
/// let policy = FieldPolicy::new().encrypt_field("name").index_field("name");
/// let clients = Repository::new(MemoryStore::new(), DocumentCodec::new(keyring, policy));
///
/// let fields = json!({"name": "Acme Corp"}).as_object().unwrap().clone();
/// let id = clients.insert(fields)?;
///
/// let loaded = clients.get(&id)?.unwrap();
/// assert_eq!(loaded.get_str("name"), Some("Acme Corp"));
/// # Ok::<(), fieldseal::error::Error>(())
/// ```
pub struct Repository<S: DocumentStore> {
    store: S,
    codec: DocumentCodec,
}

impl<S: DocumentStore> Repository<S> {
    /// Creates a repository over a store and a codec.
    #[must_use]
    pub fn new(store: S, codec: DocumentCodec) -> Self {
        Self { store, codec }
    }

    /// The codec applied at this boundary.
    #[must_use]
    pub fn codec(&self) -> &DocumentCodec {
        &self.codec
    }

    /// The underlying store. Values read through this bypass decryption.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encodes a plaintext field map and persists it. Returns the stored id.
    ///
    /// # Errors
    ///
    /// Propagates encode failures (fatal to the write) and store errors.
    pub fn insert(&self, mut fields: Fields) -> Result<String, Error> {
        self.codec.encode(&mut fields)?;
        Ok(self.store.insert(fields)?)
    }

    /// Loads a document by id, decoded.
    ///
    /// # Errors
    ///
    /// Propagates store errors. Per-field decrypt failures do not error;
    /// the affected fields keep their stored values.
    pub fn get(&self, id: &str) -> Result<Option<Document>, Error> {
        Ok(self.store.get(id)?.map(|fields| self.decode(fields)))
    }

    /// Finds documents by exact match on stored values, decoded.
    ///
    /// Filters match the stored representation, so this is only useful for
    /// plaintext fields and precomputed hash fields; for encrypted fields
    /// use [`find_by_index`](Self::find_by_index).
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn find(&self, filter: &Fields) -> Result<Vec<Document>, Error> {
        Ok(self.store.find(filter)?.into_iter().map(|fields| self.decode(fields)).collect())
    }

    /// First match of [`find`](Self::find), if any.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn find_one(&self, filter: &Fields) -> Result<Option<Document>, Error> {
        Ok(self.store.find(filter)?.into_iter().next().map(|fields| self.decode(fields)))
    }

    /// Exact-match lookup on an encrypted, indexed field.
    ///
    /// The query term is hashed with the blind index function and matched
    /// against the sibling hash field. Matching is on normalized plaintext,
    /// so case and surrounding whitespace do not matter.
    ///
    /// # Errors
    ///
    /// Propagates index and store errors.
    pub fn find_by_index(&self, field: &str, plaintext: &str) -> Result<Vec<Document>, Error> {
        let (hash_field, hash) = self.codec.search_key(field, plaintext)?;
        let mut filter = Fields::new();
        filter.insert(hash_field, Value::String(hash));
        self.find(&filter)
    }

    /// Update-with-return: encodes the payload, applies it, and returns the
    /// re-fetched document decoded.
    ///
    /// # Errors
    ///
    /// Propagates encode failures and store errors.
    pub fn update(&self, id: &str, mut update: Value) -> Result<Option<Document>, Error> {
        self.codec.encode_update(&mut update)?;
        Ok(self.store.update(id, &update)?.map(|fields| self.decode(fields)))
    }

    /// Bulk update by filter; returns the number of documents touched.
    ///
    /// The payload is encoded once and applied to every match, so all
    /// matched documents end up with identical ciphertext for the updated
    /// fields. Fields absent from the payload are untouched.
    ///
    /// # Errors
    ///
    /// Propagates encode failures and store errors.
    pub fn update_where(&self, filter: &Fields, mut update: Value) -> Result<u64, Error> {
        self.codec.encode_update(&mut update)?;
        Ok(self.store.update_where(filter, &update)?)
    }

    /// Removes a document by id; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        Ok(self.store.delete(id)?)
    }

    fn decode(&self, fields: Fields) -> Document {
        let mut document = Document::new(fields);
        self.codec.decode(&mut document);
        document
    }
}
