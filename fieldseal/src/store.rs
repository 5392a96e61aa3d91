//! Document store seam and the bundled in-memory implementation.
//!
//! The encryption layer needs very little from a store: insert, fetch,
//! exact-match find, and update. Everything it hands over is already in
//! stored form (ciphertext plus hash fields), and everything it gets back is
//! decoded by the caller. Backup/restore tooling built on a store must copy
//! these values byte-for-byte; they are opaque strings at this level.

use crate::codec::Fields;
use crate::error::StoreError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field holding a document's identifier.
pub const ID_FIELD: &str = "_id";

/// Set operator recognized in update payloads.
const SET_OPERATOR: &str = "$set";

/// Minimal contract the encryption layer requires from a document store.
///
/// Implementations must be usable from multiple threads; the layer itself
/// holds no shared mutable state across operations.
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` on storage failure.
    fn insert(&self, fields: Fields) -> Result<String, StoreError>;

    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` on storage failure.
    fn get(&self, id: &str) -> Result<Option<Fields>, StoreError>;

    /// Returns all documents whose fields exactly match `filter`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` on storage failure.
    fn find(&self, filter: &Fields) -> Result<Vec<Fields>, StoreError>;

    /// Applies `update` to the document with the given id and returns the
    /// updated fields, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidUpdate` if the payload shape is not
    /// understood.
    fn update(&self, id: &str, update: &Value) -> Result<Option<Fields>, StoreError>;

    /// Applies `update` to every document matching `filter`; returns the
    /// number of documents touched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidUpdate` if the payload shape is not
    /// understood.
    fn update_where(&self, filter: &Fields, update: &Value) -> Result<u64, StoreError>;

    /// Removes a document by id; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` on storage failure.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// In-memory document store for tests, examples, and small deployments.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Fields>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, mut fields: Fields) -> Result<String, StoreError> {
        let id = match fields.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        self.documents.write().insert(id.clone(), fields);
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Option<Fields>, StoreError> {
        Ok(self.documents.read().get(id).cloned())
    }

    fn find(&self, filter: &Fields) -> Result<Vec<Fields>, StoreError> {
        Ok(self
            .documents
            .read()
            .values()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect())
    }

    fn update(&self, id: &str, update: &Value) -> Result<Option<Fields>, StoreError> {
        let mut documents = self.documents.write();
        let Some(doc) = documents.get_mut(id) else {
            return Ok(None);
        };
        apply_update(doc, update)?;
        Ok(Some(doc.clone()))
    }

    fn update_where(&self, filter: &Fields, update: &Value) -> Result<u64, StoreError> {
        let mut documents = self.documents.write();
        let mut touched = 0;
        for doc in documents.values_mut() {
            if matches_filter(doc, filter) {
                apply_update(doc, update)?;
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.documents.write().remove(id).is_some())
    }
}

fn matches_filter(doc: &Fields, filter: &Fields) -> bool {
    filter.iter().all(|(field, expected)| doc.get(field) == Some(expected))
}

fn apply_update(doc: &mut Fields, update: &Value) -> Result<(), StoreError> {
    let Some(payload) = update.as_object() else {
        return Err(StoreError::InvalidUpdate("update payload must be an object".to_string()));
    };

    let changes = if payload.keys().any(|key| key.starts_with('$')) {
        match payload.get(SET_OPERATOR) {
            Some(Value::Object(set)) => set,
            Some(_) => {
                return Err(StoreError::InvalidUpdate("$set must be an object".to_string()))
            }
            None => {
                return Err(StoreError::InvalidUpdate(
                    "unsupported update operator".to_string(),
                ))
            }
        }
    } else {
        payload
    };

    for (field, value) in changes {
        doc.insert(field.clone(), value.clone());
    }
    Ok(())
}
