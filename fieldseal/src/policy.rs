//! Per-entity field encryption policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Suffix appended to a field name to form its sibling hash field.
pub const HASH_FIELD_SUFFIX: &str = "Hash";

/// Declares which fields of an entity type are encrypted at rest, and which
/// of those additionally carry a blind index for exact-match search.
///
/// Declared once per entity type and immutable after being handed to a
/// codec. Index fields are expected to be a subset of the encrypted fields;
/// an index on a plaintext-stored field is pointless but not rejected.
///
/// # Example
///
/// ```
/// use fieldseal::policy::FieldPolicy;
///
/// let policy = FieldPolicy::new()
///     .encrypt_field("name")
///     .index_field("name")
///     .encrypt_field("notes");
///
/// assert!(policy.is_encrypted("name"));
/// assert!(policy.is_indexed("name"));
/// assert!(!policy.is_indexed("notes"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    encrypted_fields: BTreeSet<String>,
    blind_index_fields: BTreeSet<String>,
}

impl FieldPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a field for encryption at rest.
    #[must_use]
    pub fn encrypt_field(mut self, field: impl Into<String>) -> Self {
        self.encrypted_fields.insert(field.into());
        self
    }

    /// Marks a field for a sibling blind index. The field should normally
    /// also be listed via [`encrypt_field`](Self::encrypt_field).
    #[must_use]
    pub fn index_field(mut self, field: impl Into<String>) -> Self {
        self.blind_index_fields.insert(field.into());
        self
    }

    /// Returns whether `field` is encrypted at rest.
    #[must_use]
    pub fn is_encrypted(&self, field: &str) -> bool {
        self.encrypted_fields.contains(field)
    }

    /// Returns whether `field` carries a blind index.
    #[must_use]
    pub fn is_indexed(&self, field: &str) -> bool {
        self.blind_index_fields.contains(field)
    }

    /// Iterates the encrypted field names in stable order.
    pub fn encrypted_fields(&self) -> impl Iterator<Item = &str> {
        self.encrypted_fields.iter().map(String::as_str)
    }

    /// Iterates the indexed field names in stable order.
    pub fn blind_index_fields(&self) -> impl Iterator<Item = &str> {
        self.blind_index_fields.iter().map(String::as_str)
    }

    /// Sibling field that stores the blind index for `field`.
    #[must_use]
    pub fn hash_field(field: &str) -> String {
        format!("{field}{HASH_FIELD_SUFFIX}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder() {
        let policy = FieldPolicy::new()
            .encrypt_field("name")
            .index_field("name")
            .encrypt_field("notes");

        assert!(policy.is_encrypted("name"));
        assert!(policy.is_encrypted("notes"));
        assert!(policy.is_indexed("name"));
        assert!(!policy.is_indexed("notes"));
        assert!(!policy.is_encrypted("plan"));
    }

    #[test]
    fn test_hash_field_name() {
        assert_eq!(FieldPolicy::hash_field("name"), "nameHash");
        assert_eq!(FieldPolicy::hash_field("taxId"), "taxIdHash");
    }

    // Subset discipline is by convention, not construction.
    #[test]
    fn test_index_without_encrypt_is_permitted() {
        let policy = FieldPolicy::new().index_field("name");
        assert!(policy.is_indexed("name"));
        assert!(!policy.is_encrypted("name"));
    }

    #[test]
    fn test_policy_serde_round_trip() {
        let policy = FieldPolicy::new().encrypt_field("name").index_field("name");
        let json = serde_json::to_string(&policy).expect("serialize failed");
        let parsed: FieldPolicy = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(parsed, policy);
    }
}
