//! Error types for fieldseal operations.

use std::fmt;

/// Main error type for fieldseal operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No encryption secret configured; refusing to operate rather than
    /// silently writing plaintext
    #[error("no encryption secret configured")]
    MissingSecret,

    /// Legacy key material is present but unusable
    #[error("invalid legacy key: {0}")]
    InvalidLegacyKey(String),

    /// Encryption operation failed; fatal to the enclosing write
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption operation failed
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Authentication tag verification failed (wrong key, or data is
    /// corrupted or tampered)
    #[error("authentication failed: ciphertext may be corrupted or tampered")]
    AuthenticationFailed,

    /// Stored value does not parse as the envelope its shape claims
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Blind index generation failed
    #[error("blind index generation failed: {0}")]
    IndexGenerationFailed(String),

    /// Document store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors specific to document store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced document does not exist
    NotFound(String),

    /// Update payload shape not understood by the store
    InvalidUpdate(String),

    /// Backend failure
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidUpdate(msg) => write!(f, "invalid update payload: {msg}"),
            Self::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
