//! # Fieldseal
//!
//! Transparent field-level encryption and blind-index search for document
//! stores.
//!
//! ## Features
//!
//! - AES-256-GCM field encryption with a self-describing string envelope
//! - Read-only compatibility with a legacy colon-delimited hex format,
//!   including a decrypt-only fallback key
//! - Deterministic blind indexes (HMAC-SHA256) for exact-match search over
//!   non-deterministic ciphertext
//! - Idempotent encode/decode: already-encrypted values are never encrypted
//!   twice, plain values are never "decrypted"
//! - An explicit repository boundary instead of object-mapper lifecycle
//!   hooks: plaintext in, plaintext out
//!
//! ## Example
//!
//! ```rust,ignore
//! use fieldseal::prelude::*;
//!
//! let keyring = Arc::new(Keyring::new(&SealConfig::new(secret))?);
//! let policy = FieldPolicy::new().encrypt_field("name").index_field("name");
//! let clients = Repository::new(store, DocumentCodec::new(keyring, policy));
//!
//! let id = clients.insert(fields)?;
//! let matches = clients.find_by_index("name", "acme corp")?;
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod blind_index;
pub mod cipher;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod keyring;
pub mod policy;
pub mod repository;
pub mod store;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::blind_index::{blind_index, searchable_hash};
    pub use crate::cipher::FieldCipher;
    pub use crate::codec::{Document, DocumentCodec, Fields};
    pub use crate::envelope::{classify, Format};
    pub use crate::error::{Error, StoreError};
    pub use crate::keyring::{Keyring, SealConfig};
    pub use crate::policy::FieldPolicy;
    pub use crate::repository::Repository;
    pub use crate::store::{DocumentStore, MemoryStore};
}
