//! Blind index generation for exact-match search over encrypted fields.
//!
//! Ciphertext is non-deterministic (fresh nonce per encryption), so equality
//! queries cannot run against it. A blind index is a deterministic keyed
//! hash of the plaintext, stored in a sibling field and matched against the
//! hash of the query term. It reveals equality and nothing else: no
//! substring, prefix, or fuzzy matching is possible from it.

use crate::error::Error;
use crate::keyring::Keyring;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of a blind index (full HMAC-SHA256 width).
pub const BLIND_INDEX_LEN: usize = 64;

/// Normalizes a value for case- and whitespace-insensitive lookup.
#[must_use]
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Computes the blind index of a plaintext value.
///
/// `blind_index(x) == blind_index(y)` exactly when
/// `normalize(x) == normalize(y)`. Empty and whitespace-only values yield an
/// empty string — never the HMAC of an empty buffer — so absent fields do
/// not all collide under search.
///
/// # Errors
///
/// Returns `Error::IndexGenerationFailed` if the keyed hash cannot be
/// initialized.
///
/// # Example
///
/// ```
/// use fieldseal::blind_index::blind_index;
/// use fieldseal::keyring::{Keyring, SealConfig};
///
/// let keyring = Keyring::new(&SealConfig::new("secret"))?;
/// assert_eq!(
///     blind_index(&keyring, "Acme Corp")?,
///     blind_index(&keyring, "  acme corp ")?,
/// );
/// # Ok::<(), fieldseal::error::Error>(())
/// ```
pub fn blind_index(keyring: &Keyring, value: &str) -> Result<String, Error> {
    let normalized = Zeroizing::new(normalize(value));
    if normalized.is_empty() {
        return Ok(String::new());
    }
    keyed_hex(keyring, normalized.as_bytes())
}

/// Byte-exact variant of [`blind_index`]: no trimming or case folding.
///
/// Used where lookups must distinguish case or surrounding whitespace. Keyed
/// with the same secret, so indexes from either variant stay tied to the
/// same configuration.
///
/// # Errors
///
/// Returns `Error::IndexGenerationFailed` if the keyed hash cannot be
/// initialized.
pub fn searchable_hash(keyring: &Keyring, value: &str) -> Result<String, Error> {
    if value.is_empty() {
        return Ok(String::new());
    }
    keyed_hex(keyring, value.as_bytes())
}

fn keyed_hex(keyring: &Keyring, data: &[u8]) -> Result<String, Error> {
    let mut mac =
        HmacSha256::new_from_slice(keyring.index_secret().expose_secret().as_bytes())
            .map_err(|e| Error::IndexGenerationFailed(format!("invalid key material: {e}")))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::SealConfig;

    fn keyring(secret: &str) -> Keyring {
        Keyring::new(&SealConfig::new(secret)).expect("keyring failed")
    }

    #[test]
    fn test_blind_index_deterministic() {
        let keyring = keyring("test secret");

        let index1 = blind_index(&keyring, "Acme Corp").unwrap();
        let index2 = blind_index(&keyring, "Acme Corp").unwrap();

        assert_eq!(index1, index2);
        assert_eq!(index1.len(), BLIND_INDEX_LEN);
    }

    #[test]
    fn test_blind_index_normalizes() {
        let keyring = keyring("test secret");

        assert_eq!(
            blind_index(&keyring, "Acme Corp").unwrap(),
            blind_index(&keyring, "  acme corp ").unwrap()
        );
        assert_eq!(
            blind_index(&keyring, "ACME CORP").unwrap(),
            blind_index(&keyring, "acme corp").unwrap()
        );
    }

    #[test]
    fn test_blind_index_distinguishes_values() {
        let keyring = keyring("test secret");

        assert_ne!(
            blind_index(&keyring, "Acme Corp").unwrap(),
            blind_index(&keyring, "Acme Corp.").unwrap()
        );
    }

    #[test]
    fn test_blind_index_depends_on_secret() {
        let index1 = blind_index(&keyring("secret one"), "Acme Corp").unwrap();
        let index2 = blind_index(&keyring("secret two"), "Acme Corp").unwrap();
        assert_ne!(index1, index2);
    }

    #[test]
    fn test_blind_index_empty_input() {
        let keyring = keyring("test secret");

        assert_eq!(blind_index(&keyring, "").unwrap(), "");
        assert_eq!(blind_index(&keyring, "   ").unwrap(), "");
    }

    #[test]
    fn test_blind_index_lowercase_hex() {
        let keyring = keyring("test secret");
        let index = blind_index(&keyring, "Acme Corp").unwrap();
        assert!(index.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_searchable_hash_is_case_sensitive() {
        let keyring = keyring("test secret");

        assert_ne!(
            searchable_hash(&keyring, "Acme Corp").unwrap(),
            searchable_hash(&keyring, "acme corp").unwrap()
        );
        assert_ne!(
            searchable_hash(&keyring, "acme").unwrap(),
            searchable_hash(&keyring, " acme ").unwrap()
        );
    }

    #[test]
    fn test_searchable_hash_matches_blind_index_on_normalized_input() {
        let keyring = keyring("test secret");

        assert_eq!(
            searchable_hash(&keyring, "acme corp").unwrap(),
            blind_index(&keyring, "Acme Corp").unwrap()
        );
    }

    // RFC 4231 Test Case 2 (HMAC-SHA-256): the exact variant is a direct
    // HMAC of the value under the raw secret.
    #[test]
    fn test_searchable_hash_rfc4231_vector() {
        let keyring = keyring("Jefe");
        let hash = searchable_hash(&keyring, "what do ya want for nothing?").unwrap();
        assert_eq!(
            hash,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_blind_index_unicode() {
        let keyring = keyring("test secret");

        assert_eq!(
            blind_index(&keyring, "Müller GmbH").unwrap(),
            blind_index(&keyring, "müller gmbh").unwrap()
        );
    }
}
