//! Stored envelope formats and their classification.
//!
//! Two on-disk formats coexist: the current prefixed-base64 envelope and a
//! read-only legacy colon-delimited hex triple. A stored string carries no
//! explicit "encrypted" flag, so [`classify`] is the single source of truth
//! for dispatch. It runs before every decrypt attempt and doubles as the
//! guard that keeps the encrypt path from double-encrypting.

use crate::error::Error;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Literal prefix marking the current envelope format. Never reused for
/// anything else.
pub const V1_PREFIX: &str = "enc:v1:";

/// Nonce size for the current format (96 bits).
pub const V1_NONCE_SIZE: usize = 12;

/// Nonce (IV) size for the legacy format (128 bits).
pub const LEGACY_NONCE_SIZE: usize = 16;

/// Authentication tag size for both formats (128 bits).
pub const TAG_SIZE: usize = 16;

/// Hex length of a legacy nonce or tag segment.
const LEGACY_SEGMENT_LEN: usize = 32;

/// Detected stored representation of a field value.
///
/// Closed set on purpose: adding a future format is a one-place change here
/// rather than prefix sniffing scattered across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Current envelope: `"enc:v1:" + base64(nonce ∥ tag ∥ ciphertext)`.
    V1,
    /// Legacy envelope: `hex(iv) ":" hex(tag) ":" hex(ciphertext)`.
    Legacy,
    /// Anything else; the value was never encrypted.
    Plain,
}

/// Classifies a stored string.
///
/// `Legacy` requires at least two colon separators with the first two
/// segments each exactly 32 hex characters (16-byte IV, 16-byte tag). The
/// length check matters: without it, arbitrary colon-containing plaintext
/// would be misclassified as legacy ciphertext. A plaintext value that
/// happens to match the full 32/32-hex shape is still misclassified; that
/// residual risk is accepted and kept bounded by centralizing the rule here.
#[must_use]
pub fn classify(value: &str) -> Format {
    if value.starts_with(V1_PREFIX) {
        return Format::V1;
    }
    let mut parts = value.splitn(3, ':');
    if let (Some(iv), Some(tag), Some(_)) = (parts.next(), parts.next(), parts.next()) {
        if is_hex_segment(iv) && is_hex_segment(tag) {
            return Format::Legacy;
        }
    }
    Format::Plain
}

fn is_hex_segment(segment: &str) -> bool {
    segment.len() == LEGACY_SEGMENT_LEN && segment.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parsed current-format envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeV1 {
    /// Random per-encryption nonce.
    pub nonce: [u8; V1_NONCE_SIZE],
    /// Authentication tag over the ciphertext.
    pub tag: [u8; TAG_SIZE],
    /// Encrypted payload.
    pub ciphertext: Vec<u8>,
}

impl EnvelopeV1 {
    /// Encodes as `"enc:v1:" + base64(nonce ∥ tag ∥ ciphertext)`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(V1_NONCE_SIZE + TAG_SIZE + self.ciphertext.len());
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.tag);
        raw.extend_from_slice(&self.ciphertext);
        format!("{V1_PREFIX}{}", BASE64.encode(raw))
    }

    /// Decodes a `V1`-classified string back into its parts.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedEnvelope` if the prefix is absent, the
    /// payload is not valid base64, or it is too short to hold a nonce and
    /// tag.
    pub fn decode(value: &str) -> Result<Self, Error> {
        let payload = value
            .strip_prefix(V1_PREFIX)
            .ok_or_else(|| Error::MalformedEnvelope("missing version prefix".to_string()))?;

        let raw = BASE64
            .decode(payload)
            .map_err(|e| Error::MalformedEnvelope(format!("invalid base64: {e}")))?;

        if raw.len() < V1_NONCE_SIZE + TAG_SIZE {
            return Err(Error::MalformedEnvelope(format!(
                "payload too short: {} bytes",
                raw.len()
            )));
        }

        let mut nonce = [0u8; V1_NONCE_SIZE];
        nonce.copy_from_slice(&raw[..V1_NONCE_SIZE]);

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&raw[V1_NONCE_SIZE..V1_NONCE_SIZE + TAG_SIZE]);

        Ok(Self { nonce, tag, ciphertext: raw[V1_NONCE_SIZE + TAG_SIZE..].to_vec() })
    }
}

/// Parsed legacy-format envelope.
///
/// Decode-only: data is never re-encoded in this format. Migration goes
/// through decrypt-then-reencrypt into [`EnvelopeV1`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEnvelope {
    /// 16-byte initialization vector.
    pub iv: [u8; LEGACY_NONCE_SIZE],
    /// Authentication tag over the ciphertext.
    pub tag: [u8; TAG_SIZE],
    /// Encrypted payload.
    pub ciphertext: Vec<u8>,
}

impl LegacyEnvelope {
    /// Decodes a `Legacy`-classified string back into its parts.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedEnvelope` if any segment is missing or not
    /// valid hex of the expected length.
    pub fn decode(value: &str) -> Result<Self, Error> {
        let mut parts = value.splitn(3, ':');
        let (Some(iv_hex), Some(tag_hex), Some(ciphertext_hex)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::MalformedEnvelope(
                "expected iv:tag:ciphertext segments".to_string(),
            ));
        };

        Ok(Self {
            iv: decode_fixed(iv_hex, "iv")?,
            tag: decode_fixed(tag_hex, "tag")?,
            ciphertext: hex::decode(ciphertext_hex)
                .map_err(|e| Error::MalformedEnvelope(format!("invalid ciphertext hex: {e}")))?,
        })
    }
}

fn decode_fixed<const N: usize>(segment: &str, label: &str) -> Result<[u8; N], Error> {
    let raw = hex::decode(segment)
        .map_err(|e| Error::MalformedEnvelope(format!("invalid {label} hex: {e}")))?;
    raw.try_into().map_err(|raw: Vec<u8>| {
        Error::MalformedEnvelope(format!("{label}: expected {N} bytes, got {}", raw.len()))
    })
}
