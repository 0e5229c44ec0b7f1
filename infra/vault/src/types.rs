use crate::error::{VaultError, VaultErrorExt};
use aead::{AeadInOut, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// --- Aliases ---

pub type Aes = Aes256Gcm;
pub type ChaCha = ChaCha20Poly1305;

pub trait VaultCipher: AeadInOut + KeyInit + Send + Sync + 'static {}
impl<T: AeadInOut + KeyInit + Send + Sync + 'static> VaultCipher for T {}

// --- Payload format constants ---

/// Current blob format version.
pub(crate) const PAYLOAD_VERSION_V1: u8 = 1;

/// Header layout: `[version: u8][flags: u8]`
pub(crate) const HEADER_LEN: usize = 2;

/// AEAD nonce length (96-bit).
pub(crate) const NONCE_LEN: usize = 12;

/// AEAD tag length (128-bit).
pub(crate) const TAG_LEN: usize = 16;

pub(crate) const MIN_PAYLOAD_LEN: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

/// Flag bit: plaintext was compressed before encryption.
pub(crate) const FLAG_COMPRESSED: u8 = 1 << 0;

// --- Container ---

/// Opaque ciphertext of one encrypted field.
///
/// ```text
/// [V(1)][FLAGS(1)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
/// ```
///
/// Serialized as unpadded standard base64 text, so it can sit inside JSON
/// records and API payloads unchanged.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncString(Vec<u8>);

impl EncString {
    /// Wraps raw blob bytes after a structural length/version check.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidPayload`] if the blob is shorter than the fixed
    /// header, nonce and tag, or carries an unknown version.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, VaultError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_PAYLOAD_LEN {
            return Err(VaultError::InvalidPayload {
                message: format!(
                    "Payload too short ({} bytes). Expected at least {MIN_PAYLOAD_LEN} bytes",
                    bytes.len()
                )
                .into(),
                context: None,
            });
        }
        if bytes[0] != PAYLOAD_VERSION_V1 {
            return Err(VaultError::InvalidPayload {
                message: "Unsupported payload version".into(),
                context: Some(format!("version={}", bytes[0]).into()),
            });
        }
        Ok(Self(bytes))
    }

    /// Parses the base64 text form.
    ///
    /// # Errors
    /// Returns [`VaultError::Encoding`] for invalid base64 and
    /// [`VaultError::InvalidPayload`] for a malformed blob.
    pub fn parse(text: &str) -> Result<Self, VaultError> {
        let bytes = STANDARD_NO_PAD.decode(text.trim_end_matches('=')).context("EncString")?;
        Self::from_bytes(bytes)
    }

    pub(crate) const fn from_sealed(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        self.0[0]
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        (self.0[1] & FLAG_COMPRESSED) != 0
    }

    /// Splits the blob into `(header, nonce, ciphertext, tag)`.
    #[must_use]
    pub fn split(&self) -> (&[u8], &[u8], &[u8], &[u8]) {
        let (header, rest) = self.0.split_at(HEADER_LEN);
        let (nonce, rest) = rest.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);
        (header, nonce, ciphertext, tag)
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(&self.0)
    }
}

impl fmt::Debug for EncString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncString(v{}, {} bytes)", self.version(), self.0.len())
    }
}

impl fmt::Display for EncString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl FromStr for EncString {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<[u8]> for EncString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for EncString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for EncString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
