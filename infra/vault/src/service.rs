//! # Crypto Service
//!
//! The seam between the state layer and cryptography. State code only ever talks to
//! `dyn CryptoService`, so tests can substitute gated or failing implementations.

use crate::error::VaultError;
use crate::keys::SymmetricKey;
use crate::types::EncString;
use async_trait::async_trait;
use std::fmt::Debug;

/// Authenticated encryption of individual fields.
///
/// `aad` binds a ciphertext to its purpose (typically the data domain tag), so a value
/// sealed for one domain cannot be opened as another.
#[async_trait]
pub trait CryptoService: Send + Sync + Debug {
    /// # Errors
    /// Returns [`VaultError::Encryption`] or [`VaultError::InvalidKey`].
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<EncString, VaultError>;

    /// # Errors
    /// Returns [`VaultError::Decryption`] on a wrong key, wrong `aad`, or tampered data.
    async fn decrypt(
        &self,
        value: &EncString,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<Vec<u8>, VaultError>;
}

impl<'a> dyn CryptoService + 'a {
    /// Encrypts a UTF-8 string.
    ///
    /// # Errors
    /// See [`CryptoService::encrypt`].
    pub async fn encrypt_text(
        &self,
        text: &str,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<EncString, VaultError> {
        self.encrypt(text.as_bytes(), key, aad).await
    }

    /// Decrypts into a UTF-8 string.
    ///
    /// # Errors
    /// See [`CryptoService::decrypt`]; additionally [`VaultError::InvalidPayload`] if the
    /// plaintext is not valid UTF-8.
    pub async fn decrypt_text(
        &self,
        value: &EncString,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<String, VaultError> {
        let bytes = self.decrypt(value, key, aad).await?;
        String::from_utf8(bytes).map_err(|e| VaultError::InvalidPayload {
            message: e.to_string().into(),
            context: Some("plaintext is not UTF-8".into()),
        })
    }
}
