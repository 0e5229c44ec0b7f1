//! Domain descriptors: how one category of user data is keyed, stored and decrypted.

use crate::error::StateError;
use sbox_domain::{DataDomain, ItemId};
use sbox_vault::{CryptoService, EncString, SymmetricKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A list-like domain: many entities per account, keyed by [`ItemId`].
///
/// Implementors are zero-sized markers; all behaviour is associated.
pub trait KeyedDomain: Send + Sync + 'static {
    const DOMAIN: DataDomain;

    type Encrypted: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;
    type Decrypted: Clone + Send + Sync + 'static;

    fn id(item: &Self::Encrypted) -> &ItemId;

    /// Projects one ciphertext entity into its plaintext view.
    fn decrypt(
        ctx: &CryptoContext,
        item: &Self::Encrypted,
    ) -> impl Future<Output = Result<Self::Decrypted, StateError>> + Send;

    /// Stable ordering of the decrypted list.
    fn order(a: &Self::Decrypted, b: &Self::Decrypted) -> Ordering;
}

/// A single-value domain: one ciphertext value per account.
pub trait ValueDomain: Send + Sync + 'static {
    const DOMAIN: DataDomain;

    type Encrypted: Clone
        + Default
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    type Decrypted: Clone + Send + Sync + 'static;

    fn decrypt(
        ctx: &CryptoContext,
        value: &Self::Encrypted,
    ) -> impl Future<Output = Result<Self::Decrypted, StateError>> + Send;
}

/// Crypto capability bound to one account's key for one domain.
///
/// The domain tag doubles as AEAD associated data, so a field sealed for folders
/// never opens as a cipher field even under the same user key.
#[derive(Clone)]
pub struct CryptoContext {
    crypto: Arc<dyn CryptoService>,
    key: SymmetricKey,
    domain: DataDomain,
}

impl fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoContext")
            .field("crypto", &self.crypto)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl CryptoContext {
    #[must_use]
    pub fn new(crypto: Arc<dyn CryptoService>, key: SymmetricKey, domain: DataDomain) -> Self {
        Self { crypto, key, domain }
    }

    #[must_use]
    pub const fn domain(&self) -> DataDomain {
        self.domain
    }

    fn aad(&self) -> &'static [u8] {
        self.domain.tag().as_bytes()
    }

    /// # Errors
    /// Returns [`StateError::Decrypt`] if the value does not open under this key.
    pub async fn decrypt_bytes(&self, value: &EncString) -> Result<Vec<u8>, StateError> {
        Ok(self.crypto.decrypt(value, &self.key, self.aad()).await?)
    }

    /// # Errors
    /// Returns [`StateError::Decrypt`] if the value does not open or is not UTF-8.
    pub async fn decrypt_text(&self, value: &EncString) -> Result<String, StateError> {
        Ok(self.crypto.decrypt_text(value, &self.key, self.aad()).await?)
    }

    /// # Errors
    /// See [`CryptoContext::decrypt_text`].
    pub async fn decrypt_optional(
        &self,
        value: Option<&EncString>,
    ) -> Result<Option<String>, StateError> {
        match value {
            Some(value) => self.decrypt_text(value).await.map(Some),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns [`StateError::Encrypt`] if the capability fails.
    pub async fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<EncString, StateError> {
        Ok(self.crypto.encrypt(plaintext, &self.key, self.aad()).await?)
    }

    /// # Errors
    /// Returns [`StateError::Encrypt`] if the capability fails.
    pub async fn encrypt_text(&self, text: &str) -> Result<EncString, StateError> {
        Ok(self.crypto.encrypt_text(text, &self.key, self.aad()).await?)
    }

    /// # Errors
    /// See [`CryptoContext::encrypt_text`].
    pub async fn encrypt_optional(
        &self,
        text: Option<&str>,
    ) -> Result<Option<EncString>, StateError> {
        match text {
            Some(text) => self.encrypt_text(text).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbox_vault::{AeadCrypto, ChaCha};

    fn context(domain: DataDomain) -> CryptoContext {
        let key = SymmetricKey::from_bytes(&[7u8; 32]).unwrap();
        CryptoContext::new(Arc::new(AeadCrypto::<ChaCha>::new()), key, domain)
    }

    #[tokio::test]
    async fn text_roundtrip_within_domain() {
        let ctx = context(DataDomain::Folders);
        let sealed = ctx.encrypt_text("Personal").await.unwrap();

        assert_eq!(ctx.decrypt_text(&sealed).await.unwrap(), "Personal");
        assert_eq!(ctx.decrypt_optional(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn domain_binds_ciphertext() {
        let sealed = context(DataDomain::Folders).encrypt_text("Personal").await.unwrap();
        let result = context(DataDomain::Ciphers).decrypt_text(&sealed).await;

        assert!(matches!(result, Err(StateError::Decrypt { .. })));
    }

    #[test]
    fn debug_hides_key() {
        let rendered = format!("{:?}", context(DataDomain::Sends));
        assert!(rendered.contains("Sends"));
        assert!(!rendered.contains("redacted"));
    }
}
