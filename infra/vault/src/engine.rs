use aead::inout::InOutBuf;
use aead::{Key, Nonce};
use async_trait::async_trait;
use getrandom::fill;
use std::fmt;
use std::marker::PhantomData;

use crate::error::VaultError;
use crate::keys::SymmetricKey;
use crate::service::CryptoService;
use crate::types::{
    Aes, EncString, FLAG_COMPRESSED, HEADER_LEN, NONCE_LEN, PAYLOAD_VERSION_V1, TAG_LEN,
    VaultCipher,
};

/// AEAD implementation of [`CryptoService`].
///
/// Stateless apart from the compression switch: the key arrives with every call, so one
/// instance serves every account. Each encryption draws a fresh random 96-bit nonce.
///
/// ### Generic Parameters
/// * `C`: The cipher. Defaults to [`Aes`] (AES-256-GCM); [`crate::ChaCha`] is the
///   portable alternative for hosts without AES acceleration.
///
/// ### Example
/// ```rust
/// use sbox_vault::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), VaultError> {
/// let crypto = AeadCrypto::<Aes>::new();
/// let key = SymmetricKey::generate()?;
///
/// let sealed = crypto.encrypt(b"Personal", &key, b"folders").await?;
/// let opened = crypto.decrypt(&sealed, &key, b"folders").await?;
/// assert_eq!(opened, b"Personal");
/// # Ok(())
/// # }
/// ```
pub struct AeadCrypto<C = Aes>
where
    C: VaultCipher,
{
    compression: bool,
    _cipher: PhantomData<fn() -> C>,
}

impl<C: VaultCipher> fmt::Debug for AeadCrypto<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadCrypto")
            .field("cipher", &std::any::type_name::<C>())
            .field("compression", &self.compression)
            .finish()
    }
}

impl<C: VaultCipher> Clone for AeadCrypto<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: VaultCipher> Copy for AeadCrypto<C> {}

impl<C: VaultCipher> Default for AeadCrypto<C> {
    fn default() -> Self {
        Self { compression: false, _cipher: PhantomData }
    }
}

impl<C> AeadCrypto<C>
where
    C: VaultCipher,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles LZ4 compression of plaintext before encryption.
    ///
    /// # Security / Threat Model
    /// Compression before encryption can leak information through ciphertext length
    /// when an attacker both influences plaintext and observes sizes. Enable it only for
    /// local storage where lengths are not attacker-observable.
    ///
    /// The flag is recorded in each blob, so decryption never depends on this setting.
    #[must_use]
    pub const fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    fn cipher(key: &SymmetricKey) -> Result<C, VaultError> {
        let key = Key::<C>::try_from(&key.as_bytes()[..]).map_err(|_| {
            VaultError::InvalidKey {
                message: "Key length does not match the cipher".into(),
                context: Some(std::any::type_name::<C>().into()),
            }
        })?;
        Ok(C::new(&key))
    }

    fn next_nonce() -> Result<Nonce<C>, VaultError> {
        let mut nonce = Nonce::<C>::default();
        fill(&mut nonce).map_err(|e| VaultError::Internal {
            message: e.to_string().into(),
            context: Some("System RNG unavailable for nonce generation".into()),
        })?;
        Ok(nonce)
    }

    pub(crate) fn seal(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<EncString, VaultError> {
        let cipher = Self::cipher(key)?;
        let owned = if self.compression {
            lz4_flex::compress_prepend_size(plaintext)
        } else {
            Vec::new()
        };
        let data = if self.compression { owned.as_slice() } else { plaintext };
        let flags = if self.compression { FLAG_COMPRESSED } else { 0 };

        let nonce = Self::next_nonce()?;

        let mut buf = Vec::with_capacity(HEADER_LEN + NONCE_LEN + data.len() + TAG_LEN);
        buf.push(PAYLOAD_VERSION_V1);
        buf.push(flags);
        buf.extend_from_slice(&nonce);
        buf.extend_from_slice(data);

        let (_, body) = buf.split_at_mut(HEADER_LEN + NONCE_LEN);
        let tag = cipher.encrypt_inout_detached(&nonce, aad, InOutBuf::from(body)).map_err(
            |_| VaultError::Encryption {
                message: "Encryption failed".into(),
                context: Some("AEAD encryption failed".into()),
            },
        )?;

        buf.extend_from_slice(tag.as_slice());
        Ok(EncString::from_sealed(buf))
    }

    pub(crate) fn open(
        value: &EncString,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let cipher = Self::cipher(key)?;
        let (_, nonce, ciphertext, tag) = value.split();

        let nonce = nonce.try_into().map_err(|_| VaultError::Decryption {
            message: "Invalid nonce length".into(),
            context: None,
        })?;
        let tag = tag.try_into().map_err(|_| VaultError::Decryption {
            message: "Invalid tag length".into(),
            context: None,
        })?;

        let mut buf = ciphertext.to_vec();
        cipher.decrypt_inout_detached(&nonce, aad, InOutBuf::from(&mut buf[..]), &tag).map_err(
            |_| VaultError::Decryption {
                message: "Decryption failed".into(),
                context: Some("AEAD authentication failed".into()),
            },
        )?;

        if value.is_compressed() {
            buf = lz4_flex::decompress_size_prepended(&buf).map_err(|_| {
                VaultError::Decompression {
                    message: "Decompression failed".into(),
                    context: Some("LZ4 stream invalid".into()),
                }
            })?;
        }

        Ok(buf)
    }
}

#[async_trait]
impl<C: VaultCipher> CryptoService for AeadCrypto<C> {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<EncString, VaultError> {
        self.seal(plaintext, key, aad)
    }

    async fn decrypt(
        &self,
        value: &EncString,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        Self::open(value, key, aad)
    }
}
