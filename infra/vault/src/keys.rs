use crate::error::VaultError;
use getrandom::fill;
use hkdf::Hkdf;
use private::Sealed;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;

const MASTER_INFO: &[u8] = b"sbox.v1.master";
const USER_INFO: &[u8] = b"sbox.v1.user";
const SUBKEY_PREFIX: &[u8] = b"sbox.v1.subkey:";

/// A 256-bit symmetric key. Zeroed on drop, never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    /// Copies a key out of a byte slice.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidKey`] if `bytes` is not exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| VaultError::InvalidKey {
            message: format!("Invalid key length {}, must be {KEY_LEN} bytes", bytes.len()).into(),
            context: None,
        })?;
        Ok(Self(key))
    }

    /// Generates a fresh random key from the system RNG.
    ///
    /// # Errors
    /// Returns [`VaultError::Internal`] if the system RNG is unavailable.
    pub fn generate() -> Result<Self, VaultError> {
        let mut key = [0u8; KEY_LEN];
        fill(&mut key).map_err(|e| VaultError::Internal {
            message: e.to_string().into(),
            context: Some("System RNG unavailable for key generation".into()),
        })?;
        Ok(Self(key))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().fold(0u8, |acc, b| acc | b) == 0
    }

    /// Derives an independent subkey bound to `info` (HKDF-SHA256 expand).
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidKey`] if HKDF rejects the parameters.
    pub fn derive_subkey(&self, info: impl AsRef<[u8]>) -> Result<Self, VaultError> {
        let hk = Hkdf::<Sha256>::from_prk(&self.0).map_err(|_| VaultError::InvalidKey {
            message: "Key is too short to act as an HKDF PRK".into(),
            context: None,
        })?;
        let mut label = Vec::with_capacity(SUBKEY_PREFIX.len() + info.as_ref().len());
        label.extend_from_slice(SUBKEY_PREFIX);
        label.extend_from_slice(info.as_ref());

        let mut out = [0u8; KEY_LEN];
        hk.expand(&label, &mut out).map_err(|_| VaultError::InvalidKey {
            message: "HKDF expansion failed for subkey".into(),
            context: None,
        })?;
        Ok(Self(out))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Everything needed to decrypt one account's data.
///
/// Built with [`KeyMaterial::builder`]; owned by exactly one account state and
/// zeroed when that state locks or logs out.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    master: SymmetricKey,
    user: SymmetricKey,
    private_key: Option<Vec<u8>>,
    #[zeroize(skip)]
    public_key: Option<Vec<u8>>,
}

impl KeyMaterial {
    #[must_use = "Builder must be given keys before use"]
    pub fn builder() -> KeyMaterialBuilder {
        KeyMaterialBuilder::default()
    }

    #[must_use]
    pub const fn master_key(&self) -> &SymmetricKey {
        &self.master
    }

    #[must_use]
    pub const fn user_key(&self) -> &SymmetricKey {
        &self.user
    }

    #[must_use]
    pub fn private_key(&self) -> Option<&[u8]> {
        self.private_key.as_deref()
    }

    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    /// Derives the key protecting one data domain from the user key.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidKey`] if derivation fails.
    pub fn domain_key(&self, tag: &str) -> Result<SymmetricKey, VaultError> {
        self.user.derive_subkey(tag)
    }

    /// Rejects all-zero symmetric keys and an empty private key.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidKey`] naming the offending component.
    pub fn validate(&self) -> Result<(), VaultError> {
        let invalid = |what: &'static str| VaultError::InvalidKey {
            message: format!("{what} is empty").into(),
            context: None,
        };
        if self.master.is_zero() {
            return Err(invalid("master key"));
        }
        if self.user.is_zero() {
            return Err(invalid("user key"));
        }
        if self.private_key.as_ref().is_some_and(Vec::is_empty) {
            return Err(invalid("private key"));
        }
        Ok(())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("master", &self.master)
            .field("user", &self.user)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key_len", &self.public_key.as_ref().map(Vec::len))
            .finish()
    }
}

// --- Builder ---

#[derive(Debug, Default, ZeroizeOnDrop)]
pub struct NoKeys;

impl Zeroize for NoKeys {
    fn zeroize(&mut self) {}
}

#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct WithKeys {
    master: SymmetricKey,
    user: SymmetricKey,
}

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoKeys {}
impl Sealed for WithKeys {}

/// Typestate builder for [`KeyMaterial`].
///
/// Implements `ZeroizeOnDrop` so half-built key material never outlives the builder.
#[allow(private_bounds)]
#[derive(Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterialBuilder<K: Sealed + Zeroize = NoKeys> {
    keys: K,
    private_key: Option<Vec<u8>>,
    #[zeroize(skip)]
    public_key: Option<Vec<u8>>,
}

impl KeyMaterialBuilder<NoKeys> {
    /// Derives master and user keys from a secret with HKDF-SHA256.
    ///
    /// # Arguments
    /// * `secret`: input keying material (an already-stretched master password hash).
    /// * `salt`: per-account salt, usually the account email.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidKey`] if `secret` is empty or expansion fails.
    pub fn derived(
        mut self,
        secret: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
    ) -> Result<KeyMaterialBuilder<WithKeys>, VaultError> {
        if secret.as_ref().is_empty() {
            return Err(VaultError::InvalidKey {
                message: "secret is empty".into(),
                context: Some("KeyMaterial::derived".into()),
            });
        }
        let (_, hk) = Hkdf::<Sha256>::extract(Some(salt.as_ref()), secret.as_ref());
        let mut master = [0u8; KEY_LEN];
        let mut user = [0u8; KEY_LEN];

        hk.expand(MASTER_INFO, &mut master).map_err(|_| VaultError::InvalidKey {
            message: "HKDF expansion failed for master key".into(),
            context: None,
        })?;
        hk.expand(USER_INFO, &mut user).map_err(|_| VaultError::InvalidKey {
            message: "HKDF expansion failed for user key".into(),
            context: None,
        })?;

        let keys = WithKeys { master: SymmetricKey(master), user: SymmetricKey(user) };
        master.zeroize();
        user.zeroize();
        Ok(self.transition(keys))
    }

    /// Uses explicit master and user keys (e.g. after unwrapping a protected user key).
    #[must_use]
    pub fn keys(mut self, master: SymmetricKey, user: SymmetricKey) -> KeyMaterialBuilder<WithKeys> {
        self.transition(WithKeys { master, user })
    }

    fn transition(&mut self, keys: WithKeys) -> KeyMaterialBuilder<WithKeys> {
        KeyMaterialBuilder {
            keys,
            private_key: self.private_key.take(),
            public_key: self.public_key.take(),
        }
    }
}

#[allow(private_bounds)]
impl<K: Sealed + Zeroize> KeyMaterialBuilder<K> {
    #[must_use]
    pub fn private_key(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.private_key = Some(bytes.into());
        self
    }

    #[must_use]
    pub fn public_key(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.public_key = Some(bytes.into());
        self
    }
}

impl KeyMaterialBuilder<WithKeys> {
    /// Finalizes and validates the key material, zeroing the builder.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidKey`] if [`KeyMaterial::validate`] fails.
    pub fn build(mut self) -> Result<KeyMaterial, VaultError> {
        let material = KeyMaterial {
            master: self.keys.master.clone(),
            user: self.keys.user.clone(),
            private_key: self.private_key.take(),
            public_key: self.public_key.take(),
        };
        self.zeroize();
        material.validate()?;
        Ok(material)
    }
}
