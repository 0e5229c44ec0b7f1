use sbox_vault::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedFolder {
    pub id: String,
    pub name: EncString,
}

/// Builds deterministic key material for a test account.
/// # Panics
/// * If derivation fails.
#[must_use]
pub fn setup_keys(email: &str) -> KeyMaterial {
    KeyMaterial::builder()
        .derived("master-secret-123", email)
        .expect("derive keys")
        .build()
        .expect("valid key material")
}

#[must_use]
pub fn setup_crypto() -> AeadCrypto<Aes> {
    AeadCrypto::new().compression(true)
}
