//! Field-level authenticated encryption and key material for Strongbox accounts.
//!
//! ## Payload Format & Versioning
//!
//! Every encrypted field is an [`EncString`]: a versioned binary blob carried as base64 text.
//!
//! ```text
//! [V(1)][FLAGS(1)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
//! ```
//!
//! The header records compression, so readers never need to know how a value was written.
//!
//! ## Nonce Policy
//!
//! Random 96-bit nonces are drawn for every encryption. Keys are per account and per
//! domain (see [`KeyMaterial::domain_key`]), which keeps the volume under any single key low.
//!
//! ## Examples
//!
//! ```rust
//! use sbox_vault::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), VaultError> {
//! let keys = KeyMaterial::builder().derived("hashed-master-password", "ada@example.com")?.build()?;
//! let folder_key = keys.domain_key("folders")?;
//!
//! let crypto: &dyn CryptoService = &AeadCrypto::<ChaCha>::new();
//! let name = crypto.encrypt_text("Personal", &folder_key, b"folders").await?;
//! assert_eq!(crypto.decrypt_text(&name, &folder_key, b"folders").await?, "Personal");
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod keys;
mod service;
mod types;

pub use engine::AeadCrypto;
pub use error::{VaultError, VaultErrorExt};
pub use keys::{KEY_LEN, KeyMaterial, KeyMaterialBuilder, NoKeys, SymmetricKey, WithKeys};
pub use service::CryptoService;
pub use types::{Aes, ChaCha, EncString, VaultCipher};

pub mod prelude {
    pub use crate::engine::AeadCrypto;
    pub use crate::error::{VaultError, VaultErrorExt};
    pub use crate::keys::{KeyMaterial, SymmetricKey};
    pub use crate::service::CryptoService;
    pub use crate::types::{Aes, ChaCha, EncString};
}
