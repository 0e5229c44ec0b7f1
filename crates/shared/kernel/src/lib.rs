//! # Strongbox Kernel
//!
//! The per-account encrypted state core shared by every feature slice:
//!
//! * [`cache`]: the encryption pair, ciphertext plus a lazily decrypted view.
//! * [`account`]: one account's lifecycle, keys and domain caches.
//! * [`registry`]: the set of known accounts and which one is active.
//! * [`service`]: typed per-domain access for the active account.
//! * [`persistence`]: ciphertext-only durable storage.
//!
//! ## ID generation
//! Use `safe_nanoid!` for URL-safe, unambiguous IDs:
//! ```rust
//! # use sbox_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
pub mod account;
pub mod api;
pub mod cache;
#[cfg(not(target_arch = "wasm32"))]
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod record;
pub mod registry;
pub mod service;

pub use account::AccountState;
pub use api::{ApiError, ApiErrorExt};
pub use cache::{DataEncryptionPair, EncryptionPair, PairCache};
pub use domain::{CryptoContext, KeyedDomain, ValueDomain};
pub use error::{StateError, StateErrorExt};
pub use persistence::{MemoryPersistence, StatePersistence, StoragePersistence};
pub use record::AccountRecord;
pub use registry::{AccountEvent, AccountRegistry, AccountRegistryBuilder, ActiveAccount};
pub use service::{DomainStateService, MAX_DECRYPT_ATTEMPTS, ValueStateService};

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use nanoid::nanoid;
pub use sbox_domain as models;

/// Generates an unambiguous `NanoID`, used for locally created item ids.
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
