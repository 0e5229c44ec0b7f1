//! # State Errors
//!
//! [`StateError`] is the single error type of the state core. Account-state and
//! decryption errors are always returned to the immediate caller; nothing in the cache
//! swallows them.

use crate::api::ApiError;
use sbox_domain::{AccountId, DataDomain};
use sbox_event_bus::EventBusError;
use sbox_storage::StorageError;
use sbox_vault::VaultError;
use std::borrow::Cow;

#[sbox_derive::sbox_error]
pub enum StateError {
    /// A domain operation ran while no account is active.
    #[error("No active account{}", format_context(.context))]
    NoActiveAccount { context: Option<Cow<'static, str>> },

    /// The account id is not tracked by the registry (or has logged out).
    #[error("Unknown account{}: {account}", format_context(.context))]
    UnknownAccount { account: AccountId, context: Option<Cow<'static, str>> },

    /// Decrypted data was requested while the account is not unlocked.
    #[error("Account is locked{}: {account}", format_context(.context))]
    LockedAccount { account: AccountId, context: Option<Cow<'static, str>> },

    #[error("Invalid key material{}: {message}", format_context(.context))]
    InvalidKeyMaterial { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The crypto capability refused a ciphertext (wrong key, corrupt payload).
    #[error("Decryption failed{}: {reason}", format_context(.context))]
    Decrypt { reason: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Encryption failed{}: {message}", format_context(.context))]
    Encrypt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Api { source: ApiError, context: Option<Cow<'static, str>> },

    #[error("Persistence error{}: {message}", format_context(.context))]
    Persistence { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Event bus error{}: {source}", format_context(.context))]
    Events { source: EventBusError, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// The cache kept changing underneath a decrypt; the caller may simply retry.
    #[error("Concurrent modification of {domain}{}", format_context(.context))]
    ConcurrentModification { domain: DataDomain, context: Option<Cow<'static, str>> },

    #[error("Internal state error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl StateError {
    #[must_use]
    pub const fn no_active_account() -> Self {
        Self::NoActiveAccount { context: None }
    }

    #[must_use]
    pub fn unknown_account(account: &AccountId) -> Self {
        Self::UnknownAccount { account: account.clone(), context: None }
    }

    #[must_use]
    pub fn locked(account: &AccountId) -> Self {
        Self::LockedAccount { account: account.clone(), context: None }
    }

    #[must_use]
    pub fn decrypt(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Decrypt { reason: reason.into(), context: None }
    }

    #[must_use]
    pub fn persistence(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Persistence { message: message.into(), context: None }
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::LockedAccount { .. })
    }

    /// The API status code, if this error came from a remote call.
    #[must_use]
    pub const fn api_status(&self) -> Option<u16> {
        match self {
            Self::Api { source, .. } => source.status_code(),
            _ => None,
        }
    }
}

impl From<VaultError> for StateError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::InvalidKey { .. } => {
                Self::InvalidKeyMaterial { message: err.to_string().into(), context: None }
            },
            VaultError::Encryption { .. } => {
                Self::Encrypt { message: err.to_string().into(), context: None }
            },
            _ => Self::Decrypt { reason: err.to_string().into(), context: None },
        }
    }
}
