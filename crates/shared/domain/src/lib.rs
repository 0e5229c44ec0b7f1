//! # Domain Models
//!
//! Pure data types shared by every Strongbox crate: identifiers, account metadata and
//! its patch types, the data-domain catalogue, and configuration structs.
//! Keep it lean: no I/O, no crypto, no async. Dependencies are limited to `serde`,
//! `bitflags` and `chrono`.

pub mod account;
pub mod config;
pub mod domains;
pub mod ids;

pub use account::{
    AccountProfile, AccountSettings, AccountTokens, AuthenticationStatus, EnvironmentUrls,
    KdfKind, ProfilePatch, SettingsPatch, TokensPatch, VaultTimeoutAction,
};
pub use domains::{DataDomain, DomainSet};
pub use ids::{AccountId, ItemId};
