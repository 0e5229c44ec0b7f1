//! Strongbox facade.
//!
//! Composes the state core and the feature slices into one client handle. Keep this
//! crate thin: it wires other crates together and owns no caching logic of its own.
//!
//! ## Usage
//! - [`load_config`] reads `strongbox.toml` (or a given path) plus `SBOX__` overrides.
//! - [`init_logging`] installs the tracing subscriber described by the config.
//! - [`Strongbox::from_config`] builds the registry and every domain service.

mod client;
mod error;
mod sync;

pub use client::{RemoteApis, Strongbox, StrongboxInner};
pub use error::{StrongboxError, StrongboxErrorExt};
pub use sync::SyncResponse;

pub use sbox_domain as domain;
pub use sbox_kernel as kernel;
pub use sbox_vault as vault;

use sbox_domain::config::{LoggingConfig, StateConfig};
use sbox_logger::{Logger, LoggerError};
use std::path::Path;

/// Feature slices, re-exported by name.
pub mod features {
    pub use sbox_ciphers as ciphers;
    pub use sbox_export as export;
    pub use sbox_folders as folders;
    pub use sbox_generator as generator;
    pub use sbox_organization as organization;
    pub use sbox_sends as sends;
}

/// Loads [`StateConfig`]; a missing file falls back to defaults.
///
/// # Errors
/// [`StrongboxError::Config`] if the file or an `SBOX__` override does not parse.
pub fn load_config(path: Option<&Path>) -> Result<StateConfig, StrongboxError> {
    Ok(sbox_kernel::config::load_config(path, false)?)
}

/// Installs the global tracing subscriber. Keep the returned [`Logger`] alive for as
/// long as file output should be flushed.
///
/// # Errors
/// [`LoggerError::InvalidConfiguration`] for a bad level or filter, and
/// [`LoggerError::Subscriber`] when a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Logger, LoggerError> {
    let mut builder =
        Logger::builder().name(&config.name).level_str(&config.level)?.console(config.console);
    if let Some(filter) = &config.env_filter {
        builder = builder.env_filter(filter);
    }

    match &config.path {
        Some(path) => builder.path(path).json(config.json).init(),
        None => builder.init(),
    }
}
