use sbox_kernel::StateError;
use std::borrow::Cow;

#[sbox_derive::sbox_error]
pub enum ExportError {
    /// An organization policy forbids exporting the personal vault.
    #[error("Vault export is disabled by policy{}", format_context(.context))]
    DisabledByPolicy { context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    State { source: StateError, context: Option<Cow<'static, str>> },

    #[error("Export serialization failed{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },
}
