use sbox_export::ExportError;
use sbox_kernel::StateError;
use sbox_kernel::config::ConfigError;
use sbox_logger::LoggerError;
use sbox_storage::StorageError;
use std::borrow::Cow;

#[sbox_derive::sbox_error]
pub enum StrongboxError {
    #[error("{source}{}", format_context(.context))]
    Config { source: ConfigError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    State { source: StateError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Logger { source: LoggerError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Export { source: ExportError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
