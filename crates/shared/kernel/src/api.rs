//! Failures reported by remote API collaborators.

use std::borrow::Cow;

/// Error surfaced by a domain's remote API.
///
/// The state core never retries or interprets these; they propagate unchanged to the
/// caller and the cache is left untouched.
#[sbox_derive::sbox_error]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("API error {status_code}{}: {message}", format_context(.context))]
    Status { status_code: u16, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The request never produced a response (connection, timeout, decoding).
    #[error("API transport error{}: {message}", format_context(.context))]
    Transport { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ApiError {
    #[must_use]
    pub fn status(status_code: u16, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Status { status_code, message: message.into(), context: None }
    }

    #[must_use]
    pub fn transport(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Transport { message: message.into(), context: None }
    }

    /// HTTP status code, when the server answered at all.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            Self::Transport { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status_code(), Some(404))
    }
}
