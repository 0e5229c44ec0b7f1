//! Plaintext vault export.

mod document;
mod error;
mod service;

pub use document::{ExportDocument, ExportFolder, ExportItem, ExportLogin, ExportUri};
pub use error::{ExportError, ExportErrorExt};
pub use service::{ExportService, ExportServiceInner};
