//! Send feature slice: short-lived share links for text or files.

mod api;
mod models;
mod service;

pub use api::SendApi;
pub use models::{SendData, SendDraft, SendRequest, SendType, SendView, Sends};
pub use service::{SendService, SendServiceInner};
