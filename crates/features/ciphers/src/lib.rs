//! Cipher (vault item) feature slice.

mod api;
mod models;
mod service;

pub use api::CipherApi;
pub use models::{
    CipherData, CipherDraft, CipherRequest, CipherType, CipherView, Ciphers, LoginData, LoginView,
    MoveRequest,
};
pub use service::{CipherService, CipherServiceInner};
