//! Folder feature slice.
//!
//! [`FolderService`] keeps the active account's folders in step with the server:
//! every write goes to the API first and only the server's answer is cached.

mod api;
mod models;
mod service;

pub use api::FolderApi;
pub use models::{Folder, FolderData, FolderRequest, FolderResponse, FolderView, Folders};
pub use service::{FolderService, FolderServiceInner};
