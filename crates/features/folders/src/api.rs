use crate::models::{FolderRequest, FolderResponse};
use async_trait::async_trait;
use sbox_domain::ItemId;
use sbox_kernel::ApiError;
use std::fmt::Debug;

/// Remote folder endpoints. The server is the source of truth for ids and revision dates.
#[async_trait]
pub trait FolderApi: Send + Sync + Debug {
    async fn create(&self, request: &FolderRequest) -> Result<FolderResponse, ApiError>;

    async fn update(&self, id: &ItemId, request: &FolderRequest) -> Result<FolderResponse, ApiError>;

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError>;
}
