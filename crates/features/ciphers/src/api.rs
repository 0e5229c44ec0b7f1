use crate::models::{CipherData, CipherRequest, MoveRequest};
use async_trait::async_trait;
use sbox_domain::ItemId;
use sbox_kernel::ApiError;
use std::fmt::Debug;

#[async_trait]
pub trait CipherApi: Send + Sync + Debug {
    async fn create(&self, request: &CipherRequest) -> Result<CipherData, ApiError>;

    async fn update(&self, id: &ItemId, request: &CipherRequest) -> Result<CipherData, ApiError>;

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError>;

    /// Moves every listed item into `folder_id` (`None` = no folder) in one request.
    async fn move_many(&self, request: &MoveRequest) -> Result<(), ApiError>;
}
