use crate::models::{SendData, SendRequest};
use async_trait::async_trait;
use sbox_domain::ItemId;
use sbox_kernel::ApiError;
use std::fmt::Debug;

#[async_trait]
pub trait SendApi: Send + Sync + Debug {
    async fn create(&self, request: &SendRequest) -> Result<SendData, ApiError>;

    async fn update(&self, id: &ItemId, request: &SendRequest) -> Result<SendData, ApiError>;

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError>;
}
