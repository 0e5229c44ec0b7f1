#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use sbox_domain::{AccountId, ItemId, ProfilePatch};
use sbox_kernel::{AccountRegistry, ApiError};
use sbox_sends::{SendApi, SendData, SendRequest, SendService};
use sbox_vault::prelude::*;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct MockSendApi {
    pub created: Mutex<usize>,
    pub deleted: Mutex<Vec<ItemId>>,
    pub missing: Mutex<bool>,
}

impl MockSendApi {
    fn respond(id: ItemId, request: &SendRequest) -> SendData {
        SendData {
            id,
            kind: request.kind,
            name: request.name.clone(),
            notes: request.notes.clone(),
            text: request.text.clone(),
            file_name: request.file_name.clone(),
            access_count: 0,
            max_access_count: request.max_access_count,
            disabled: request.disabled,
            expiration_date: request.expiration_date,
            deletion_date: request.deletion_date,
            revision_date: now(),
        }
    }
}

#[async_trait]
impl SendApi for MockSendApi {
    async fn create(&self, request: &SendRequest) -> Result<SendData, ApiError> {
        let mut created = self.created.lock();
        *created += 1;
        Ok(Self::respond(ItemId::new(format!("send-{}", *created)), request))
    }

    async fn update(&self, id: &ItemId, request: &SendRequest) -> Result<SendData, ApiError> {
        if *self.missing.lock() {
            return Err(ApiError::status(404, "Send not found"));
        }
        Ok(Self::respond(id.clone(), request))
    }

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError> {
        if *self.missing.lock() {
            return Err(ApiError::status(404, "Send not found"));
        }
        self.deleted.lock().push(id.clone());
        Ok(())
    }
}

pub struct Harness {
    pub registry: AccountRegistry,
    pub api: Arc<MockSendApi>,
    pub sends: SendService,
    pub account: AccountId,
}

impl Harness {
    pub async fn signed_in() -> Self {
        let registry = AccountRegistry::builder(Arc::new(AeadCrypto::<Aes>::new())).build();
        let account = AccountId::new("ada@example.com");
        registry.add_or_update_account(account.clone(), ProfilePatch::default()).await.unwrap();
        let keys = KeyMaterial::builder().derived("pw", "ada@example.com").unwrap().build().unwrap();
        registry.unlock(&account, keys).unwrap();
        registry.switch_account(&account).unwrap();

        let api = Arc::new(MockSendApi::default());
        let sends = SendService::with_registry(registry.clone(), api.clone());
        Self { registry, api, sends, account }
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn days(n: i64) -> DateTime<Utc> {
    now() + Duration::days(n)
}
