#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use sbox_domain::{AccountId, ItemId, ProfilePatch};
use sbox_folders::{FolderApi, FolderRequest, FolderResponse, FolderService};
use sbox_kernel::{AccountRegistry, ApiError};
use sbox_vault::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create,
    Update(ItemId),
    Delete(ItemId),
}

/// Records calls; assigns sequential ids; fails every call while `failing` is set.
/// With `switch_to` set, the next call switches the active account while in flight;
/// with `remove` set, the next create logs that account out.
#[derive(Debug, Default)]
pub struct MockFolderApi {
    pub calls: Mutex<Vec<Call>>,
    pub failing: Mutex<bool>,
    pub switch_to: Mutex<Option<(AccountRegistry, AccountId)>>,
    pub remove: Mutex<Option<(AccountRegistry, AccountId)>>,
}

impl MockFolderApi {
    fn check(&self) -> Result<(), ApiError> {
        if let Some((registry, account)) = self.switch_to.lock().take() {
            registry.switch_account(&account).unwrap();
        }
        if *self.failing.lock() {
            return Err(ApiError::status(500, "Internal server error"));
        }
        Ok(())
    }

    pub fn remove_during_next_create(&self, registry: &AccountRegistry, account: &AccountId) {
        *self.remove.lock() = Some((registry.clone(), account.clone()));
    }

    pub fn switch_during_next_call(&self, registry: &AccountRegistry, account: &AccountId) {
        *self.switch_to.lock() = Some((registry.clone(), account.clone()));
    }

    fn respond(id: ItemId, request: &FolderRequest) -> FolderResponse {
        FolderResponse {
            id,
            name: request.name.clone(),
            revision_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FolderApi for MockFolderApi {
    async fn create(&self, request: &FolderRequest) -> Result<FolderResponse, ApiError> {
        self.check()?;
        let removal = self.remove.lock().take();
        if let Some((registry, account)) = removal {
            registry.remove_account(&account).await;
        }
        let mut calls = self.calls.lock();
        calls.push(Call::Create);
        let id = ItemId::new(format!("srv-{}", calls.len()));
        Ok(Self::respond(id, request))
    }

    async fn update(&self, id: &ItemId, request: &FolderRequest) -> Result<FolderResponse, ApiError> {
        self.check()?;
        self.calls.lock().push(Call::Update(id.clone()));
        Ok(Self::respond(id.clone(), request))
    }

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError> {
        self.check()?;
        self.calls.lock().push(Call::Delete(id.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub registry: AccountRegistry,
    pub api: Arc<MockFolderApi>,
    pub folders: FolderService,
    pub account: AccountId,
}

impl Harness {
    pub async fn signed_in() -> Self {
        let registry = AccountRegistry::builder(Arc::new(AeadCrypto::<Aes>::new())).build();
        let account = AccountId::new("ada@example.com");
        registry
            .add_or_update_account(account.clone(), ProfilePatch::default().email("ada@example.com"))
            .await
            .unwrap();
        registry.unlock(&account, keys()).unwrap();
        registry.switch_account(&account).unwrap();

        let api = Arc::new(MockFolderApi::default());
        let folders = FolderService::with_registry(registry.clone(), api.clone());
        Self { registry, api, folders, account }
    }

    /// Adds and unlocks a second account without making it active.
    pub async fn second_account(&self, email: &str) -> AccountId {
        let account = AccountId::new(email);
        self.registry
            .add_or_update_account(account.clone(), ProfilePatch::default().email(email))
            .await
            .unwrap();
        self.registry.unlock(&account, keys()).unwrap();
        account
    }

    pub fn lock(&self) {
        self.registry.lock(&self.account).unwrap();
    }

    pub fn unlock(&self) {
        self.registry.unlock(&self.account, keys()).unwrap();
    }
}

pub fn keys() -> KeyMaterial {
    KeyMaterial::builder().derived("hunter2", "ada@example.com").unwrap().build().unwrap()
}
