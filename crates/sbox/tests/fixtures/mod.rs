#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sbox::features::ciphers::{CipherApi, CipherData, CipherRequest, MoveRequest};
use sbox::features::folders::{FolderApi, FolderData, FolderRequest, FolderResponse};
use sbox::features::sends::{SendApi, SendData, SendRequest};
use sbox::domain::config::StateConfig;
use sbox::domain::{AccountId, DataDomain, ItemId, ProfilePatch};
use sbox::kernel::{
    AccountRecord, AccountRegistry, ApiError, MemoryPersistence, StateError, StatePersistence,
};
use sbox::vault::KeyMaterial;
use sbox::{RemoteApis, Strongbox};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Sync-only tests never write through the server.
#[derive(Debug)]
pub struct OfflineApi;

fn offline() -> ApiError {
    ApiError::transport("offline")
}

#[async_trait]
impl FolderApi for OfflineApi {
    async fn create(&self, _: &FolderRequest) -> Result<FolderResponse, ApiError> {
        Err(offline())
    }

    async fn update(&self, _: &ItemId, _: &FolderRequest) -> Result<FolderResponse, ApiError> {
        Err(offline())
    }

    async fn delete(&self, _: &ItemId) -> Result<(), ApiError> {
        Err(offline())
    }
}

#[async_trait]
impl CipherApi for OfflineApi {
    async fn create(&self, _: &CipherRequest) -> Result<CipherData, ApiError> {
        Err(offline())
    }

    async fn update(&self, _: &ItemId, _: &CipherRequest) -> Result<CipherData, ApiError> {
        Err(offline())
    }

    async fn delete(&self, _: &ItemId) -> Result<(), ApiError> {
        Err(offline())
    }

    async fn move_many(&self, _: &MoveRequest) -> Result<(), ApiError> {
        Err(offline())
    }
}

#[async_trait]
impl SendApi for OfflineApi {
    async fn create(&self, _: &SendRequest) -> Result<SendData, ApiError> {
        Err(offline())
    }

    async fn update(&self, _: &ItemId, _: &SendRequest) -> Result<SendData, ApiError> {
        Err(offline())
    }

    async fn delete(&self, _: &ItemId) -> Result<(), ApiError> {
        Err(offline())
    }
}

pub fn apis() -> RemoteApis {
    let api = Arc::new(OfflineApi);
    RemoteApis { folders: api.clone(), ciphers: api.clone(), sends: api }
}

pub fn memory_config() -> StateConfig {
    let mut config = StateConfig::default();
    config.storage.persist = false;
    config
}

pub fn disk_config(dir: &Path) -> StateConfig {
    let mut config = StateConfig::default();
    config.storage.data_dir = dir.to_path_buf();
    config.storage.persist = true;
    config
}

pub fn keys(email: &str) -> KeyMaterial {
    KeyMaterial::builder().derived("correct horse", email).unwrap().build().unwrap()
}

pub async fn sign_in(sbox: &Strongbox, email: &str) -> AccountId {
    let id = AccountId::new(email);
    sbox.registry.add_or_update_account(id.clone(), ProfilePatch::default().email(email)).await.unwrap();
    sbox.registry.unlock(&id, keys(email)).unwrap();
    sbox.registry.switch_account(&id).unwrap();
    id
}

/// Encrypts a folder the way the server would hand it back.
pub async fn sealed_folder(sbox: &Strongbox, id: &str, name: &str) -> FolderData {
    let folder = sbox.folders.encrypt(name).await.unwrap();
    FolderData {
        id: ItemId::new(id),
        name: folder.name,
        revision_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    }
}

/// Memory persistence that switches the active account during the first folder save
/// after [`switch_on_next_folder_save`](Self::switch_on_next_folder_save).
#[derive(Debug, Default)]
pub struct SwitchingPersistence {
    pub inner: MemoryPersistence,
    switch: Mutex<Option<(AccountRegistry, AccountId)>>,
}

impl SwitchingPersistence {
    pub fn switch_on_next_folder_save(&self, registry: &AccountRegistry, to: &AccountId) {
        *self.switch.lock().unwrap() = Some((registry.clone(), to.clone()));
    }
}

#[async_trait]
impl StatePersistence for SwitchingPersistence {
    async fn load(
        &self,
        account: &AccountId,
        domain: DataDomain,
    ) -> Result<Option<Vec<u8>>, StateError> {
        self.inner.load(account, domain).await
    }

    async fn save(
        &self,
        account: &AccountId,
        domain: DataDomain,
        bytes: &[u8],
    ) -> Result<(), StateError> {
        if domain == DataDomain::Folders {
            let pending = self.switch.lock().unwrap().take();
            if let Some((registry, to)) = pending {
                registry.switch_account(&to).unwrap();
            }
        }
        self.inner.save(account, domain, bytes).await
    }

    async fn load_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StateError> {
        self.inner.load_record(account).await
    }

    async fn save_record(
        &self,
        account: &AccountId,
        record: &AccountRecord,
    ) -> Result<(), StateError> {
        self.inner.save_record(account, record).await
    }

    async fn accounts(&self) -> Result<Vec<AccountId>, StateError> {
        self.inner.accounts().await
    }

    async fn remove(&self, account: &AccountId) -> Result<bool, StateError> {
        self.inner.remove(account).await
    }
}
