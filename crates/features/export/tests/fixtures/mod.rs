#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sbox_ciphers::{
    CipherApi, CipherData, CipherDraft, CipherRequest, CipherService, LoginView, MoveRequest,
};
use sbox_domain::{AccountId, ItemId, ProfilePatch};
use sbox_export::ExportService;
use sbox_folders::{FolderApi, FolderData, FolderRequest, FolderResponse, FolderService};
use sbox_kernel::{AccountRegistry, ApiError};
use sbox_organization::{PolicyData, PolicyService, PolicyType};
use sbox_vault::prelude::*;
use std::sync::Arc;

/// The export never talks to the server; every call is refused.
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

pub struct Harness {
    pub registry: AccountRegistry,
    pub account: AccountId,
    pub folders: FolderService,
    pub ciphers: CipherService,
    pub policies: PolicyService,
    pub export: ExportService,
}

impl Harness {
    pub async fn signed_in() -> Self {
        let registry = AccountRegistry::builder(Arc::new(AeadCrypto::<Aes>::new())).build();
        let account = AccountId::new("max@example.com");
        registry.add_or_update_account(account.clone(), ProfilePatch::default()).await.unwrap();
        let keys = KeyMaterial::builder().derived("pw", "max@example.com").unwrap().build().unwrap();
        registry.unlock(&account, keys).unwrap();
        registry.switch_account(&account).unwrap();

        let api = Arc::new(OfflineApi);
        let folders = FolderService::with_registry(registry.clone(), api.clone());
        let ciphers = CipherService::with_registry(registry.clone(), api);
        let policies = PolicyService::with_registry(registry.clone());
        let export =
            ExportService::with_services(folders.clone(), ciphers.clone(), policies.clone());
        Self { registry, account, folders, ciphers, policies, export }
    }

    pub async fn folder(&self, id: &str, name: &str) {
        let folder = self.folders.encrypt(name).await.unwrap();
        let data = FolderData { id: ItemId::new(id), name: folder.name, revision_date: date() };
        self.folders.state.upsert(data).await.unwrap();
    }

    pub async fn cipher(&self, id: &str, draft: CipherDraft) -> CipherData {
        let request = self.ciphers.encrypt(&draft).await.unwrap();
        let data = CipherData {
            id: ItemId::new(id),
            organization_id: None,
            folder_id: request.folder_id,
            kind: request.kind,
            name: request.name,
            notes: request.notes,
            login: request.login,
            favorite: request.favorite,
            revision_date: date(),
            deleted_date: None,
        };
        self.ciphers.state.upsert(data.clone()).await.unwrap();
        data
    }

    pub async fn forbid_export(&self) {
        let policy = PolicyData {
            id: ItemId::new("p1"),
            organization_id: "org-1".to_owned(),
            kind: PolicyType::DisablePersonalVaultExport,
            data: None,
            enabled: true,
        };
        self.policies.state.upsert(policy).await.unwrap();
    }
}

pub fn date() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}

pub fn login(name: &str, password: &str, folder: Option<&str>) -> CipherDraft {
    CipherDraft {
        name: name.to_owned(),
        folder_id: folder.map(ItemId::new),
        login: Some(LoginView {
            username: Some("max".to_owned()),
            password: Some(password.to_owned()),
            totp: None,
            uris: vec!["https://mail.example.com".to_owned()],
        }),
        ..CipherDraft::default()
    }
}
