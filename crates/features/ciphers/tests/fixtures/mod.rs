#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sbox_ciphers::{CipherApi, CipherData, CipherDraft, CipherRequest, CipherService, LoginView, MoveRequest};
use sbox_domain::{AccountId, ItemId, ProfilePatch};
use sbox_kernel::{AccountRegistry, ApiError};
use sbox_vault::prelude::*;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct MockCipherApi {
    pub created: Mutex<usize>,
    pub moves: Mutex<Vec<MoveRequest>>,
    pub deleted: Mutex<Vec<ItemId>>,
    pub failing: Mutex<bool>,
    pub switch_to: Mutex<Option<(AccountRegistry, AccountId)>>,
}

impl MockCipherApi {
    fn check(&self) -> Result<(), ApiError> {
        if let Some((registry, account)) = self.switch_to.lock().take() {
            registry.switch_account(&account).unwrap();
        }
        if *self.failing.lock() {
            return Err(ApiError::transport("connection reset"));
        }
        Ok(())
    }

    fn respond(id: ItemId, request: &CipherRequest) -> CipherData {
        CipherData {
            id,
            organization_id: None,
            folder_id: request.folder_id.clone(),
            kind: request.kind,
            name: request.name.clone(),
            notes: request.notes.clone(),
            login: request.login.clone(),
            favorite: request.favorite,
            revision_date: Utc::now(),
            deleted_date: None,
        }
    }
}

#[async_trait]
impl CipherApi for MockCipherApi {
    async fn create(&self, request: &CipherRequest) -> Result<CipherData, ApiError> {
        self.check()?;
        let mut created = self.created.lock();
        *created += 1;
        Ok(Self::respond(ItemId::new(format!("cipher-{}", *created)), request))
    }

    async fn update(&self, id: &ItemId, request: &CipherRequest) -> Result<CipherData, ApiError> {
        self.check()?;
        Ok(Self::respond(id.clone(), request))
    }

    async fn delete(&self, id: &ItemId) -> Result<(), ApiError> {
        self.check()?;
        self.deleted.lock().push(id.clone());
        Ok(())
    }

    async fn move_many(&self, request: &MoveRequest) -> Result<(), ApiError> {
        self.check()?;
        self.moves.lock().push(request.clone());
        Ok(())
    }
}

pub struct Harness {
    pub registry: AccountRegistry,
    pub api: Arc<MockCipherApi>,
    pub ciphers: CipherService,
    pub account: AccountId,
}

impl Harness {
    pub async fn signed_in() -> Self {
        let registry = AccountRegistry::builder(Arc::new(AeadCrypto::<ChaCha>::new())).build();
        let account = AccountId::new("grace@example.com");
        registry.add_or_update_account(account.clone(), ProfilePatch::default()).await.unwrap();
        registry.unlock(&account, keys()).unwrap();
        registry.switch_account(&account).unwrap();

        let api = Arc::new(MockCipherApi::default());
        let ciphers = CipherService::with_registry(registry.clone(), api.clone());
        Self { registry, api, ciphers, account }
    }

    pub async fn second_account(&self, id: &str) -> AccountId {
        let account = AccountId::new(id);
        self.registry.add_or_update_account(account.clone(), ProfilePatch::default()).await.unwrap();
        self.registry.unlock(&account, keys()).unwrap();
        account
    }

    pub fn switch_during_next_call(&self, account: &AccountId) {
        *self.api.switch_to.lock() = Some((self.registry.clone(), account.clone()));
    }

    pub async fn save_login(&self, name: &str, password: &str) -> ItemId {
        let mut draft = login(name, password);
        self.ciphers.save(&mut draft).await.unwrap();
        draft.id.unwrap()
    }
}

pub fn keys() -> KeyMaterial {
    KeyMaterial::builder().derived("hunter2", "grace@example.com").unwrap().build().unwrap()
}

pub fn login(name: &str, password: &str) -> CipherDraft {
    CipherDraft {
        name: name.to_owned(),
        login: Some(LoginView {
            username: Some("grace".to_owned()),
            password: Some(password.to_owned()),
            totp: None,
            uris: vec!["https://example.com".to_owned()],
        }),
        ..CipherDraft::default()
    }
}
