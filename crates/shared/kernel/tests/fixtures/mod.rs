#![allow(dead_code)]

use async_trait::async_trait;
use sbox_kernel::models::{AccountId, DataDomain, ItemId, ProfilePatch};
use sbox_kernel::{
    AccountRecord, AccountRegistry, CryptoContext, DomainStateService, KeyedDomain,
    MemoryPersistence, StateError, StatePersistence,
};
use sbox_vault::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::{Notify, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedNote {
    pub id: ItemId,
    pub title: EncString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: ItemId,
    pub title: String,
}

#[derive(Debug)]
pub struct Notes;

impl KeyedDomain for Notes {
    const DOMAIN: DataDomain = DataDomain::Folders;

    type Encrypted = SealedNote;
    type Decrypted = Note;

    fn id(item: &SealedNote) -> &ItemId {
        &item.id
    }

    async fn decrypt(ctx: &CryptoContext, item: &SealedNote) -> Result<Note, StateError> {
        Ok(Note { id: item.id.clone(), title: ctx.decrypt_text(&item.title).await? })
    }

    fn order(a: &Note, b: &Note) -> Ordering {
        a.title.cmp(&b.title)
    }
}

/// Wraps the real cipher; counts decrypts and can park them until released.
#[derive(Debug)]
pub struct GatedCrypto {
    inner: AeadCrypto<Aes>,
    armed: AtomicBool,
    decrypts: AtomicUsize,
    pub entered: Notify,
    release: Semaphore,
}

impl GatedCrypto {
    pub fn new() -> Self {
        Self {
            inner: AeadCrypto::new(),
            armed: AtomicBool::new(false),
            decrypts: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, AtomicOrdering::SeqCst);
    }

    pub fn release(&self, permits: usize) {
        self.release.add_permits(permits);
    }

    pub fn decrypts(&self) -> usize {
        self.decrypts.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl CryptoService for GatedCrypto {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<EncString, VaultError> {
        self.inner.encrypt(plaintext, key, aad).await
    }

    async fn decrypt(
        &self,
        value: &EncString,
        key: &SymmetricKey,
        aad: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        self.decrypts.fetch_add(1, AtomicOrdering::SeqCst);
        if self.armed.load(AtomicOrdering::SeqCst) {
            self.entered.notify_one();
            self.release.acquire().await.expect("gate semaphore open").forget();
        }
        self.inner.decrypt(value, key, aad).await
    }
}

/// Memory persistence whose domain saves fail while `failing` is set.
#[derive(Debug, Default)]
pub struct FlakyPersistence {
    pub inner: MemoryPersistence,
    failing: AtomicBool,
}

impl FlakyPersistence {
    pub fn new(inner: MemoryPersistence) -> Self {
        Self { inner, failing: AtomicBool::new(false) }
    }

    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl StatePersistence for FlakyPersistence {
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
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(StateError::persistence("disk full"));
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

/// # Panics
/// * If derivation fails.
#[must_use]
pub fn keys_for(email: &str) -> KeyMaterial {
    KeyMaterial::builder()
        .derived("correct horse battery staple", email)
        .expect("derive keys")
        .build()
        .expect("valid key material")
}

pub struct Harness {
    pub registry: AccountRegistry,
    pub notes: DomainStateService<Notes>,
    pub crypto: Arc<GatedCrypto>,
    pub persistence: MemoryPersistence,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_persistence(MemoryPersistence::new())
    }

    pub fn with_persistence(persistence: MemoryPersistence) -> Self {
        let store = Arc::new(persistence.clone()) as Arc<dyn StatePersistence>;
        Self::with_store(persistence, store)
    }

    /// `store` is what the registry writes through; `persistence` is what tests inspect.
    pub fn with_store(persistence: MemoryPersistence, store: Arc<dyn StatePersistence>) -> Self {
        let crypto = Arc::new(GatedCrypto::new());
        let registry = AccountRegistry::builder(Arc::clone(&crypto) as Arc<dyn CryptoService>)
            .persistence(store)
            .build();
        let notes = DomainStateService::new(registry.clone());
        Self { registry, notes, crypto, persistence }
    }

    /// Adds, unlocks and activates an account named after `email`.
    pub async fn signed_in(&self, email: &str) -> AccountId {
        let id = AccountId::new(email);
        self.registry
            .add_or_update_account(id.clone(), ProfilePatch::default().email(email))
            .await
            .expect("add account");
        self.registry.unlock(&id, keys_for(email)).expect("unlock");
        self.registry.switch_account(&id).expect("switch");
        id
    }

    pub async fn seal(&self, id: &str, title: &str) -> SealedNote {
        let ctx = self.notes.context().expect("unlocked context");
        SealedNote { id: ItemId::new(id), title: ctx.encrypt_text(title).await.expect("encrypt") }
    }

    pub async fn add(&self, id: &str, title: &str) {
        let note = self.seal(id, title).await;
        self.notes.upsert(note).await.expect("upsert");
    }

    pub async fn titles(&self) -> Vec<String> {
        self.notes
            .get_all_decrypted()
            .await
            .expect("decrypted notes")
            .into_iter()
            .map(|n| n.title)
            .collect()
    }
}
