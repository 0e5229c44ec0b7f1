//! # Persistence
//!
//! Durable storage for ciphertext-only state, keyed by account and domain. Nothing
//! passed through [`StatePersistence`] ever contains plaintext.

use crate::error::{StateError, StateErrorExt};
use crate::record::AccountRecord;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use sbox_domain::{AccountId, DataDomain};
use sbox_storage::Storage;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

const RECORD_FILE: &str = "account.json";

#[async_trait]
pub trait StatePersistence: Send + Sync + Debug {
    /// Serialized ciphertext of one domain, `None` if never saved.
    async fn load(
        &self,
        account: &AccountId,
        domain: DataDomain,
    ) -> Result<Option<Vec<u8>>, StateError>;

    async fn save(
        &self,
        account: &AccountId,
        domain: DataDomain,
        bytes: &[u8],
    ) -> Result<(), StateError>;

    async fn load_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StateError>;

    async fn save_record(
        &self,
        account: &AccountId,
        record: &AccountRecord,
    ) -> Result<(), StateError>;

    /// Every account with persisted state.
    async fn accounts(&self) -> Result<Vec<AccountId>, StateError>;

    /// Deletes everything stored for `account`. Returns whether anything existed.
    async fn remove(&self, account: &AccountId) -> Result<bool, StateError>;
}

#[derive(Debug, Default)]
struct MemoryAccount {
    record: Option<Vec<u8>>,
    domains: FxHashMap<DataDomain, Vec<u8>>,
}

/// In-process persistence. The default when `storage.persist` is off, and the
/// workhorse of tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    accounts: Arc<Mutex<FxHashMap<AccountId, MemoryAccount>>>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes last saved for `account`/`domain`.
    #[must_use]
    pub fn raw(&self, account: &AccountId, domain: DataDomain) -> Option<Vec<u8>> {
        self.accounts.lock().get(account).and_then(|a| a.domains.get(&domain).cloned())
    }
}

#[async_trait]
impl StatePersistence for MemoryPersistence {
    async fn load(
        &self,
        account: &AccountId,
        domain: DataDomain,
    ) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.raw(account, domain))
    }

    async fn save(
        &self,
        account: &AccountId,
        domain: DataDomain,
        bytes: &[u8],
    ) -> Result<(), StateError> {
        self.accounts.lock().entry(account.clone()).or_default().domains.insert(domain, bytes.to_vec());
        Ok(())
    }

    async fn load_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StateError> {
        let bytes = self.accounts.lock().get(account).and_then(|a| a.record.clone());
        bytes.map(|b| AccountRecord::from_bytes(&b)).transpose()
    }

    async fn save_record(
        &self,
        account: &AccountId,
        record: &AccountRecord,
    ) -> Result<(), StateError> {
        let bytes = record.to_bytes()?;
        self.accounts.lock().entry(account.clone()).or_default().record = Some(bytes);
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<AccountId>, StateError> {
        let mut ids: Vec<_> = self.accounts.lock().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, account: &AccountId) -> Result<bool, StateError> {
        Ok(self.accounts.lock().remove(account).is_some())
    }
}

/// Persistence over [`sbox_storage`]: one namespace per account, one file per domain.
///
/// Account ids are arbitrary strings, so namespaces use their unpadded URL-safe base64
/// form, which always satisfies the namespace alphabet.
#[derive(Debug, Clone)]
pub struct StoragePersistence {
    storage: Storage,
}

impl StoragePersistence {
    #[must_use]
    pub const fn new(storage: Storage) -> Self {
        Self { storage }
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    fn namespace_of(account: &AccountId) -> String {
        URL_SAFE_NO_PAD.encode(account.as_str())
    }

    fn account_of(namespace: &str) -> Option<AccountId> {
        let bytes = URL_SAFE_NO_PAD.decode(namespace).ok()?;
        String::from_utf8(bytes).ok().map(AccountId::from)
    }

    fn domain_file(domain: DataDomain) -> String {
        format!("{}.json", domain.tag())
    }
}

#[async_trait]
impl StatePersistence for StoragePersistence {
    async fn load(
        &self,
        account: &AccountId,
        domain: DataDomain,
    ) -> Result<Option<Vec<u8>>, StateError> {
        let ns = self.storage.namespace(Self::namespace_of(account))?;
        let bytes = ns.read(Self::domain_file(domain)).await.context(domain.tag())?;
        debug!(account = %account, %domain, found = bytes.is_some(), "Domain state loaded");
        Ok(bytes)
    }

    async fn save(
        &self,
        account: &AccountId,
        domain: DataDomain,
        bytes: &[u8],
    ) -> Result<(), StateError> {
        let ns = self.storage.namespace(Self::namespace_of(account))?;
        ns.write(Self::domain_file(domain), bytes).await.context(domain.tag())?;
        Ok(())
    }

    async fn load_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StateError> {
        let ns = self.storage.namespace(Self::namespace_of(account))?;
        let bytes = ns.read(RECORD_FILE).await.context(RECORD_FILE)?;
        bytes.map(|b| AccountRecord::from_bytes(&b)).transpose()
    }

    async fn save_record(
        &self,
        account: &AccountId,
        record: &AccountRecord,
    ) -> Result<(), StateError> {
        let ns = self.storage.namespace(Self::namespace_of(account))?;
        ns.write(RECORD_FILE, &record.to_bytes()?).await.context(RECORD_FILE)?;
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<AccountId>, StateError> {
        let mut ids = Vec::new();
        for namespace in self.storage.namespaces().await? {
            match Self::account_of(&namespace) {
                Some(id) => ids.push(id),
                None => warn!(namespace = %namespace, "Skipping namespace that is not an account"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, account: &AccountId) -> Result<bool, StateError> {
        Ok(self.storage.remove_namespace(Self::namespace_of(account)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbox_storage::NamespaceName;

    #[test]
    fn namespace_encoding_roundtrips_awkward_ids() {
        for raw in ["user-1", "ada@example.com", "../../etc", "ünïcødé"] {
            let id = AccountId::new(raw);
            let ns = StoragePersistence::namespace_of(&id);

            assert!(NamespaceName::try_from(ns.as_str()).is_ok(), "{ns} must be a valid namespace");
            assert_eq!(StoragePersistence::account_of(&ns), Some(id));
        }
    }

    #[tokio::test]
    async fn memory_persistence_stores_per_account() {
        let store = MemoryPersistence::new();
        let (a, b) = (AccountId::new("a"), AccountId::new("b"));

        store.save(&a, DataDomain::Folders, b"{}").await.unwrap();
        store.save_record(&b, &AccountRecord::default()).await.unwrap();

        assert_eq!(store.load(&a, DataDomain::Folders).await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.load(&b, DataDomain::Folders).await.unwrap(), None);
        assert_eq!(store.accounts().await.unwrap(), vec![a.clone(), b.clone()]);
        assert!(store.remove(&a).await.unwrap());
        assert!(!store.remove(&a).await.unwrap());
    }
}
