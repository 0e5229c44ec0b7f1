use crate::error::{StrongboxError, StrongboxErrorExt};
use crate::sync::SyncResponse;
use chrono::Utc;
use sbox_ciphers::{CipherApi, CipherService};
use sbox_domain::config::{CipherKind, StateConfig, StorageConfig};
use sbox_domain::{DomainSet, ProfilePatch};
use sbox_export::ExportService;
use sbox_folders::{FolderApi, FolderService};
use sbox_generator::PasswordHistoryService;
use sbox_kernel::{AccountRegistry, MemoryPersistence, StatePersistence, StoragePersistence};
use sbox_organization::{CollectionService, PolicyService};
use sbox_sends::{SendApi, SendService};
use sbox_storage::Storage;
use sbox_vault::{AeadCrypto, Aes, ChaCha, CryptoService};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Remote collaborators for the domains that write through the server.
#[derive(Clone)]
pub struct RemoteApis {
    pub folders: Arc<dyn FolderApi>,
    pub ciphers: Arc<dyn CipherApi>,
    pub sends: Arc<dyn SendApi>,
}

impl fmt::Debug for RemoteApis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteApis").finish_non_exhaustive()
    }
}

/// One registry and every domain service bound to it.
#[sbox_derive::sbox_service]
pub struct Strongbox {
    pub registry: AccountRegistry,
    pub folders: FolderService,
    pub ciphers: CipherService,
    pub sends: SendService,
    pub collections: CollectionService,
    pub policies: PolicyService,
    pub password_history: PasswordHistoryService,
    pub export: ExportService,
}

impl Strongbox {
    /// Wires a client from configuration.
    ///
    /// With `storage.persist` enabled, accounts persisted by an earlier run are restored
    /// in the `Locked` state and none of them is active.
    ///
    /// # Errors
    /// [`StrongboxError::Storage`] if the data directory cannot be opened, or
    /// [`StrongboxError::State`] if persisted account records cannot be read.
    pub async fn from_config(
        config: &StateConfig,
        apis: RemoteApis,
    ) -> Result<Self, StrongboxError> {
        let crypto = crypto_for(config.security.cipher, config.security.compress_payloads);
        let persistence = persistence_for(&config.storage).await?;

        let registry = AccountRegistry::builder(crypto)
            .persistence(persistence)
            .switch_policy(config.session.switch_policy)
            .build();

        if config.storage.persist {
            registry.restore().await.context("Restoring accounts")?;
        }

        info!(
            cipher = ?config.security.cipher,
            persist = config.storage.persist,
            policy = ?config.session.switch_policy,
            "Strongbox initialized"
        );
        Ok(Self::with_registry(registry, apis, config.session.password_history_limit))
    }

    /// Wires every service around an existing registry.
    #[must_use]
    pub fn with_registry(registry: AccountRegistry, apis: RemoteApis, history_limit: usize) -> Self {
        let folders = FolderService::with_registry(registry.clone(), apis.folders);
        let ciphers = CipherService::with_registry(registry.clone(), apis.ciphers);
        let policies = PolicyService::with_registry(registry.clone());
        let export =
            ExportService::with_services(folders.clone(), ciphers.clone(), policies.clone());

        Self::new(StrongboxInner {
            sends: SendService::with_registry(registry.clone(), apis.sends),
            collections: CollectionService::with_registry(registry.clone()),
            password_history: PasswordHistoryService::with_registry(
                registry.clone(),
                history_limit,
            ),
            registry,
            folders,
            ciphers,
            policies,
            export,
        })
    }

    /// Replaces every synced domain of the active account with the server's ciphertext
    /// and records the sync time on the profile.
    ///
    /// The account is resolved once; switching accounts while the sync runs does not
    /// redirect the remaining domains. Ciphertext is accepted while the account is
    /// locked; decrypted views rebuild on the next read after unlock.
    ///
    /// # Errors
    /// [`StrongboxError::State`] when no account is active, the account logs out
    /// mid-sync, or persistence fails. Domains replaced before the failure stay replaced.
    pub async fn apply_sync(&self, response: SyncResponse) -> Result<DomainSet, StrongboxError> {
        let account = self.registry.active()?;
        let counts = (
            response.folders.len(),
            response.ciphers.len(),
            response.sends.len(),
            response.collections.len(),
            response.policies.len(),
        );

        self.folders
            .state
            .replace_for(&account, response.folders)
            .await
            .context("Syncing folders")?;
        self.ciphers
            .state
            .replace_for(&account, response.ciphers)
            .await
            .context("Syncing ciphers")?;
        self.sends.state.replace_for(&account, response.sends).await.context("Syncing sends")?;
        self.collections
            .state
            .replace_for(&account, response.collections)
            .await
            .context("Syncing collections")?;
        self.policies
            .state
            .replace_for(&account, response.policies)
            .await
            .context("Syncing policies")?;

        self.registry
            .update_profile(account.id(), ProfilePatch::default().last_sync(Utc::now()))
            .await
            .context("Recording sync time")?;

        debug!(
            account = %account.id(),
            folders = counts.0,
            ciphers = counts.1,
            sends = counts.2,
            collections = counts.3,
            policies = counts.4,
            "Full sync applied"
        );
        Ok(DomainSet::SYNCED)
    }

    /// Renders the active account's vault as plaintext JSON.
    ///
    /// # Errors
    /// [`StrongboxError::Export`]; see [`ExportService::export_json`].
    pub async fn export_json(&self) -> Result<String, StrongboxError> {
        Ok(self.export.export_json().await?)
    }
}

fn crypto_for(cipher: CipherKind, compress: bool) -> Arc<dyn CryptoService> {
    match cipher {
        CipherKind::Aes => Arc::new(AeadCrypto::<Aes>::new().compression(compress)),
        CipherKind::Chacha => Arc::new(AeadCrypto::<ChaCha>::new().compression(compress)),
    }
}

async fn persistence_for(
    config: &StorageConfig,
) -> Result<Arc<dyn StatePersistence>, StrongboxError> {
    if !config.persist {
        return Ok(Arc::new(MemoryPersistence::new()));
    }
    let storage = Storage::builder()
        .root(&config.data_dir)
        .compression(config.compression.into())
        .connect()
        .await
        .context("Opening state storage")?;
    Ok(Arc::new(StoragePersistence::new(storage)))
}
