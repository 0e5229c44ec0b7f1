use crate::api::FolderApi;
use crate::models::{Folder, FolderData, FolderRequest, FolderView, Folders};
use sbox_domain::ItemId;
use sbox_kernel::{AccountRegistry, DomainStateService, StateError, StateErrorExt};
use std::sync::Arc;
use tracing::debug;

/// Folder orchestration: API round-trip first, ciphertext cache second.
#[sbox_derive::sbox_service]
pub struct FolderService {
    pub state: DomainStateService<Folders>,
    pub api: Arc<dyn FolderApi>,
}

impl FolderService {
    #[must_use]
    pub fn with_registry(registry: AccountRegistry, api: Arc<dyn FolderApi>) -> Self {
        Self::new(FolderServiceInner { state: DomainStateService::new(registry), api })
    }

    /// Encrypts a folder name for the active account, ready for [`save`](Self::save).
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`], [`StateError::LockedAccount`] or
    /// [`StateError::Encrypt`].
    pub async fn encrypt(&self, name: &str) -> Result<Folder, StateError> {
        let ctx = self.state.context()?;
        Ok(Folder { id: None, name: ctx.encrypt_text(name).await? })
    }

    /// Creates the folder when it has no id, updates it otherwise, then caches the
    /// server's response for the account that was active when the call started. The
    /// assigned id is written back onto `folder`.
    ///
    /// # Errors
    /// * [`StateError::NoActiveAccount`]; the API is not called.
    /// * [`StateError::Api`] if the request fails; the cache is left untouched.
    /// * [`StateError::UnknownAccount`] if the account logged out during the request.
    pub async fn save(&self, folder: &mut Folder) -> Result<FolderData, StateError> {
        let account = self.state.registry().active()?;
        let request = FolderRequest::from(&*folder);
        let response = match &folder.id {
            None => self.api.create(&request).await.context("Creating folder")?,
            Some(id) => self.api.update(id, &request).await.context("Updating folder")?,
        };

        let data = FolderData::from(response);
        folder.id = Some(data.id.clone());
        self.state.upsert_for(&account, data.clone()).await?;
        debug!(folder = %data.id, "Folder saved");
        Ok(data)
    }

    /// Deletes on the server, then from the cache.
    ///
    /// # Errors
    /// * [`StateError::LockedAccount`] while the active account is locked; the API is
    ///   not called.
    /// * [`StateError::Api`] if the request fails; the cache is left untouched.
    pub async fn delete(&self, id: &ItemId) -> Result<(), StateError> {
        let account = self.state.require_unlocked()?;
        self.api.delete(id).await.context("Deleting folder")?;
        self.state.delete_for(&account, id.as_str()).await?;
        debug!(folder = %id, "Folder deleted");
        Ok(())
    }

    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn get_all_decrypted(&self) -> Result<Vec<FolderView>, StateError> {
        self.state.get_all_decrypted().await
    }

    /// # Errors
    /// See [`DomainStateService::get`].
    pub async fn get(&self, id: &str) -> Result<Option<FolderView>, StateError> {
        self.state.get(id).await
    }
}
