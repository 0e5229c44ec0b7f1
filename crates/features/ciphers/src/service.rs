use crate::api::CipherApi;
use crate::models::{
    CipherData, CipherDraft, CipherRequest, CipherView, Ciphers, MoveRequest, encrypt_login,
};
use sbox_domain::ItemId;
use sbox_kernel::{AccountRegistry, CryptoContext, DomainStateService, StateError, StateErrorExt};
use std::sync::Arc;
use tracing::debug;

#[sbox_derive::sbox_service]
pub struct CipherService {
    pub state: DomainStateService<Ciphers>,
    pub api: Arc<dyn CipherApi>,
}

impl CipherService {
    #[must_use]
    pub fn with_registry(registry: AccountRegistry, api: Arc<dyn CipherApi>) -> Self {
        Self::new(CipherServiceInner { state: DomainStateService::new(registry), api })
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`], [`StateError::LockedAccount`] or
    /// [`StateError::Encrypt`].
    pub async fn encrypt(&self, draft: &CipherDraft) -> Result<CipherRequest, StateError> {
        Self::seal(&self.state.context()?, draft).await
    }

    async fn seal(ctx: &CryptoContext, draft: &CipherDraft) -> Result<CipherRequest, StateError> {
        let login = match &draft.login {
            Some(login) => Some(encrypt_login(ctx, login).await?),
            None => None,
        };
        Ok(CipherRequest {
            folder_id: draft.folder_id.clone(),
            kind: draft.kind,
            name: ctx.encrypt_text(&draft.name).await?,
            notes: ctx.encrypt_optional(draft.notes.as_deref()).await?,
            login,
            favorite: draft.favorite,
        })
    }

    /// Encrypts `draft`, creates or updates it remotely and caches the server's copy
    /// for the account that was active when the call started. A newly assigned id is
    /// written back onto `draft`.
    ///
    /// # Errors
    /// Encryption errors, [`StateError::Api`] with the cache untouched, or
    /// [`StateError::UnknownAccount`] if the account logged out during the request.
    pub async fn save(&self, draft: &mut CipherDraft) -> Result<CipherData, StateError> {
        let account = self.state.require_unlocked()?;
        let request = Self::seal(&self.state.context_for(&account)?, draft).await?;
        let data = match &draft.id {
            None => self.api.create(&request).await.context("Creating cipher")?,
            Some(id) => self.api.update(id, &request).await.context("Updating cipher")?,
        };

        draft.id = Some(data.id.clone());
        self.state.upsert_for(&account, data.clone()).await?;
        debug!(cipher = %data.id, "Cipher saved");
        Ok(data)
    }

    /// # Errors
    /// [`StateError::LockedAccount`] without calling the API, or [`StateError::Api`]
    /// with the cache untouched.
    pub async fn delete(&self, id: &ItemId) -> Result<(), StateError> {
        let account = self.state.require_unlocked()?;
        self.api.delete(id).await.context("Deleting cipher")?;
        self.state.delete_for(&account, id.as_str()).await?;
        debug!(cipher = %id, "Cipher deleted");
        Ok(())
    }

    /// Moves items into a folder (or out of any folder) on the server, then rewrites
    /// the cached ciphertext. Returns how many cached items were moved.
    ///
    /// # Errors
    /// [`StateError::LockedAccount`] without calling the API, or [`StateError::Api`]
    /// with the cache untouched.
    pub async fn move_many(
        &self,
        ids: &[ItemId],
        folder_id: Option<ItemId>,
    ) -> Result<usize, StateError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let account = self.state.require_unlocked()?;

        let request = MoveRequest { ids: ids.to_vec(), folder_id: folder_id.clone() };
        self.api.move_many(&request).await.context("Moving ciphers")?;

        let moved = self
            .state
            .modify_for(&account, |items| {
                let mut moved = 0;
                for id in ids {
                    if let Some(cipher) = items.get_mut(id) {
                        cipher.folder_id.clone_from(&folder_id);
                        moved += 1;
                    }
                }
                moved
            })
            .await?;
        debug!(requested = ids.len(), moved, folder = ?folder_id, "Ciphers moved");
        Ok(moved)
    }

    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn get_all_decrypted(&self) -> Result<Vec<CipherView>, StateError> {
        self.state.get_all_decrypted().await
    }

    /// Decrypted items filed under `folder_id` (`None` = unfiled), trash excluded.
    ///
    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn get_all_in_folder(
        &self,
        folder_id: Option<&ItemId>,
    ) -> Result<Vec<CipherView>, StateError> {
        let all = self.state.get_all_decrypted().await?;
        Ok(all
            .into_iter()
            .filter(|c| !c.is_deleted() && c.folder_id.as_ref() == folder_id)
            .collect())
    }
}
