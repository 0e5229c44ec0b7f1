use crate::api::SendApi;
use crate::models::{SendData, SendDraft, SendRequest, SendView, Sends};
use sbox_domain::ItemId;
use sbox_kernel::{AccountRegistry, CryptoContext, DomainStateService, StateError, StateErrorExt};
use std::sync::Arc;
use tracing::debug;

#[sbox_derive::sbox_service]
pub struct SendService {
    pub state: DomainStateService<Sends>,
    pub api: Arc<dyn SendApi>,
}

impl SendService {
    #[must_use]
    pub fn with_registry(registry: AccountRegistry, api: Arc<dyn SendApi>) -> Self {
        Self::new(SendServiceInner { state: DomainStateService::new(registry), api })
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`], [`StateError::LockedAccount`] or
    /// [`StateError::Encrypt`].
    pub async fn encrypt(&self, draft: &SendDraft) -> Result<SendRequest, StateError> {
        Self::seal(&self.state.context()?, draft).await
    }

    async fn seal(ctx: &CryptoContext, draft: &SendDraft) -> Result<SendRequest, StateError> {
        Ok(SendRequest {
            kind: draft.kind,
            name: ctx.encrypt_text(&draft.name).await?,
            notes: ctx.encrypt_optional(draft.notes.as_deref()).await?,
            text: ctx.encrypt_optional(draft.text.as_deref()).await?,
            file_name: ctx.encrypt_optional(draft.file_name.as_deref()).await?,
            max_access_count: draft.max_access_count,
            disabled: draft.disabled,
            expiration_date: draft.expiration_date,
            deletion_date: draft.deletion_date,
        })
    }

    /// Encrypts, sends to the server, then caches what the server returned under the
    /// account that started the call.
    ///
    /// # Errors
    /// Encryption errors, or [`StateError::Api`] with the cache untouched.
    pub async fn save(&self, draft: &mut SendDraft) -> Result<SendData, StateError> {
        let account = self.state.require_unlocked()?;
        let request = Self::seal(&self.state.context_for(&account)?, draft).await?;
        let data = match &draft.id {
            None => self.api.create(&request).await.context("Creating send")?,
            Some(id) => self.api.update(id, &request).await.context("Updating send")?,
        };

        draft.id = Some(data.id.clone());
        self.state.upsert_for(&account, data.clone()).await?;
        debug!(send = %data.id, "Send saved");
        Ok(data)
    }

    /// # Errors
    /// [`StateError::LockedAccount`] without calling the API, or [`StateError::Api`].
    pub async fn delete(&self, id: &ItemId) -> Result<(), StateError> {
        let account = self.state.require_unlocked()?;
        self.api.delete(id).await.context("Deleting send")?;
        self.state.delete_for(&account, id.as_str()).await?;
        debug!(send = %id, "Send deleted");
        Ok(())
    }

    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn get_all_decrypted(&self) -> Result<Vec<SendView>, StateError> {
        self.state.get_all_decrypted().await
    }
}
