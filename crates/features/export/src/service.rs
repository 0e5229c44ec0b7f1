use crate::document::{ExportDocument, ExportFolder, ExportItem};
use crate::error::{ExportError, ExportErrorExt};
use sbox_ciphers::CipherService;
use sbox_folders::FolderService;
use sbox_organization::{PolicyService, PolicyType};
use tracing::info;

#[sbox_derive::sbox_service]
pub struct ExportService {
    pub folders: FolderService,
    pub ciphers: CipherService,
    pub policies: PolicyService,
}

impl ExportService {
    #[must_use]
    pub fn with_services(
        folders: FolderService,
        ciphers: CipherService,
        policies: PolicyService,
    ) -> Self {
        Self::new(ExportServiceInner { folders, ciphers, policies })
    }

    /// Builds the plaintext export of the active account's personal vault.
    /// Trashed and organization-owned items are left out.
    ///
    /// # Errors
    /// [`ExportError::DisabledByPolicy`] when an organization forbids it, or
    /// [`ExportError::State`] for locked or undecryptable data.
    pub async fn document(&self) -> Result<ExportDocument, ExportError> {
        if self
            .policies
            .policy_applies_to_user(PolicyType::DisablePersonalVaultExport)
            .await
            .context("Checking export policy")?
        {
            return Err(ExportError::DisabledByPolicy { context: None });
        }

        let folders = self.folders.get_all_decrypted().await.context("Decrypting folders")?;
        let ciphers = self.ciphers.get_all_decrypted().await.context("Decrypting ciphers")?;

        Ok(ExportDocument {
            encrypted: false,
            folders: folders.into_iter().map(ExportFolder::from).collect(),
            items: ciphers
                .into_iter()
                .filter(|c| !c.is_deleted() && c.organization_id.is_none())
                .map(ExportItem::from)
                .collect(),
        })
    }

    /// [`ExportService::document`] rendered as pretty JSON.
    ///
    /// # Errors
    /// See [`ExportService::document`]; [`ExportError::Serialization`] if rendering fails.
    pub async fn export_json(&self) -> Result<String, ExportError> {
        let document = self.document().await?;
        let json = serde_json::to_string_pretty(&document).context("Rendering export")?;
        info!(
            folders = document.folders.len(),
            items = document.items.len(),
            "Vault exported"
        );
        Ok(json)
    }
}
