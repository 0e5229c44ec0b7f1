use sbox_domain::{DataDomain, ItemId};
use sbox_kernel::{AccountRegistry, CryptoContext, DomainStateService, KeyedDomain, StateError};
use sbox_vault::EncString;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An organization collection as synced; only the name is encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionData {
    pub id: ItemId,
    pub organization_id: String,
    pub name: EncString,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView {
    pub id: ItemId,
    pub organization_id: String,
    pub name: String,
    pub external_id: Option<String>,
    pub read_only: bool,
}

#[derive(Debug)]
pub struct Collections;

impl KeyedDomain for Collections {
    const DOMAIN: DataDomain = DataDomain::Collections;

    type Encrypted = CollectionData;
    type Decrypted = CollectionView;

    fn id(item: &CollectionData) -> &ItemId {
        &item.id
    }

    async fn decrypt(
        ctx: &CryptoContext,
        item: &CollectionData,
    ) -> Result<CollectionView, StateError> {
        Ok(CollectionView {
            id: item.id.clone(),
            organization_id: item.organization_id.clone(),
            name: ctx.decrypt_text(&item.name).await?,
            external_id: item.external_id.clone(),
            read_only: item.read_only,
        })
    }

    fn order(a: &CollectionView, b: &CollectionView) -> Ordering {
        a.organization_id
            .cmp(&b.organization_id)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Read side of collections. They only arrive through sync, so there is no remote API.
#[sbox_derive::sbox_service]
pub struct CollectionService {
    pub state: DomainStateService<Collections>,
}

impl CollectionService {
    #[must_use]
    pub fn with_registry(registry: AccountRegistry) -> Self {
        Self::new(CollectionServiceInner { state: DomainStateService::new(registry) })
    }

    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn get_all_decrypted(&self) -> Result<Vec<CollectionView>, StateError> {
        self.state.get_all_decrypted().await
    }

    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn in_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<CollectionView>, StateError> {
        let all = self.state.get_all_decrypted().await?;
        Ok(all.into_iter().filter(|c| c.organization_id == organization_id).collect())
    }
}
