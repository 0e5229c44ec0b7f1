use chrono::{DateTime, Utc};
use sbox_domain::ItemId;
use sbox_kernel::{CryptoContext, KeyedDomain, StateError};
use sbox_vault::EncString;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A folder as stored: the name stays encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderData {
    pub id: ItemId,
    pub name: EncString,
    pub revision_date: DateTime<Utc>,
}

/// Decrypted projection of [`FolderData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderView {
    pub id: ItemId,
    pub name: String,
    pub revision_date: DateTime<Utc>,
}

/// A folder being created or edited. `id` is `None` until the server assigns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: Option<ItemId>,
    pub name: EncString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRequest {
    pub name: EncString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    pub id: ItemId,
    pub name: EncString,
    pub revision_date: DateTime<Utc>,
}

impl From<&Folder> for FolderRequest {
    fn from(folder: &Folder) -> Self {
        Self { name: folder.name.clone() }
    }
}

impl From<FolderResponse> for FolderData {
    fn from(response: FolderResponse) -> Self {
        Self { id: response.id, name: response.name, revision_date: response.revision_date }
    }
}

/// The folder domain: keyed by id, listed by name.
#[derive(Debug)]
pub struct Folders;

impl KeyedDomain for Folders {
    const DOMAIN: sbox_domain::DataDomain = sbox_domain::DataDomain::Folders;

    type Encrypted = FolderData;
    type Decrypted = FolderView;

    fn id(item: &FolderData) -> &ItemId {
        &item.id
    }

    async fn decrypt(ctx: &CryptoContext, item: &FolderData) -> Result<FolderView, StateError> {
        Ok(FolderView {
            id: item.id.clone(),
            name: ctx.decrypt_text(&item.name).await?,
            revision_date: item.revision_date,
        })
    }

    fn order(a: &FolderView, b: &FolderView) -> Ordering {
        a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.id.cmp(&b.id))
    }
}
