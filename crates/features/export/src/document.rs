use chrono::{DateTime, Utc};
use sbox_ciphers::{CipherType, CipherView, LoginView};
use sbox_domain::ItemId;
use sbox_folders::FolderView;
use serde::{Deserialize, Serialize};

/// Plaintext export layout. `encrypted` is always `false` for this format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub encrypted: bool,
    pub folders: Vec<ExportFolder>,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFolder {
    pub id: ItemId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportItem {
    pub id: ItemId,
    pub folder_id: Option<ItemId>,
    #[serde(rename = "type")]
    pub kind: CipherType,
    pub name: String,
    pub notes: Option<String>,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub login: Option<ExportLogin>,
    pub revision_date: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLogin {
    pub username: Option<String>,
    pub password: Option<String>,
    pub totp: Option<String>,
    pub uris: Vec<ExportUri>,
}

impl std::fmt::Debug for ExportLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportLogin")
            .field("username", &self.username)
            .field("uris", &self.uris)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportUri {
    pub uri: String,
}

impl From<FolderView> for ExportFolder {
    fn from(folder: FolderView) -> Self {
        Self { id: folder.id, name: folder.name }
    }
}

impl From<LoginView> for ExportLogin {
    fn from(login: LoginView) -> Self {
        Self {
            username: login.username,
            password: login.password,
            totp: login.totp,
            uris: login.uris.into_iter().map(|uri| ExportUri { uri }).collect(),
        }
    }
}

impl From<CipherView> for ExportItem {
    fn from(cipher: CipherView) -> Self {
        Self {
            id: cipher.id,
            folder_id: cipher.folder_id,
            kind: cipher.kind,
            name: cipher.name,
            notes: cipher.notes,
            favorite: cipher.favorite,
            login: cipher.login.map(Into::into),
            revision_date: cipher.revision_date,
        }
    }
}
