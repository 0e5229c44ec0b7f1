//! Vault item models in their three shapes: stored ciphertext ([`CipherData`]),
//! decrypted view ([`CipherView`]) and plaintext edit form ([`CipherDraft`]).

use chrono::{DateTime, Utc};
use sbox_domain::{DataDomain, ItemId};
use sbox_kernel::{CryptoContext, KeyedDomain, StateError};
use sbox_vault::EncString;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CipherType {
    #[default]
    Login,
    SecureNote,
    Card,
    Identity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginData {
    pub username: Option<EncString>,
    pub password: Option<EncString>,
    pub totp: Option<EncString>,
    pub uris: Vec<EncString>,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginView {
    pub username: Option<String>,
    pub password: Option<String>,
    pub totp: Option<String>,
    pub uris: Vec<String>,
}

impl fmt::Debug for LoginView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginView")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("totp", &self.totp.as_ref().map(|_| "<redacted>"))
            .field("uris", &self.uris)
            .finish()
    }
}

/// A vault item as stored and as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherData {
    pub id: ItemId,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub folder_id: Option<ItemId>,
    #[serde(rename = "type")]
    pub kind: CipherType,
    pub name: EncString,
    #[serde(default)]
    pub notes: Option<EncString>,
    #[serde(default)]
    pub login: Option<LoginData>,
    #[serde(default)]
    pub favorite: bool,
    pub revision_date: DateTime<Utc>,
    #[serde(default)]
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherView {
    pub id: ItemId,
    pub organization_id: Option<String>,
    pub folder_id: Option<ItemId>,
    pub kind: CipherType,
    pub name: String,
    pub notes: Option<String>,
    pub login: Option<LoginView>,
    pub favorite: bool,
    pub revision_date: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

impl CipherView {
    /// Soft-deleted items sit in the trash until purged.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_date.is_some()
    }
}

/// Plaintext form used to create or edit an item. `id` is `None` until created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipherDraft {
    pub id: Option<ItemId>,
    pub folder_id: Option<ItemId>,
    pub kind: CipherType,
    pub name: String,
    pub notes: Option<String>,
    pub login: Option<LoginView>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherRequest {
    pub folder_id: Option<ItemId>,
    #[serde(rename = "type")]
    pub kind: CipherType,
    pub name: EncString,
    pub notes: Option<EncString>,
    pub login: Option<LoginData>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub ids: Vec<ItemId>,
    pub folder_id: Option<ItemId>,
}

#[derive(Debug)]
pub struct Ciphers;

impl KeyedDomain for Ciphers {
    const DOMAIN: DataDomain = DataDomain::Ciphers;

    type Encrypted = CipherData;
    type Decrypted = CipherView;

    fn id(item: &CipherData) -> &ItemId {
        &item.id
    }

    async fn decrypt(ctx: &CryptoContext, item: &CipherData) -> Result<CipherView, StateError> {
        let login = match &item.login {
            Some(login) => Some(decrypt_login(ctx, login).await?),
            None => None,
        };
        Ok(CipherView {
            id: item.id.clone(),
            organization_id: item.organization_id.clone(),
            folder_id: item.folder_id.clone(),
            kind: item.kind,
            name: ctx.decrypt_text(&item.name).await?,
            notes: ctx.decrypt_optional(item.notes.as_ref()).await?,
            login,
            favorite: item.favorite,
            revision_date: item.revision_date,
            deleted_date: item.deleted_date,
        })
    }

    fn order(a: &CipherView, b: &CipherView) -> Ordering {
        a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.id.cmp(&b.id))
    }
}

async fn decrypt_login(ctx: &CryptoContext, login: &LoginData) -> Result<LoginView, StateError> {
    let mut uris = Vec::with_capacity(login.uris.len());
    for uri in &login.uris {
        uris.push(ctx.decrypt_text(uri).await?);
    }
    Ok(LoginView {
        username: ctx.decrypt_optional(login.username.as_ref()).await?,
        password: ctx.decrypt_optional(login.password.as_ref()).await?,
        totp: ctx.decrypt_optional(login.totp.as_ref()).await?,
        uris,
    })
}

pub(crate) async fn encrypt_login(
    ctx: &CryptoContext,
    login: &LoginView,
) -> Result<LoginData, StateError> {
    let mut uris = Vec::with_capacity(login.uris.len());
    for uri in &login.uris {
        uris.push(ctx.encrypt_text(uri).await?);
    }
    Ok(LoginData {
        username: ctx.encrypt_optional(login.username.as_deref()).await?,
        password: ctx.encrypt_optional(login.password.as_deref()).await?,
        totp: ctx.encrypt_optional(login.totp.as_deref()).await?,
        uris,
    })
}
