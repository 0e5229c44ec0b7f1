use chrono::{DateTime, Utc};
use sbox_domain::{DataDomain, ItemId};
use sbox_kernel::{CryptoContext, KeyedDomain, StateError};
use sbox_vault::EncString;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendType {
    #[default]
    Text,
    File,
}

/// A share link as stored. Name, notes, text and file name stay encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendData {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: SendType,
    pub name: EncString,
    #[serde(default)]
    pub notes: Option<EncString>,
    #[serde(default)]
    pub text: Option<EncString>,
    #[serde(default)]
    pub file_name: Option<EncString>,
    #[serde(default)]
    pub access_count: u32,
    #[serde(default)]
    pub max_access_count: Option<u32>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    pub deletion_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SendView {
    pub id: ItemId,
    pub kind: SendType,
    pub name: String,
    pub notes: Option<String>,
    pub text: Option<String>,
    pub file_name: Option<String>,
    pub access_count: u32,
    pub max_access_count: Option<u32>,
    pub disabled: bool,
    pub expiration_date: Option<DateTime<Utc>>,
    pub deletion_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
}

impl std::fmt::Debug for SendView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendView")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("text", &self.text.as_ref().map(|_| "[REDACTED]"))
            .field("access_count", &self.access_count)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl SendView {
    /// Whether the link can still be opened at `now`.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.disabled
            && self.max_access_count.is_none_or(|max| self.access_count < max)
            && self.expiration_date.is_none_or(|at| at > now)
            && self.deletion_date > now
    }
}

/// Plaintext input for creating or editing a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendDraft {
    pub id: Option<ItemId>,
    pub kind: SendType,
    pub name: String,
    pub notes: Option<String>,
    pub text: Option<String>,
    pub file_name: Option<String>,
    pub max_access_count: Option<u32>,
    pub disabled: bool,
    pub expiration_date: Option<DateTime<Utc>>,
    pub deletion_date: DateTime<Utc>,
}

impl SendDraft {
    /// A text send that is deleted by the server after `deletion_date`.
    #[must_use]
    pub fn text(
        name: impl Into<String>,
        text: impl Into<String>,
        deletion_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            kind: SendType::Text,
            name: name.into(),
            notes: None,
            text: Some(text.into()),
            file_name: None,
            max_access_count: None,
            disabled: false,
            expiration_date: None,
            deletion_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(rename = "type")]
    pub kind: SendType,
    pub name: EncString,
    pub notes: Option<EncString>,
    pub text: Option<EncString>,
    pub file_name: Option<EncString>,
    pub max_access_count: Option<u32>,
    pub disabled: bool,
    pub expiration_date: Option<DateTime<Utc>>,
    pub deletion_date: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Sends;

impl KeyedDomain for Sends {
    const DOMAIN: DataDomain = DataDomain::Sends;

    type Encrypted = SendData;
    type Decrypted = SendView;

    fn id(item: &SendData) -> &ItemId {
        &item.id
    }

    async fn decrypt(ctx: &CryptoContext, item: &SendData) -> Result<SendView, StateError> {
        Ok(SendView {
            id: item.id.clone(),
            kind: item.kind,
            name: ctx.decrypt_text(&item.name).await?,
            notes: ctx.decrypt_optional(item.notes.as_ref()).await?,
            text: ctx.decrypt_optional(item.text.as_ref()).await?,
            file_name: ctx.decrypt_optional(item.file_name.as_ref()).await?,
            access_count: item.access_count,
            max_access_count: item.max_access_count,
            disabled: item.disabled,
            expiration_date: item.expiration_date,
            deletion_date: item.deletion_date,
            revision_date: item.revision_date,
        })
    }

    // Soonest deletion first, matching how share links are listed.
    fn order(a: &SendView, b: &SendView) -> Ordering {
        a.deletion_date.cmp(&b.deletion_date).then_with(|| a.id.cmp(&b.id))
    }
}
