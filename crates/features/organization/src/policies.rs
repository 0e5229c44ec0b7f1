use sbox_domain::{DataDomain, ItemId};
use sbox_kernel::{AccountRegistry, CryptoContext, DomainStateService, KeyedDomain, StateError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyType {
    TwoFactorAuthentication,
    MasterPassword,
    PasswordGenerator,
    SingleOrg,
    RequireSso,
    PersonalOwnership,
    DisableSend,
    SendOptions,
    ResetPassword,
    MaximumVaultTimeout,
    DisablePersonalVaultExport,
}

/// A policy as synced. Nothing in it is encrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyData {
    pub id: ItemId,
    pub organization_id: String,
    #[serde(rename = "type")]
    pub kind: PolicyType,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    pub enabled: bool,
}

/// The in-memory policy view. Projection is a plain copy, yet it is cached and
/// invalidated exactly like a decrypted domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub id: ItemId,
    pub organization_id: String,
    pub kind: PolicyType,
    pub data: Option<serde_json::Value>,
    pub enabled: bool,
}

impl Policy {
    /// Reads an unsigned integer option from the policy's data object.
    #[must_use]
    pub fn data_u32(&self, key: &str) -> Option<u32> {
        self.data
            .as_ref()?
            .get(key)?
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
    }
}

#[derive(Debug)]
pub struct Policies;

impl KeyedDomain for Policies {
    const DOMAIN: DataDomain = DataDomain::Policies;

    type Encrypted = PolicyData;
    type Decrypted = Policy;

    fn id(item: &PolicyData) -> &ItemId {
        &item.id
    }

    async fn decrypt(_ctx: &CryptoContext, item: &PolicyData) -> Result<Policy, StateError> {
        Ok(Policy {
            id: item.id.clone(),
            organization_id: item.organization_id.clone(),
            kind: item.kind,
            data: item.data.clone(),
            enabled: item.enabled,
        })
    }

    fn order(a: &Policy, b: &Policy) -> Ordering {
        a.kind.cmp(&b.kind).then_with(|| a.id.cmp(&b.id))
    }
}

#[sbox_derive::sbox_service]
pub struct PolicyService {
    pub state: DomainStateService<Policies>,
}

impl PolicyService {
    #[must_use]
    pub fn with_registry(registry: AccountRegistry) -> Self {
        Self::new(PolicyServiceInner { state: DomainStateService::new(registry) })
    }

    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn get_all_decrypted(&self) -> Result<Vec<Policy>, StateError> {
        self.state.get_all_decrypted().await
    }

    /// Enabled policies of one kind for the active account.
    ///
    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn enabled(&self, kind: PolicyType) -> Result<Vec<Policy>, StateError> {
        let all = self.state.get_all_decrypted().await?;
        Ok(all.into_iter().filter(|p| p.enabled && p.kind == kind).collect())
    }

    /// Whether any organization enforces `kind` on the active account.
    ///
    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn policy_applies_to_user(&self, kind: PolicyType) -> Result<bool, StateError> {
        let applies = !self.enabled(kind).await?.is_empty();
        trace!(policy = ?kind, applies, "Policy evaluated");
        Ok(applies)
    }

    /// The strictest vault timeout, in minutes, any organization imposes.
    ///
    /// # Errors
    /// See [`DomainStateService::get_all_decrypted`].
    pub async fn maximum_vault_timeout(&self) -> Result<Option<u32>, StateError> {
        let policies = self.enabled(PolicyType::MaximumVaultTimeout).await?;
        Ok(policies.iter().filter_map(|p| p.data_u32("minutes")).min())
    }
}
