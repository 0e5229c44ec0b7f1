//! # Account Registry
//!
//! The process-wide table of tracked accounts and the single active account.
//! A registry is an owned handle (cheap to clone) passed to every service; tests
//! simply build as many as they need.
//!
//! Lifecycle transitions are synchronous on the account itself; the registry adds
//! bookkeeping, persistence of account records and event publication on top.

use crate::account::AccountState;
use crate::error::StateError;
use crate::persistence::{MemoryPersistence, StatePersistence};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use sbox_domain::config::SwitchPolicy;
use sbox_domain::{
    AccountId, AccountProfile, AccountSettings, AuthenticationStatus, ProfilePatch,
    SettingsPatch, TokensPatch, VaultTimeoutAction,
};
use sbox_event_bus::{Event, EventBus};
use sbox_vault::{CryptoService, KeyMaterial};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Notifications about account lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    Added(AccountId),
    Unlocked(AccountId),
    Locked(AccountId),
    Switched { from: Option<AccountId>, to: AccountId },
    LoggedOut(AccountId),
}

/// Latest value of the active account, published on a watch channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveAccount(pub Option<AccountId>);

#[derive(Debug, Default)]
struct Table {
    accounts: FxHashMap<AccountId, Arc<AccountState>>,
    active: Option<AccountId>,
}

#[derive(Debug)]
struct RegistryInner {
    table: RwLock<Table>,
    persistence: Arc<dyn StatePersistence>,
    crypto: Arc<dyn CryptoService>,
    events: EventBus,
    switch_policy: SwitchPolicy,
}

#[derive(Debug, Clone)]
pub struct AccountRegistry {
    inner: Arc<RegistryInner>,
}

/// Configures an [`AccountRegistry`]. Persistence defaults to in-memory.
#[derive(Debug)]
pub struct AccountRegistryBuilder {
    crypto: Arc<dyn CryptoService>,
    persistence: Option<Arc<dyn StatePersistence>>,
    events: Option<EventBus>,
    switch_policy: SwitchPolicy,
}

impl AccountRegistryBuilder {
    #[must_use]
    pub fn persistence(mut self, persistence: Arc<dyn StatePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    #[must_use]
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn switch_policy(mut self, policy: SwitchPolicy) -> Self {
        self.switch_policy = policy;
        self
    }

    #[must_use]
    pub fn build(self) -> AccountRegistry {
        AccountRegistry {
            inner: Arc::new(RegistryInner {
                table: RwLock::default(),
                persistence: self
                    .persistence
                    .unwrap_or_else(|| Arc::new(MemoryPersistence::new())),
                crypto: self.crypto,
                events: self.events.unwrap_or_default(),
                switch_policy: self.switch_policy,
            }),
        }
    }
}

impl AccountRegistry {
    #[must_use]
    pub fn builder(crypto: Arc<dyn CryptoService>) -> AccountRegistryBuilder {
        AccountRegistryBuilder {
            crypto,
            persistence: None,
            events: None,
            switch_policy: SwitchPolicy::default(),
        }
    }

    #[must_use]
    pub fn persistence(&self) -> &Arc<dyn StatePersistence> {
        &self.inner.persistence
    }

    #[must_use]
    pub fn crypto(&self) -> &Arc<dyn CryptoService> {
        &self.inner.crypto
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    #[must_use]
    pub fn switch_policy(&self) -> SwitchPolicy {
        self.inner.switch_policy
    }

    /// # Errors
    /// Returns [`StateError::Events`] if the event type is bound to a watch channel.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<Arc<AccountEvent>>, StateError> {
        Ok(self.inner.events.subscribe::<AccountEvent>()?)
    }

    /// # Errors
    /// Returns [`StateError::Events`] if the event type is bound to a broadcast channel.
    pub fn watch_active(&self) -> Result<watch::Receiver<Arc<ActiveAccount>>, StateError> {
        let current = self.active_id();
        Ok(self.inner.events.subscribe_watch(move || ActiveAccount(current))?)
    }

    /// Inserts a `Locked` account, or merges `patch` into an existing one.
    ///
    /// Only the fields carried by `patch` overwrite existing values.
    ///
    /// # Errors
    /// * [`StateError::UnknownAccount`] if the existing state has already logged out.
    /// * Persistence errors from saving the account record.
    pub async fn add_or_update_account(
        &self,
        id: AccountId,
        patch: ProfilePatch,
    ) -> Result<Arc<AccountState>, StateError> {
        let (state, added) = {
            let mut table = self.inner.table.write();
            if let Some(state) = table.accounts.get(&id) {
                state.apply_profile(patch)?;
                (Arc::clone(state), false)
            } else {
                let mut profile = AccountProfile::default();
                patch.apply(&mut profile);
                let state =
                    Arc::new(AccountState::new(id.clone(), profile, AccountSettings::default()));
                table.accounts.insert(id.clone(), Arc::clone(&state));
                (state, true)
            }
        };

        self.save_record(&state).await?;
        if added {
            info!(account = %id, "Account added");
            self.publish(AccountEvent::Added(id));
        }
        Ok(state)
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub fn set_active(&self, id: &AccountId) -> Result<(), StateError> {
        {
            let mut table = self.inner.table.write();
            if !table.accounts.contains_key(id) {
                return Err(StateError::unknown_account(id));
            }
            table.active = Some(id.clone());
        }
        self.publish_active(Some(id.clone()));
        Ok(())
    }

    /// Makes `id` active and returns the previously active account.
    ///
    /// Under [`SwitchPolicy::KeepUnlocked`] the previous account keeps its keys; under
    /// [`SwitchPolicy::LockPrevious`] it is locked as part of the switch.
    ///
    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub fn switch_account(&self, id: &AccountId) -> Result<Option<AccountId>, StateError> {
        let (previous, previous_state) = {
            let mut table = self.inner.table.write();
            if !table.accounts.contains_key(id) {
                return Err(StateError::unknown_account(id));
            }
            let previous = table.active.replace(id.clone());
            let previous_state = previous
                .as_ref()
                .filter(|p| *p != id)
                .and_then(|p| table.accounts.get(p))
                .map(Arc::clone);
            (previous, previous_state)
        };

        if let Some(state) = previous_state
            && self.inner.switch_policy == SwitchPolicy::LockPrevious
        {
            self.lock_state(&state);
        }

        info!(from = ?previous, to = %id, policy = ?self.inner.switch_policy, "Active account switched");
        self.publish(AccountEvent::Switched { from: previous.clone(), to: id.clone() });
        self.publish_active(Some(id.clone()));
        Ok(previous)
    }

    /// Logs the account out and forgets it. Absent ids are ignored.
    ///
    /// Returns whether an account was removed. Persisted state is deleted best-effort.
    pub async fn remove_account(&self, id: &AccountId) -> bool {
        let (state, was_active) = {
            let mut table = self.inner.table.write();
            let Some(state) = table.accounts.remove(id) else {
                return false;
            };
            state.logout();
            let was_active = table.active.as_ref() == Some(id);
            if was_active {
                table.active = None;
            }
            (state, was_active)
        };

        let _gate = state.gate().lock().await;
        if let Err(e) = self.inner.persistence.remove(id).await {
            warn!(account = %id, error = %e, "Failed to remove persisted account state");
        }

        info!(account = %id, "Account logged out");
        self.publish(AccountEvent::LoggedOut(id.clone()));
        if was_active {
            self.publish_active(None);
        }
        true
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub fn lock(&self, id: &AccountId) -> Result<(), StateError> {
        let state = self.get(id)?;
        self.lock_state(&state);
        Ok(())
    }

    /// # Errors
    /// * [`StateError::UnknownAccount`] if `id` is not tracked.
    /// * [`StateError::InvalidKeyMaterial`] if `keys` fail validation.
    pub fn unlock(&self, id: &AccountId, keys: KeyMaterial) -> Result<(), StateError> {
        let state = self.get(id)?;
        state.unlock(keys)?;
        info!(account = %id, epoch = state.epoch(), "Account unlocked");
        self.publish(AccountEvent::Unlocked(id.clone()));
        Ok(())
    }

    /// Locks every tracked account. Returns how many were unlocked.
    pub fn lock_all(&self) -> usize {
        let states: Vec<_> = self.inner.table.read().accounts.values().cloned().collect();
        states.iter().filter(|s| self.lock_state(s) == AuthenticationStatus::Unlocked).count()
    }

    /// Runs the account's configured [`VaultTimeoutAction`].
    ///
    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub async fn timeout(&self, id: &AccountId) -> Result<VaultTimeoutAction, StateError> {
        let action = self.get(id)?.settings().vault_timeout_action;
        match action {
            VaultTimeoutAction::Lock => self.lock(id)?,
            VaultTimeoutAction::LogOut => {
                self.remove_account(id).await;
            },
        }
        Ok(action)
    }

    /// # Errors
    /// Returns [`StateError::NoActiveAccount`] if no account is active.
    pub fn active(&self) -> Result<Arc<AccountState>, StateError> {
        let table = self.inner.table.read();
        table
            .active
            .as_ref()
            .and_then(|id| table.accounts.get(id))
            .map(Arc::clone)
            .ok_or_else(StateError::no_active_account)
    }

    #[must_use]
    pub fn active_id(&self) -> Option<AccountId> {
        self.inner.table.read().active.clone()
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub fn get(&self, id: &AccountId) -> Result<Arc<AccountState>, StateError> {
        self.inner
            .table
            .read()
            .accounts
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| StateError::unknown_account(id))
    }

    #[must_use]
    pub fn contains(&self, id: &AccountId) -> bool {
        self.inner.table.read().accounts.contains_key(id)
    }

    /// Tracked account ids, sorted.
    #[must_use]
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.inner.table.read().accounts.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Patches the profile of a tracked account. Unlike
    /// [`add_or_update_account`](Self::add_or_update_account) this never adds one.
    ///
    /// # Errors
    /// * [`StateError::UnknownAccount`] if `id` is not tracked.
    /// * Persistence errors from saving the account record.
    pub async fn update_profile(
        &self,
        id: &AccountId,
        patch: ProfilePatch,
    ) -> Result<(), StateError> {
        let state = self.get(id)?;
        state.apply_profile(patch)?;
        self.save_record(&state).await
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub async fn update_settings(
        &self,
        id: &AccountId,
        patch: SettingsPatch,
    ) -> Result<(), StateError> {
        let state = self.get(id)?;
        state.apply_settings(patch)?;
        self.save_record(&state).await
    }

    /// Tokens live in memory only.
    ///
    /// # Errors
    /// Returns [`StateError::UnknownAccount`] if `id` is not tracked.
    pub fn update_tokens(&self, id: &AccountId, patch: TokensPatch) -> Result<(), StateError> {
        self.get(id)?.apply_tokens(patch)
    }

    /// Rebuilds `Locked` accounts from persisted records. Already tracked accounts are
    /// left alone and no account becomes active. Returns how many were restored.
    ///
    /// # Errors
    /// Returns persistence errors from listing or reading records.
    pub async fn restore(&self) -> Result<usize, StateError> {
        let mut restored = 0;
        for id in self.inner.persistence.accounts().await? {
            if self.contains(&id) {
                continue;
            }
            let Some(record) = self.inner.persistence.load_record(&id).await? else {
                warn!(account = %id, "Persisted state without an account record, skipping");
                continue;
            };
            let state = Arc::new(AccountState::from_record(id.clone(), record));
            let inserted = {
                let mut table = self.inner.table.write();
                if table.accounts.contains_key(&id) {
                    false
                } else {
                    table.accounts.insert(id, state);
                    true
                }
            };
            restored += usize::from(inserted);
        }
        info!(restored, "Accounts restored from persistence");
        Ok(restored)
    }

    fn lock_state(&self, state: &AccountState) -> AuthenticationStatus {
        let previous = state.lock();
        if previous == AuthenticationStatus::Unlocked {
            info!(account = %state.id(), epoch = state.epoch(), "Account locked");
            self.publish(AccountEvent::Locked(state.id().clone()));
        }
        previous
    }

    async fn save_record(&self, state: &AccountState) -> Result<(), StateError> {
        let _gate = state.gate().lock().await;
        if state.status() == AuthenticationStatus::LoggedOut {
            debug!(account = %state.id(), "Skipped record save for logged-out account");
            return Ok(());
        }
        let record = state.record();
        self.inner.persistence.save_record(state.id(), &record).await
    }

    fn publish<T: Event>(&self, event: T) {
        if let Err(e) = self.inner.events.publish(event) {
            warn!(error = %e, "Failed to publish account event");
        }
    }

    fn publish_active(&self, active: Option<AccountId>) {
        if let Err(e) = self.inner.events.publish_watch(ActiveAccount(active)) {
            warn!(error = %e, "Failed to publish active account");
        }
    }
}
