//! # Account State
//!
//! One [`AccountState`] per tracked account: key material, profile and settings, and
//! one type-erased [`PairCache`] per data domain.
//!
//! ## Locking discipline
//! * `inner` is a synchronous `parking_lot` lock. Every method takes it once, does its
//!   work, and releases it before returning. It is never held across an `.await`.
//! * `gate` is an async mutex serializing *mutate then persist* sequences and lazy loads
//!   for this account, so the store never sees writes out of order.
//! * `epoch` is bumped by every lock, unlock and logout. A decrypt that captured an
//!   older epoch is discarded instead of cached.

use crate::cache::PairCache;
use crate::domain::CryptoContext;
use crate::error::StateError;
use crate::record::AccountRecord;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use sbox_domain::{
    AccountId, AccountProfile, AccountSettings, AccountTokens, AuthenticationStatus, DataDomain,
    DomainSet, ProfilePatch, SettingsPatch, TokensPatch,
};
use sbox_vault::{CryptoService, KeyMaterial};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct AccountInner {
    status: AuthenticationStatus,
    keys: Option<KeyMaterial>,
    epoch: u64,
    profile: AccountProfile,
    settings: AccountSettings,
    tokens: AccountTokens,
    caches: FxHashMap<DataDomain, Box<dyn PairCache>>,
}

impl AccountInner {
    fn invalidate_all(&mut self) {
        for cache in self.caches.values_mut() {
            cache.invalidate();
        }
    }

    const fn bump_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }
}

/// Everything the client holds for one signed-in account.
pub struct AccountState {
    id: AccountId,
    inner: RwLock<AccountInner>,
    gate: tokio::sync::Mutex<()>,
}

impl fmt::Debug for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("AccountState")
            .field("id", &self.id)
            .field("status", &inner.status)
            .field("epoch", &inner.epoch)
            .field("domains", &inner.caches.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl AccountState {
    /// A freshly signed-in account: `Locked`, no keys, nothing cached.
    #[must_use]
    pub fn new(id: AccountId, profile: AccountProfile, settings: AccountSettings) -> Self {
        Self {
            id,
            inner: RwLock::new(AccountInner {
                status: AuthenticationStatus::Locked,
                keys: None,
                epoch: 0,
                profile,
                settings,
                tokens: AccountTokens::default(),
                caches: FxHashMap::default(),
            }),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn from_record(id: AccountId, record: AccountRecord) -> Self {
        Self::new(id, record.profile, record.settings)
    }

    #[must_use]
    pub const fn id(&self) -> &AccountId {
        &self.id
    }

    #[must_use]
    pub fn status(&self) -> AuthenticationStatus {
        self.inner.read().status
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.status().is_unlocked()
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    #[must_use]
    pub fn profile(&self) -> AccountProfile {
        self.inner.read().profile.clone()
    }

    #[must_use]
    pub fn settings(&self) -> AccountSettings {
        self.inner.read().settings.clone()
    }

    #[must_use]
    pub fn tokens(&self) -> AccountTokens {
        self.inner.read().tokens.clone()
    }

    #[must_use]
    pub fn record(&self) -> AccountRecord {
        let inner = self.inner.read();
        AccountRecord { profile: inner.profile.clone(), settings: inner.settings.clone() }
    }

    /// Drops every decrypted view and the key material, then marks the account locked.
    ///
    /// Runs under a single write guard, so no reader observes a half-locked account.
    /// Locking a logged-out account does nothing. Returns the status before the call.
    pub fn lock(&self) -> AuthenticationStatus {
        let mut inner = self.inner.write();
        let previous = inner.status;
        if previous == AuthenticationStatus::LoggedOut {
            return previous;
        }
        inner.invalidate_all();
        inner.keys = None;
        inner.status = AuthenticationStatus::Locked;
        let epoch = inner.bump_epoch();
        drop(inner);
        debug!(account = %self.id, epoch, "Account caches invalidated");
        previous
    }

    /// Installs key material and marks the account unlocked. Decryption stays lazy.
    ///
    /// # Errors
    /// * [`StateError::InvalidKeyMaterial`] if the keys are empty or all-zero.
    /// * [`StateError::UnknownAccount`] if the account has logged out.
    pub fn unlock(&self, keys: KeyMaterial) -> Result<(), StateError> {
        keys.validate().map_err(|e| StateError::InvalidKeyMaterial {
            message: e.to_string().into(),
            context: Some(self.id.to_string().into()),
        })?;

        let mut inner = self.inner.write();
        if inner.status == AuthenticationStatus::LoggedOut {
            return Err(StateError::unknown_account(&self.id));
        }
        inner.invalidate_all();
        inner.keys = Some(keys);
        inner.status = AuthenticationStatus::Unlocked;
        inner.profile.ever_been_unlocked = true;
        let epoch = inner.bump_epoch();
        drop(inner);
        debug!(account = %self.id, epoch, "Account key material installed");
        Ok(())
    }

    /// Zeroes keys, clears and drops every cache, and forgets session tokens.
    ///
    /// The state is terminal afterwards: unlock and cache writes fail with
    /// [`StateError::UnknownAccount`].
    pub fn logout(&self) {
        let mut inner = self.inner.write();
        for cache in inner.caches.values_mut() {
            cache.clear();
        }
        inner.caches.clear();
        inner.keys = None;
        inner.tokens = AccountTokens::default();
        inner.status = AuthenticationStatus::LoggedOut;
        let epoch = inner.bump_epoch();
        drop(inner);
        debug!(account = %self.id, epoch, "Account state cleared");
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] after logout.
    pub fn apply_profile(&self, patch: ProfilePatch) -> Result<(), StateError> {
        let mut inner = self.writable()?;
        patch.apply(&mut inner.profile);
        Ok(())
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] after logout.
    pub fn apply_settings(&self, patch: SettingsPatch) -> Result<(), StateError> {
        let mut inner = self.writable()?;
        patch.apply(&mut inner.settings);
        Ok(())
    }

    /// # Errors
    /// Returns [`StateError::UnknownAccount`] after logout.
    pub fn apply_tokens(&self, patch: TokensPatch) -> Result<(), StateError> {
        let mut inner = self.writable()?;
        patch.apply(&mut inner.tokens);
        Ok(())
    }

    /// Domains whose ciphertext is currently held in memory.
    #[must_use]
    pub fn loaded_domains(&self) -> DomainSet {
        self.inner.read().caches.keys().fold(DomainSet::empty(), |set, d| set | d.flag())
    }

    #[must_use]
    pub fn is_loaded(&self, domain: DataDomain) -> bool {
        self.inner.read().caches.contains_key(&domain)
    }

    /// Whether `domain` currently holds plaintext.
    #[must_use]
    pub fn has_decrypted(&self, domain: DataDomain) -> bool {
        self.inner.read().caches.get(&domain).is_some_and(|c| c.has_decrypted())
    }

    pub(crate) const fn gate(&self) -> &tokio::sync::Mutex<()> {
        &self.gate
    }

    /// Builds the crypto context for `domain` and returns it with the current epoch.
    ///
    /// # Errors
    /// Returns [`StateError::LockedAccount`] unless the account is unlocked.
    pub(crate) fn decrypt_context(
        &self,
        domain: DataDomain,
        crypto: &Arc<dyn CryptoService>,
    ) -> Result<(CryptoContext, u64), StateError> {
        let inner = self.inner.read();
        let keys = match (&inner.status, &inner.keys) {
            (AuthenticationStatus::Unlocked, Some(keys)) => keys,
            _ => return Err(StateError::locked(&self.id)),
        };
        let key = keys.domain_key(domain.tag())?;
        Ok((CryptoContext::new(Arc::clone(crypto), key, domain), inner.epoch))
    }

    /// Installs a freshly loaded cache unless one is already present.
    pub(crate) fn install_cache(
        &self,
        domain: DataDomain,
        cache: Box<dyn PairCache>,
    ) -> Result<(), StateError> {
        let mut inner = self.writable()?;
        inner.caches.entry(domain).or_insert(cache);
        Ok(())
    }

    /// Runs `f` against the typed cache of `domain`, creating an empty one if absent.
    ///
    /// # Errors
    /// * [`StateError::UnknownAccount`] after logout.
    /// * [`StateError::Internal`] if the domain holds a cache of another type.
    pub(crate) fn with_cache<P, R>(
        &self,
        domain: DataDomain,
        f: impl FnOnce(&mut P) -> R,
    ) -> Result<R, StateError>
    where
        P: PairCache + Default,
    {
        let mut inner = self.writable()?;
        let cache = inner.caches.entry(domain).or_insert_with(|| Box::new(P::default()));
        let typed = downcast_mut::<P>(cache.as_mut(), domain)?;
        Ok(f(typed))
    }

    /// Like [`with_cache`](Self::with_cache), but only while the account is still unlocked
    /// at `epoch`. This is the only path that stores plaintext.
    ///
    /// # Errors
    /// Returns [`StateError::LockedAccount`] if the account was locked, re-keyed or
    /// logged out since `epoch` was captured.
    pub(crate) fn with_cache_at<P, R>(
        &self,
        domain: DataDomain,
        epoch: u64,
        f: impl FnOnce(&mut P) -> R,
    ) -> Result<R, StateError>
    where
        P: PairCache + Default,
    {
        let mut inner = self.inner.write();
        if inner.epoch != epoch || !inner.status.is_unlocked() {
            return Err(StateError::locked(&self.id));
        }
        let cache = inner.caches.entry(domain).or_insert_with(|| Box::new(P::default()));
        let typed = downcast_mut::<P>(cache.as_mut(), domain)?;
        Ok(f(typed))
    }

    /// Reads the typed cache of `domain`; `None` if it has not been loaded.
    ///
    /// # Errors
    /// Returns [`StateError::Internal`] if the domain holds a cache of another type.
    pub(crate) fn read_cache<P, R>(
        &self,
        domain: DataDomain,
        f: impl FnOnce(&P) -> R,
    ) -> Result<Option<R>, StateError>
    where
        P: PairCache,
    {
        let inner = self.inner.read();
        let Some(cache) = inner.caches.get(&domain) else {
            return Ok(None);
        };
        let typed = cache.as_any().downcast_ref::<P>().ok_or_else(|| mismatch::<P>(domain))?;
        Ok(Some(f(typed)))
    }

    fn writable(&self) -> Result<parking_lot::RwLockWriteGuard<'_, AccountInner>, StateError> {
        let inner = self.inner.write();
        if inner.status == AuthenticationStatus::LoggedOut {
            return Err(StateError::unknown_account(&self.id));
        }
        Ok(inner)
    }
}

fn downcast_mut<P: PairCache>(
    cache: &mut dyn PairCache,
    domain: DataDomain,
) -> Result<&mut P, StateError> {
    cache.as_any_mut().downcast_mut::<P>().ok_or_else(|| mismatch::<P>(domain))
}

fn mismatch<P>(domain: DataDomain) -> StateError {
    StateError::Internal {
        message: format!("{domain} cache is not a {}", std::any::type_name::<P>()).into(),
        context: None,
    }
}
