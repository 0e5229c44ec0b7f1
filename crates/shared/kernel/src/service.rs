//! # Domain State Services
//!
//! [`DomainStateService`] (list-like domains) and [`ValueStateService`] (single-value
//! domains) route every call through the registry's active account.
//!
//! ## Read path
//! 1. Capture a [`CryptoContext`] and the account epoch (fails with `LockedAccount`).
//! 2. Lazily load ciphertext from persistence, once, under the account gate.
//! 3. On a cache miss, snapshot the ciphertext and its generation, release every lock,
//!    and decrypt.
//! 4. Store the result only if the epoch *and* the generation are unchanged. A changed
//!    epoch means the account was locked or re-keyed: fail with `LockedAccount`. A changed
//!    generation means the ciphertext moved: decrypt again, up to
//!    [`MAX_DECRYPT_ATTEMPTS`] times.
//!
//! ## Write path
//! Mutations hold the account gate across *load, stage, persist, commit*, so writes reach
//! the store in the order they were applied, and the cache only ever holds ciphertext
//! that was saved. Writes never need the account to be unlocked.
//!
//! ## Pinned accounts
//! Every method resolves the active account exactly once. Callers that span an `await`
//! (an API round-trip, a multi-domain sync) capture the [`AccountState`] up front and use
//! the `*_for` variants, so a concurrent switch cannot redirect their writes. A pinned
//! account that has logged out fails with `UnknownAccount`.

use crate::account::AccountState;
use crate::cache::{EncryptionPair, PairCache};
use crate::domain::{CryptoContext, KeyedDomain, ValueDomain};
use crate::error::{StateError, StateErrorExt};
use crate::registry::AccountRegistry;
use sbox_domain::{AccountId, AuthenticationStatus, DataDomain, ItemId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// How often a read decrypts again after the ciphertext changed underneath it.
pub const MAX_DECRYPT_ATTEMPTS: usize = 3;

/// What one cached domain stores and how its whole ciphertext becomes plaintext.
pub(crate) trait Projection: Send + Sync + 'static {
    const DOMAIN: DataDomain;

    type Encrypted: Clone
        + Default
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    type Decrypted: Clone + Send + Sync + 'static;

    fn project(
        ctx: &CryptoContext,
        value: &Self::Encrypted,
    ) -> impl Future<Output = Result<Self::Decrypted, StateError>> + Send;
}

type Pair<P> = EncryptionPair<<P as Projection>::Encrypted, <P as Projection>::Decrypted>;

pub(crate) struct Keyed<M>(PhantomData<fn() -> M>);

impl<M: KeyedDomain> Projection for Keyed<M> {
    const DOMAIN: DataDomain = M::DOMAIN;

    type Encrypted = BTreeMap<ItemId, M::Encrypted>;
    type Decrypted = Vec<M::Decrypted>;

    async fn project(
        ctx: &CryptoContext,
        items: &Self::Encrypted,
    ) -> Result<Self::Decrypted, StateError> {
        let mut view = Vec::with_capacity(items.len());
        for item in items.values() {
            view.push(M::decrypt(ctx, item).await?);
        }
        view.sort_by(M::order);
        Ok(view)
    }
}

pub(crate) struct Single<M>(PhantomData<fn() -> M>);

impl<M: ValueDomain> Projection for Single<M> {
    const DOMAIN: DataDomain = M::DOMAIN;

    type Encrypted = M::Encrypted;
    type Decrypted = M::Decrypted;

    async fn project(
        ctx: &CryptoContext,
        value: &Self::Encrypted,
    ) -> Result<Self::Decrypted, StateError> {
        M::decrypt(ctx, value).await
    }
}

/// The domain-independent half of both services.
struct Engine<P> {
    registry: AccountRegistry,
    _projection: PhantomData<fn() -> P>,
}

impl<P> Clone for Engine<P> {
    fn clone(&self) -> Self {
        Self { registry: self.registry.clone(), _projection: PhantomData }
    }
}

impl<P: Projection> Engine<P> {
    const fn new(registry: AccountRegistry) -> Self {
        Self { registry, _projection: PhantomData }
    }

    fn context(&self, state: &AccountState) -> Result<CryptoContext, StateError> {
        state.decrypt_context(P::DOMAIN, self.registry.crypto()).map(|(ctx, _)| ctx)
    }

    /// Caller must hold the account gate.
    async fn load_locked(&self, state: &AccountState) -> Result<(), StateError> {
        if state.is_loaded(P::DOMAIN) {
            return Ok(());
        }
        let pair = match self.registry.persistence().load(state.id(), P::DOMAIN).await? {
            Some(bytes) => Pair::<P>::decode(&bytes).context(P::DOMAIN.tag())?,
            None => Pair::<P>::default(),
        };
        state.install_cache(P::DOMAIN, Box::new(pair))?;
        debug!(account = %state.id(), domain = %P::DOMAIN, "Domain ciphertext loaded");
        Ok(())
    }

    async fn ensure_loaded(&self, state: &AccountState) -> Result<(), StateError> {
        if state.is_loaded(P::DOMAIN) {
            return Ok(());
        }
        let _gate = state.gate().lock().await;
        self.load_locked(state).await
    }

    /// Applies `f` to a staged copy of the ciphertext under the account gate. When `f`
    /// reports a change, the staged ciphertext is persisted first and only then swapped
    /// into the cache, so a failed save leaves memory and disk in agreement.
    ///
    /// # Errors
    /// [`StateError::UnknownAccount`] once `state` has logged out, or persistence errors.
    async fn mutate<R: Send>(
        &self,
        state: &AccountState,
        f: impl FnOnce(&mut Pair<P>) -> (R, bool) + Send,
    ) -> Result<R, StateError> {
        let _gate = state.gate().lock().await;
        if state.status() == AuthenticationStatus::LoggedOut {
            return Err(StateError::unknown_account(state.id()));
        }
        self.load_locked(state).await?;

        let current = state
            .read_cache::<Pair<P>, _>(P::DOMAIN, |pair| pair.ciphertext().clone())?
            .ok_or_else(|| StateError::unknown_account(state.id()))?;
        let mut staged = Pair::<P>::new(current);
        let (result, changed) = f(&mut staged);
        if !changed {
            return Ok(result);
        }

        let bytes = staged.encode().context(P::DOMAIN.tag())?;
        self.registry
            .persistence()
            .save(state.id(), P::DOMAIN, &bytes)
            .await
            .context(P::DOMAIN.tag())?;

        let ciphertext = staged.into_ciphertext();
        let generation = state.with_cache::<Pair<P>, _>(P::DOMAIN, |pair| {
            pair.set_ciphertext(ciphertext);
            pair.generation()
        })?;
        debug!(account = %state.id(), domain = %P::DOMAIN, generation, "Ciphertext updated");
        Ok(result)
    }

    async fn read<R>(
        &self,
        state: &AccountState,
        f: impl FnOnce(&Pair<P>) -> R + Send,
    ) -> Result<R, StateError> {
        self.ensure_loaded(state).await?;
        state.read_cache::<Pair<P>, _>(P::DOMAIN, f)?.ok_or_else(|| StateError::unknown_account(state.id()))
    }

    async fn decrypted(&self, state: &AccountState) -> Result<P::Decrypted, StateError> {
        let domain = P::DOMAIN;
        let (ctx, epoch) = state.decrypt_context(domain, self.registry.crypto())?;
        self.ensure_loaded(state).await?;

        for attempt in 1..=MAX_DECRYPT_ATTEMPTS {
            let lookup = state
                .read_cache::<Pair<P>, _>(domain, |pair| match pair.decrypted() {
                    Some(view) => Ok(view.clone()),
                    None => Err(pair.snapshot()),
                })?
                .ok_or_else(|| StateError::unknown_account(state.id()))?;
            let (ciphertext, generation) = match lookup {
                Ok(view) => return Ok(view),
                Err(snapshot) => snapshot,
            };

            let view = P::project(&ctx, &ciphertext).await?;

            let stored = state.with_cache_at::<Pair<P>, _>(domain, epoch, |pair| {
                if pair.fill(generation, view) { pair.decrypted().cloned() } else { None }
            })?;
            if let Some(view) = stored {
                trace!(account = %state.id(), %domain, generation, "Decrypted view cached");
                return Ok(view);
            }
            debug!(account = %state.id(), %domain, attempt, "Ciphertext changed during decrypt");
        }

        Err(StateError::ConcurrentModification { domain, context: None })
    }
}

/// Cache-backed state of one list-like domain for whichever account is active.
pub struct DomainStateService<M: KeyedDomain> {
    engine: Engine<Keyed<M>>,
}

impl<M: KeyedDomain> Clone for DomainStateService<M> {
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone() }
    }
}

impl<M: KeyedDomain> fmt::Debug for DomainStateService<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainStateService").field("domain", &M::DOMAIN).finish_non_exhaustive()
    }
}

impl<M: KeyedDomain> DomainStateService<M> {
    #[must_use]
    pub const fn new(registry: AccountRegistry) -> Self {
        Self { engine: Engine::new(registry) }
    }

    #[must_use]
    pub const fn domain(&self) -> DataDomain {
        M::DOMAIN
    }

    #[must_use]
    pub const fn registry(&self) -> &AccountRegistry {
        &self.engine.registry
    }

    /// The active account, provided it is unlocked. Orchestrators call this before
    /// touching the remote API.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or [`StateError::LockedAccount`].
    pub fn require_unlocked(&self) -> Result<Arc<AccountState>, StateError> {
        let state = self.engine.registry.active()?;
        if !state.is_unlocked() {
            return Err(StateError::locked(state.id()));
        }
        Ok(state)
    }

    /// Every entity of the active account, decrypted and ordered by [`KeyedDomain::order`].
    ///
    /// # Errors
    /// * [`StateError::NoActiveAccount`] if no account is active.
    /// * [`StateError::LockedAccount`] if it is not unlocked, or locks mid-decrypt.
    /// * [`StateError::Decrypt`] if any entity fails to decrypt; nothing is cached.
    pub async fn get_all_decrypted(&self) -> Result<Vec<M::Decrypted>, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.decrypted(&state).await
    }

    /// Decrypts a single entity without touching the cached view.
    ///
    /// # Errors
    /// Same as [`get_all_decrypted`](Self::get_all_decrypted).
    pub async fn get(&self, id: &str) -> Result<Option<M::Decrypted>, StateError> {
        let state = self.engine.registry.active()?;
        let ctx = self.engine.context(&state)?;
        let Some(item) = self.engine.read(&state, |pair| pair.get(id).cloned()).await? else {
            return Ok(None);
        };
        M::decrypt(&ctx, &item).await.map(Some)
    }

    /// Ciphertext of one entity. Works while locked.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors from the lazy load.
    pub async fn get_encrypted(&self, id: &str) -> Result<Option<M::Encrypted>, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.read(&state, |pair| pair.get(id).cloned()).await
    }

    /// All ciphertext entities, in id order. Works while locked.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors from the lazy load.
    pub async fn get_all(&self) -> Result<Vec<M::Encrypted>, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.read(&state, |pair| pair.ciphertext().values().cloned().collect()).await
    }

    /// Inserts or replaces one entity, keyed by [`KeyedDomain::id`].
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn upsert(&self, item: M::Encrypted) -> Result<(), StateError> {
        self.upsert_many(vec![item]).await
    }

    /// [`upsert`](Self::upsert) against a pinned account.
    ///
    /// # Errors
    /// [`StateError::UnknownAccount`] if `state` has logged out, or persistence errors.
    pub async fn upsert_for(
        &self,
        state: &AccountState,
        item: M::Encrypted,
    ) -> Result<(), StateError> {
        self.upsert_many_for(state, vec![item]).await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn upsert_many(&self, items: Vec<M::Encrypted>) -> Result<(), StateError> {
        let state = self.engine.registry.active()?;
        self.upsert_many_for(&state, items).await
    }

    /// # Errors
    /// [`StateError::UnknownAccount`] if `state` has logged out, or persistence errors.
    pub async fn upsert_many_for(
        &self,
        state: &AccountState,
        items: Vec<M::Encrypted>,
    ) -> Result<(), StateError> {
        self.engine
            .mutate(state, move |pair| {
                let changed = !items.is_empty();
                for item in items {
                    pair.upsert(M::id(&item).clone(), item);
                }
                ((), changed)
            })
            .await
    }

    /// Removes one entity. Removing an absent id is a no-op. Works while locked.
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn delete(&self, id: &str) -> Result<bool, StateError> {
        let state = self.engine.registry.active()?;
        self.delete_for(&state, id).await
    }

    /// # Errors
    /// [`StateError::UnknownAccount`] if `state` has logged out, or persistence errors.
    pub async fn delete_for(&self, state: &AccountState, id: &str) -> Result<bool, StateError> {
        self.engine
            .mutate(state, |pair| {
                let removed = pair.remove(id).is_some();
                (removed, removed)
            })
            .await
    }

    /// Removes several entities; returns how many existed.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn delete_many(&self, ids: &[ItemId]) -> Result<usize, StateError> {
        let state = self.engine.registry.active()?;
        self.engine
            .mutate(&state, |pair| {
                let removed = ids.iter().filter(|id| pair.remove(id.as_str()).is_some()).count();
                (removed, removed > 0)
            })
            .await
    }

    /// Edits the ciphertext map in place; the decrypted view is dropped afterwards.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn modify<R: Send>(
        &self,
        f: impl FnOnce(&mut BTreeMap<ItemId, M::Encrypted>) -> R + Send,
    ) -> Result<R, StateError> {
        let state = self.engine.registry.active()?;
        self.modify_for(&state, f).await
    }

    /// # Errors
    /// [`StateError::UnknownAccount`] if `state` has logged out, or persistence errors.
    pub async fn modify_for<R: Send>(
        &self,
        state: &AccountState,
        f: impl FnOnce(&mut BTreeMap<ItemId, M::Encrypted>) -> R + Send,
    ) -> Result<R, StateError> {
        self.engine.mutate(state, |pair| (pair.modify(f), true)).await
    }

    /// Replaces the whole domain, e.g. with the result of a full sync.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn replace(&self, items: Vec<M::Encrypted>) -> Result<(), StateError> {
        let state = self.engine.registry.active()?;
        self.replace_for(&state, items).await
    }

    /// # Errors
    /// [`StateError::UnknownAccount`] if `state` has logged out, or persistence errors.
    pub async fn replace_for(
        &self,
        state: &AccountState,
        items: Vec<M::Encrypted>,
    ) -> Result<(), StateError> {
        let map: BTreeMap<_, _> = items.into_iter().map(|i| (M::id(&i).clone(), i)).collect();
        self.engine.mutate(state, move |pair| (pair.set_ciphertext(map), true)).await
    }

    /// Empties the domain for the active account.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn clear(&self) -> Result<(), StateError> {
        let state = self.engine.registry.active()?;
        self.engine.mutate(&state, |pair| (pair.clear(), true)).await
    }

    /// Empties the domain for any tracked account, active or not.
    ///
    /// # Errors
    /// [`StateError::UnknownAccount`] or persistence errors.
    pub async fn clear_for(&self, account: &AccountId) -> Result<(), StateError> {
        let state = self.engine.registry.get(account)?;
        self.engine.mutate(&state, |pair| (pair.clear(), true)).await
    }

    /// Crypto context of the active account for this domain, for encrypting new entities.
    ///
    /// # Errors
    /// [`StateError::NoActiveAccount`] or [`StateError::LockedAccount`].
    pub fn context(&self) -> Result<CryptoContext, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.context(&state)
    }

    /// # Errors
    /// [`StateError::LockedAccount`] unless `state` is unlocked.
    pub fn context_for(&self, state: &AccountState) -> Result<CryptoContext, StateError> {
        self.engine.context(state)
    }
}

/// Cache-backed state of one single-value domain for whichever account is active.
pub struct ValueStateService<M: ValueDomain> {
    engine: Engine<Single<M>>,
}

impl<M: ValueDomain> Clone for ValueStateService<M> {
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone() }
    }
}

impl<M: ValueDomain> fmt::Debug for ValueStateService<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStateService").field("domain", &M::DOMAIN).finish_non_exhaustive()
    }
}

impl<M: ValueDomain> ValueStateService<M> {
    #[must_use]
    pub const fn new(registry: AccountRegistry) -> Self {
        Self { engine: Engine::new(registry) }
    }

    #[must_use]
    pub const fn registry(&self) -> &AccountRegistry {
        &self.engine.registry
    }

    /// # Errors
    /// Same as [`DomainStateService::get_all_decrypted`].
    pub async fn get_decrypted(&self) -> Result<M::Decrypted, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.decrypted(&state).await
    }

    /// # Errors
    /// [`StateError::LockedAccount`] unless `state` is unlocked, or [`StateError::Decrypt`].
    pub async fn get_decrypted_for(
        &self,
        state: &AccountState,
    ) -> Result<M::Decrypted, StateError> {
        self.engine.decrypted(state).await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors from the lazy load.
    pub async fn get_encrypted(&self) -> Result<M::Encrypted, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.read(&state, |pair| pair.ciphertext().clone()).await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn set(&self, value: M::Encrypted) -> Result<(), StateError> {
        let state = self.engine.registry.active()?;
        self.engine.mutate(&state, move |pair| (pair.set_ciphertext(value), true)).await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn update<R: Send>(
        &self,
        f: impl FnOnce(&mut M::Encrypted) -> R + Send,
    ) -> Result<R, StateError> {
        let state = self.engine.registry.active()?;
        self.update_for(&state, f).await
    }

    /// # Errors
    /// [`StateError::UnknownAccount`] if `state` has logged out, or persistence errors.
    pub async fn update_for<R: Send>(
        &self,
        state: &AccountState,
        f: impl FnOnce(&mut M::Encrypted) -> R + Send,
    ) -> Result<R, StateError> {
        self.engine.mutate(state, |pair| (pair.modify(f), true)).await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or persistence errors.
    pub async fn clear(&self) -> Result<(), StateError> {
        let state = self.engine.registry.active()?;
        self.engine.mutate(&state, |pair| (pair.clear(), true)).await
    }

    /// # Errors
    /// [`StateError::NoActiveAccount`] or [`StateError::LockedAccount`].
    pub fn context(&self) -> Result<CryptoContext, StateError> {
        let state = self.engine.registry.active()?;
        self.engine.context(&state)
    }

    /// # Errors
    /// [`StateError::LockedAccount`] unless `state` is unlocked.
    pub fn context_for(&self, state: &AccountState) -> Result<CryptoContext, StateError> {
        self.engine.context(state)
    }
}
