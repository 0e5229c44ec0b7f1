//! # Encryption Pairs
//!
//! An [`EncryptionPair`] holds ciphertext (durable, authoritative) next to an optional
//! decrypted projection (ephemeral, never persisted). Every mutation of the ciphertext
//! drops the projection inside the same `&mut` borrow, so no reader can ever observe new
//! ciphertext next to old plaintext.
//!
//! Each pair also carries a **generation** counter, bumped on every mutation, invalidation
//! and clear. Async callers decrypt outside any lock from a [`snapshot`](EncryptionPair::snapshot)
//! and hand the result back through [`fill`](EncryptionPair::fill), which refuses it if
//! the generation moved in the meantime.

use sbox_domain::ItemId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Ciphertext of type `E` paired with its lazily computed plaintext `D`.
pub struct EncryptionPair<E, D> {
    ciphertext: E,
    decrypted: Option<D>,
    generation: u64,
}

/// Keyed variant used by list-like domains. The decrypted view covers the whole
/// collection and is invalidated as a unit.
pub type DataEncryptionPair<E, D> = EncryptionPair<BTreeMap<ItemId, E>, Vec<D>>;

impl<E: Default, D> Default for EncryptionPair<E, D> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: fmt::Debug, D> fmt::Debug for EncryptionPair<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionPair")
            .field("ciphertext", &self.ciphertext)
            .field("decrypted", &self.decrypted.as_ref().map(|_| "<plaintext>"))
            .field("generation", &self.generation)
            .finish()
    }
}

impl<E, D> EncryptionPair<E, D> {
    #[must_use]
    pub const fn new(ciphertext: E) -> Self {
        Self { ciphertext, decrypted: None, generation: 0 }
    }

    #[must_use]
    pub const fn ciphertext(&self) -> &E {
        &self.ciphertext
    }

    #[must_use]
    pub const fn decrypted(&self) -> Option<&D> {
        self.decrypted.as_ref()
    }

    #[must_use]
    pub const fn has_decrypted(&self) -> bool {
        self.decrypted.is_some()
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn into_ciphertext(self) -> E {
        self.ciphertext
    }

    /// Replaces the ciphertext and unconditionally drops the decrypted view.
    pub fn set_ciphertext(&mut self, value: E) {
        self.ciphertext = value;
        self.invalidate();
    }

    /// Mutates the ciphertext in place, then drops the decrypted view.
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut E) -> R) -> R {
        let result = f(&mut self.ciphertext);
        self.invalidate();
        result
    }

    /// Returns the cached plaintext, decrypting the current ciphertext on a miss.
    ///
    /// A successful result is cached; a failure caches nothing, so the next call
    /// decrypts again.
    ///
    /// # Errors
    /// Whatever `decrypt` returns.
    pub fn get_decrypted<Er>(
        &mut self,
        decrypt: impl FnOnce(&E) -> Result<D, Er>,
    ) -> Result<&D, Er> {
        let value = match self.decrypted.take() {
            Some(value) => value,
            None => decrypt(&self.ciphertext)?,
        };
        Ok(&*self.decrypted.insert(value))
    }

    /// Clones the ciphertext together with the generation it belongs to.
    #[must_use]
    pub fn snapshot(&self) -> (E, u64)
    where
        E: Clone,
    {
        (self.ciphertext.clone(), self.generation)
    }

    /// Stores `value` as the decrypted view if `generation` is still current.
    ///
    /// Returns `false` (and drops `value`) when the pair changed since the snapshot.
    pub fn fill(&mut self, generation: u64, value: D) -> bool {
        if generation != self.generation {
            return false;
        }
        self.decrypted = Some(value);
        true
    }

    /// Drops the decrypted view. Idempotent.
    pub fn invalidate(&mut self) {
        self.decrypted = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Resets the ciphertext to empty and drops the decrypted view.
    pub fn clear(&mut self)
    where
        E: Default,
    {
        self.ciphertext = E::default();
        self.invalidate();
    }
}

impl<E, D> EncryptionPair<BTreeMap<ItemId, E>, Vec<D>> {
    /// Inserts or replaces the ciphertext at `id`; returns the previous entry.
    pub fn upsert(&mut self, id: ItemId, value: E) -> Option<E> {
        let previous = self.ciphertext.insert(id, value);
        self.invalidate();
        previous
    }

    /// Removes the ciphertext at `id`. Removing an absent id changes nothing.
    pub fn remove(&mut self, id: &str) -> Option<E> {
        let removed = self.ciphertext.remove(id);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&E> {
        self.ciphertext.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ciphertext.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.ciphertext.keys()
    }
}

impl<E, D> EncryptionPair<E, D>
where
    E: DeserializeOwned,
{
    /// Rebuilds a pair from persisted ciphertext. The decrypted view starts empty.
    ///
    /// # Errors
    /// Returns the JSON error if `bytes` do not describe an `E`.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }
}

/// Type-erased view of a pair, so an account can hold one cache per domain in a
/// single table and walk all of them on lock or logout.
pub trait PairCache: Any + Send + Sync + fmt::Debug {
    fn generation(&self) -> u64;
    fn has_decrypted(&self) -> bool;
    fn invalidate(&mut self);
    fn clear(&mut self);

    /// Serializes the ciphertext only.
    ///
    /// # Errors
    /// Returns the JSON error if the ciphertext cannot be serialized.
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E, D> PairCache for EncryptionPair<E, D>
where
    E: Serialize + Default + fmt::Debug + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    fn generation(&self) -> u64 {
        self.generation
    }

    fn has_decrypted(&self) -> bool {
        self.decrypted.is_some()
    }

    fn invalidate(&mut self) {
        Self::invalidate(self);
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.ciphertext)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
