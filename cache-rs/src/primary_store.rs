//! The weakly-held primary entity store (`spec.md` §4.3).
//!
//! A key is present in the primary store iff the LRU tier holds a strong
//! reference to its value, or some external holder keeps it reachable
//! through a strong clone of the `Arc` handed back by [`PrimaryStore::put`].
//! Rust has no runtime weak map, so this emulates one per `spec.md` §9: each
//! entity lives behind an `Arc<Entity>`, the store itself only keeps a
//! `Weak<Entity>`, and resolution prunes evaporated entries on access.
//!
//! Grounded on the design note in `spec.md` §9 and, for the `Weak` usage
//! idiom, `other_examples`' jstz `kv-transaction.rs` (`Weak<RefCell<...>>`
//! held alongside a strong `Arc`).

use crate::entity::{Entity, EntryState};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

struct Slot {
    entity: Weak<Entity>,
    state: EntryState,
}

pub struct PrimaryStore<K> {
    entries: HashMap<K, Slot>,
}

impl<K: Clone + Eq + Hash> PrimaryStore<K> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Resolves the weak reference, returning `None` if the referent has
    /// been reclaimed. Evaporated entries are pruned on access.
    pub fn get(&mut self, key: &K) -> Option<Entity> {
        let resolved = self.entries.get(key).and_then(|slot| slot.entity.upgrade());
        match resolved {
            Some(arc) => Some((*arc).clone()),
            None => {
                self.entries.remove(key);
                None
            }
        }
    }

    pub fn entry_state(&self, key: &K) -> Option<EntryState> {
        self.entries.get(key).map(|slot| slot.state)
    }

    /// Installs or replaces the weak reference and state for `key`,
    /// returning the strong `Arc` so the caller (the cache façade) can
    /// decide whether to also install it into the LRU tier per
    /// `state.retained.lru`.
    pub fn put(&mut self, key: K, entity: Entity, state: EntryState) -> Arc<Entity> {
        let arc = Arc::new(entity);
        self.entries.insert(key, Slot { entity: Arc::downgrade(&arc), state });
        arc
    }

    /// Installs a weak reference to an already-shared entity (used when the
    /// caller already holds the `Arc`, e.g. re-installing into the LRU
    /// tier moved it without changing identity).
    pub fn put_shared(&mut self, key: K, arc: &Arc<Entity>, state: EntryState) {
        self.entries.insert(key, Slot { entity: Arc::downgrade(arc), state });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Live keys as of this call, without forcing resolution. Iteration
    /// over the returned keys should resolve each individually and treat a
    /// resolution failure as a `PrimaryStoreInvariantViolation` if the key
    /// was believed live when listed (see `cache.rs`'s async iterators).
    pub fn live_keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    /// Resolves without pruning the backing map on miss; used by iterators
    /// that need to tell "never evaporated" apart from "evaporated between
    /// listing and resolving".
    pub fn peek(&self, key: &K) -> Option<(Entity, EntryState)> {
        self.entries.get(key).and_then(|slot| {
            slot.entity.upgrade().map(|arc| ((*arc).clone(), slot.state))
        })
    }
}

impl<K: Clone + Eq + Hash> Default for PrimaryStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Retention;

    fn state() -> EntryState {
        EntryState::new(Retention::new(true, 60_000), None)
    }

    #[test]
    fn get_resolves_a_live_strong_reference() {
        let mut store = PrimaryStore::new();
        let arc = store.put("k", serde_json::json!({"v": 1}), state());
        assert_eq!(store.get(&"k"), Some(serde_json::json!({"v": 1})));
        drop(arc); // no external holder left, and nothing else keeps it strong
        assert_eq!(store.get(&"k"), None);
    }

    #[test]
    fn evaporated_entry_is_pruned_on_access() {
        let mut store = PrimaryStore::new();
        {
            let _arc = store.put("k", serde_json::json!(1), state());
        }
        assert!(store.get(&"k").is_none());
        assert!(!store.contains_key(&"k"));
    }

    #[test]
    fn external_strong_ref_keeps_entry_resolvable() {
        let mut store = PrimaryStore::new();
        let arc = store.put("k", serde_json::json!(1), state());
        let _held_elsewhere = arc.clone();
        drop(arc);
        assert_eq!(store.get(&"k"), Some(serde_json::json!(1)));
    }
}
