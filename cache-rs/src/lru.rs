//! The bounded, strongly-held LRU tier (`spec.md` §4.1).
//!
//! Capacity is fixed at construction. Overflow evicts the key at the head
//! of insertion order; re-inserting an existing key moves it to the tail.
//! Eviction here is purely about insertion order, not recency of reads —
//! `get` through the cache façade does not touch this structure, only
//! `set`/`load`/commit do (`spec.md` §4.1, §4.3).
//!
//! Grounded on `other_examples`' `velesdb` `cache/lru.rs`, which uses
//! `IndexMap::shift_remove` + re-insert for O(1) move-to-back. That
//! implementation is thread-safe (wraps an `RwLock`); this tier doesn't
//! need to be, since the cache façade already serializes mutation
//! (`spec.md` §5).

use crate::entity::Entity;
use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::Arc;

pub struct Lru<K> {
    capacity: usize,
    entries: IndexMap<K, Arc<Entity>>,
}

impl<K: Clone + Eq + Hash> Lru<K> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: IndexMap::with_capacity(capacity.min(1024)) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&Entity> {
        self.entries.get(key).map(|arc| arc.as_ref())
    }

    /// If `key` is present, removes then reinserts it (moves to the tail).
    /// Else, if at capacity, evicts the head before inserting.
    ///
    /// Capacity 0 makes every `set` a no-op: the value is inserted then
    /// immediately evicted.
    pub fn set(&mut self, key: K, value: Entity) {
        self.set_shared(key, Arc::new(value));
    }

    /// Like [`Lru::set`], but shares an existing `Arc` rather than wrapping
    /// a fresh one — used when the same entity must also resolve through
    /// the primary store's weak reference (`spec.md` §4.3).
    pub fn set_shared(&mut self, key: K, value: Arc<Entity>) {
        self.entries.shift_remove(&key);

        if self.capacity == 0 {
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                log::debug!("lru tier at capacity {}, evicting insertion-order head", self.capacity);
                drop(evicted);
            }
        }

        self.entries.insert(key, value);
    }

    pub fn delete(&mut self, key: &K) {
        self.entries.shift_remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates keys in insertion order (head = least recently inserted).
    pub fn entries(&self) -> impl Iterator<Item = (&K, &Entity)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}
