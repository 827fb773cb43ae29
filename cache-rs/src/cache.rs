//! The public façade wiring the tiers together (`spec.md` §4.6).
//!
//! Grounded on `kv/src/mvcc/mvcc.rs`'s `MVCC<E>`, which wraps a storage
//! engine in `Arc<Mutex<E>>` and exposes `begin`/`begin_read_only`/`status`.
//! `Cache<K>` plays the same role here: a cheaply-`Clone`-able handle over
//! shared, mutex-guarded state, with `begin_transaction` standing in for
//! `MVCC::begin`.

use crate::entity::{Entity, EntityRevision, EntryState};
use crate::error::CResult;
use crate::lru::Lru;
use crate::options::CacheOptions;
use crate::primary_store::PrimaryStore;
use crate::revision_log::RevisionLog;
use crate::transaction::LiveTransaction;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) struct CacheInner<K> {
    pub(crate) primary: PrimaryStore<K>,
    pub(crate) lru: Lru<K>,
    pub(crate) revisions: RevisionLog<K>,
}

/// A cheaply-cloneable handle over the cache's shared state. All tiers
/// (primary store, LRU, revision log) live behind a single mutex, acquired
/// around each mutation per `spec.md` §5.
pub struct Cache<K> {
    pub(crate) inner: Arc<Mutex<CacheInner<K>>>,
    pub(crate) options: Arc<CacheOptions<K>>,
}

impl<K> Clone for Cache<K> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), options: self.options.clone() }
    }
}

/// Constructs a cache with the given options (or defaults per `spec.md`
/// §6: `expiration.lru = 10_000`, `expiration.ttl = 60_000`).
pub fn build_cache<K: Clone + Eq + Hash + 'static>(options: Option<CacheOptions<K>>) -> Cache<K> {
    let options = options.unwrap_or_default();
    let lru = Lru::new(options.expiration.lru);
    Cache {
        inner: Arc::new(Mutex::new(CacheInner {
            primary: PrimaryStore::new(),
            lru,
            revisions: RevisionLog::new(),
        })),
        options: Arc::new(options),
    }
}

impl<K: Clone + Eq + Hash + Debug + Send + Sync + 'static> Cache<K> {
    /// Resolves `key` against the primary store's weak reference.
    pub async fn get(&self, key: &K) -> Option<Entity> {
        let mut inner = self.inner.lock().await;
        inner.primary.get(key)
    }

    /// Deep-clones every reachable entity out of the primary store.
    pub async fn save(&self) -> CResult<Vec<(K, Entity, EntryState)>> {
        let inner = self.inner.lock().await;
        let mut out = Vec::new();
        for key in inner.primary.live_keys() {
            if let Some((entity, state)) = inner.primary.peek(&key) {
                out.push((key, entity, state));
            }
        }
        Ok(out)
    }

    /// Installs each `(key, value, state)` in order, deep-cloning the
    /// value, installing into the LRU tier where `state.retained.lru`, and
    /// appending a revision numbered by a load-local counter starting at 0
    /// (shared across every entry in this call, per `spec.md` §4.6).
    /// Does not clear first — callers wanting a replace must `clear()`.
    pub async fn load(&self, entries: Vec<(K, Entity, EntryState)>) -> CResult<()> {
        let mut inner = self.inner.lock().await;
        let mut counter: u64 = 0;
        for (key, value, state) in entries {
            let stored = value.clone();
            let arc = inner.primary.put(key.clone(), stored, state);
            if state.retained.lru {
                inner.lru.set_shared(key.clone(), arc);
            }
            counter += 1;
            inner.revisions.append(key, EntityRevision::new(value, counter));
        }
        Ok(())
    }

    /// Empties the primary store, the LRU tier, and the revision log.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.primary.clear();
        inner.lru.clear();
        inner.revisions.clear_all();
    }

    /// Constructs a live transaction from a fresh snapshot of the primary
    /// store and revision logs.
    pub async fn begin_transaction(&self) -> LiveTransaction<K> {
        log::debug!("beginning live transaction");
        let inner = self.inner.lock().await;
        let mut snapshot = HashMap::new();
        let mut entry_state = HashMap::new();
        let mut entry_revisions = HashMap::new();
        for key in inner.primary.live_keys() {
            if let Some((entity, state)) = inner.primary.peek(&key) {
                entry_revisions.insert(key.clone(), inner.revisions.iter(&key).cloned().collect());
                snapshot.insert(key.clone(), entity);
                entry_state.insert(key, state);
            }
        }
        drop(inner);
        LiveTransaction::new(self.clone(), snapshot, entry_revisions, entry_state)
    }

    /// Installs the committed entities (installing into the LRU tier only
    /// where `state.retained.lru`) and appends the accumulated revisions,
    /// atomically relative to other committing transactions (both tiers
    /// are mutated under the same lock acquisition).
    pub(crate) async fn commit_transaction(
        &self,
        entries: Vec<(K, Entity, EntryState)>,
        revisions: HashMap<K, Vec<EntityRevision>>,
    ) -> CResult<()> {
        let mut inner = self.inner.lock().await;
        log::debug!("installing {} committed entr(y/ies)", entries.len());
        for (key, entity, state) in entries {
            let arc = inner.primary.put(key.clone(), entity, state);
            if state.retained.lru {
                inner.lru.set_shared(key, arc);
            } else {
                inner.lru.delete(&key);
            }
        }
        for (key, revs) in revisions {
            inner.revisions.append_many(key, revs);
        }
        Ok(())
    }

    /// Reads the current primary value for `key`, bypassing any
    /// transaction's snapshot — used by the commit loop (`spec.md` §4.4
    /// step 1: "fresh, not snapshot").
    pub(crate) async fn get_fresh(&self, key: &K) -> Option<Entity> {
        self.get(key).await
    }

    /// `(key, entity, state)` for every entry live at call time. Lists keys
    /// first, then resolves each behind a suspension point. A key whose
    /// weak reference has evaporated by the time it's resolved is skipped
    /// silently — per `spec.md` §3, an evaporated entry is tolerated during
    /// normal iteration, not an error; `PrimaryStoreInvariantViolation` is
    /// reserved for evaporation detected strictly mid-yield, which
    /// `live_keys()` + `peek()` here cannot distinguish from "evaporated
    /// before this call even started".
    pub async fn entries(&self) -> CResult<Vec<(K, Entity, EntryState)>> {
        let live_keys = {
            let inner = self.inner.lock().await;
            inner.primary.live_keys()
        };
        let mut out = Vec::with_capacity(live_keys.len());
        for key in live_keys {
            tokio::task::yield_now().await;
            let inner = self.inner.lock().await;
            if let Some((entity, state)) = inner.primary.peek(&key) {
                out.push((key, entity, state));
            }
        }
        Ok(out)
    }

    pub async fn keys(&self) -> CResult<Vec<K>> {
        Ok(self.entries().await?.into_iter().map(|(k, _, _)| k).collect())
    }

    pub async fn values(&self) -> CResult<Vec<Entity>> {
        Ok(self.entries().await?.into_iter().map(|(_, v, _)| v).collect())
    }

    /// The full revision history for `key`, oldest first.
    pub async fn entry_revisions(&self, key: &K) -> Vec<EntityRevision> {
        let inner = self.inner.lock().await;
        inner.revisions.iter(key).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let cache = build_cache::<String>(None);
        assert_eq!(cache.get(&"missing".to_string()).await, None);
    }

    #[tokio::test]
    async fn load_then_get_round_trips() {
        let cache = build_cache::<String>(None);
        cache
            .load(vec![(
                "k".to_string(),
                serde_json::json!({"v": 1}),
                EntryState::new(crate::entity::Retention::new(true, 60_000), None),
            )])
            .await
            .unwrap();

        assert_eq!(cache.get(&"k".to_string()).await, Some(serde_json::json!({"v": 1})));
        assert_eq!(cache.entry_revisions(&"k".to_string()).await.len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_everything() {
        let cache = build_cache::<String>(None);
        cache
            .load(vec![(
                "k".to_string(),
                serde_json::json!(1),
                EntryState::new(crate::entity::Retention::new(true, 60_000), None),
            )])
            .await
            .unwrap();
        cache.clear().await;
        assert_eq!(cache.get(&"k".to_string()).await, None);
        assert!(cache.entry_revisions(&"k".to_string()).await.is_empty());
    }

    #[tokio::test]
    async fn load_without_lru_flag_is_reachable_only_while_externally_held() {
        let cache = build_cache::<String>(None);
        cache
            .load(vec![(
                "k".to_string(),
                serde_json::json!(1),
                EntryState::new(crate::entity::Retention::new(false, 60_000), None),
            )])
            .await
            .unwrap();
        // Nothing retains the entity strongly once load() finishes, so it
        // evaporates immediately.
        assert_eq!(cache.get(&"k".to_string()).await, None);
    }
}
