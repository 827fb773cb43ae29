//! Pluggable merge strategies (`spec.md` §4.7).
//!
//! Two strategies are involved in every commit: the entity-merge strategy
//! resolves a locally-written entity against whatever the primary store
//! holds for that key *now* (which may have moved since the transaction's
//! snapshot), and the revision-merge strategy decides which revisions from
//! that resolution make it into the installed revision log.

use crate::committing_transaction::CommittingTransaction;
use crate::entity::{Entity, EntityRevision};
use crate::error::CResult;
use std::hash::Hash;

/// Read-only view a hook gets of the surrounding transaction. Deliberately
/// narrow — just enough to look up another key's current transactional
/// value — rather than the full `LiveTransaction`, since a trait object
/// can't depend on the generic transaction type that in turn holds it.
pub trait TransactionView<K> {
    fn get(&self, key: &K) -> Option<Entity>;
}

/// Resolves an incoming entity against the current one. The default is
/// [`DeepMerge`].
pub trait EntityMergeStrategy<K>: Send + Sync {
    fn merge(
        &self,
        key: &K,
        incoming: &EntityRevision,
        current: &Entity,
        ctx: &dyn TransactionView<K>,
    ) -> CResult<Entity>;
}

/// Decides which local revisions for a key are installed. The default is
/// [`RetainAll`].
pub trait RevisionMergeStrategy<K>: Send + Sync {
    fn merge(
        &self,
        key: &K,
        local_revisions: &[EntityRevision],
        committing: &mut CommittingTransaction<K>,
    ) -> CResult<()>
    where
        K: Clone + Eq + Hash;
}

/// Recursively merges object-shaped values field by field. Non-object
/// values (primitives, arrays) replace wholesale; arrays are never
/// element-wise merged.
pub struct DeepMerge;

impl<K> EntityMergeStrategy<K> for DeepMerge {
    fn merge(
        &self,
        _key: &K,
        incoming: &EntityRevision,
        current: &Entity,
        _ctx: &dyn TransactionView<K>,
    ) -> CResult<Entity> {
        Ok(deep_merge(current, &incoming.entity))
    }
}

/// The deep-merge algorithm itself, exposed standalone since callers (and
/// the idempotence test in `spec.md` §8.6) reason about it independent of
/// the strategy trait.
pub fn deep_merge(target: &Entity, source: &Entity) -> Entity {
    match (target, source) {
        (Entity::Object(t), Entity::Object(s)) => {
            let mut result = t.clone();
            for (key, source_value) in s {
                match result.get(key) {
                    Some(target_value) if target_value != source_value => {
                        let merged = deep_merge(target_value, source_value);
                        result.insert(key.clone(), merged);
                    }
                    Some(_) => {}
                    None => {
                        result.insert(key.clone(), source_value.clone());
                    }
                }
            }
            Entity::Object(result)
        }
        _ => source.clone(),
    }
}

/// Appends every local revision of the key into the committing
/// transaction's merged-revisions for that key.
pub struct RetainAll;

impl<K> RevisionMergeStrategy<K> for RetainAll {
    fn merge(
        &self,
        key: &K,
        local_revisions: &[EntityRevision],
        committing: &mut CommittingTransaction<K>,
    ) -> CResult<()>
    where
        K: Clone + Eq + Hash,
    {
        committing.append_revisions(key.clone(), local_revisions.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_disjoint_fields() {
        let target = serde_json::json!({"name": "a", "age": 30});
        let source = serde_json::json!({"age": 31});
        assert_eq!(deep_merge(&target, &source), serde_json::json!({"name": "a", "age": 31}));
    }

    #[test]
    fn recurses_into_nested_objects() {
        let target = serde_json::json!({"profile": {"name": "a", "city": "nyc"}});
        let source = serde_json::json!({"profile": {"city": "sf"}});
        assert_eq!(
            deep_merge(&target, &source),
            serde_json::json!({"profile": {"name": "a", "city": "sf"}})
        );
    }

    #[test]
    fn arrays_replace_wholesale() {
        let target = serde_json::json!({"tags": [1, 2, 3]});
        let source = serde_json::json!({"tags": [4]});
        assert_eq!(deep_merge(&target, &source), serde_json::json!({"tags": [4]}));
    }

    #[test]
    fn idempotent_on_equal_values() {
        let x = serde_json::json!({"a": 1, "b": {"c": 2}});
        assert_eq!(deep_merge(&x, &x), x);
    }

    #[test]
    fn non_object_source_replaces_target() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!(42);
        assert_eq!(deep_merge(&target, &source), serde_json::json!(42));
    }
}
