//! Per-key append-only revision sequences (`spec.md` §4.2).
//!
//! Revision numbers are assigned by the caller (a live or committing
//! transaction); this log does not validate monotonicity itself, but every
//! caller in this crate preserves it (see `transaction.rs`'s commit loop).

use crate::entity::EntityRevision;
use std::collections::HashMap;
use std::hash::Hash;

pub struct RevisionLog<K> {
    log: HashMap<K, Vec<EntityRevision>>,
}

impl<K: Clone + Eq + Hash> RevisionLog<K> {
    pub fn new() -> Self {
        Self { log: HashMap::new() }
    }

    pub fn append(&mut self, key: K, revision: EntityRevision) {
        self.log.entry(key).or_default().push(revision);
    }

    pub fn append_many(&mut self, key: K, revisions: Vec<EntityRevision>) {
        if revisions.is_empty() {
            return;
        }
        self.log.entry(key).or_default().extend(revisions);
    }

    pub fn iter(&self, key: &K) -> impl Iterator<Item = &EntityRevision> {
        self.log.get(key).into_iter().flatten()
    }

    pub fn clear(&mut self, key: &K) {
        self.log.remove(key);
    }

    pub fn clear_all(&mut self) {
        self.log.clear();
    }

    pub fn last_revision_number(&self, key: &K) -> Option<u64> {
        self.log.get(key).and_then(|v| v.last()).map(|r| r.revision)
    }
}

impl<K: Clone + Eq + Hash> Default for RevisionLog<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_iterate_in_insertion_order() {
        let mut log = RevisionLog::new();
        log.append("k", EntityRevision::new(serde_json::json!({"v": 1}), 1));
        log.append("k", EntityRevision::new(serde_json::json!({"v": 2}), 2));

        let revisions: Vec<u64> = log.iter(&"k").map(|r| r.revision).collect();
        assert_eq!(revisions, vec![1, 2]);
    }

    #[test]
    fn clear_removes_the_sequence() {
        let mut log = RevisionLog::new();
        log.append("k", EntityRevision::new(serde_json::json!(1), 1));
        log.clear(&"k");
        assert_eq!(log.iter(&"k").count(), 0);
    }

    #[test]
    fn last_revision_number_tracks_the_tail() {
        let mut log = RevisionLog::new();
        assert_eq!(log.last_revision_number(&"k"), None);
        log.append("k", EntityRevision::new(serde_json::json!(1), 1));
        log.append("k", EntityRevision::new(serde_json::json!(2), 2));
        assert_eq!(log.last_revision_number(&"k"), Some(2));
    }
}
