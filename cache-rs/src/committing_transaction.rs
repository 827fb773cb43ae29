//! The staging area exposed to user hooks during commit (`spec.md` §4.5).
//!
//! A `CommittingTransaction` is never exposed to readers — it only threads
//! through the commit loop and the user's `hooks.commit` callback, and
//! accumulates the revision set that will be installed atomically at the
//! end of commit.

use crate::entity::EntityRevision;
use std::collections::HashMap;
use std::hash::Hash;

pub struct CommittingTransaction<K> {
    merged_revisions: HashMap<K, Vec<EntityRevision>>,
}

impl<K: Clone + Eq + Hash> CommittingTransaction<K> {
    pub fn new() -> Self {
        Self { merged_revisions: HashMap::new() }
    }

    /// The current set of revisions that will be installed.
    pub fn merged_revisions(&self) -> &HashMap<K, Vec<EntityRevision>> {
        &self.merged_revisions
    }

    pub fn into_merged_revisions(self) -> HashMap<K, Vec<EntityRevision>> {
        self.merged_revisions
    }

    /// Drops all staged revisions for a key.
    pub fn clear_revisions(&mut self, key: &K) {
        self.merged_revisions.remove(key);
    }

    /// Appends to the staged revisions for a key, creating the entry if
    /// absent.
    pub fn append_revisions(&mut self, key: K, revisions: Vec<EntityRevision>) {
        self.merged_revisions.entry(key).or_default().extend(revisions);
    }
}

impl<K: Clone + Eq + Hash> Default for CommittingTransaction<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRevision;

    #[test]
    fn append_then_clear() {
        let mut committing = CommittingTransaction::<String>::new();
        committing.append_revisions(
            "k".to_string(),
            vec![EntityRevision::new(serde_json::json!({"v": 1}), 1)],
        );
        assert_eq!(committing.merged_revisions().get("k").unwrap().len(), 1);

        committing.clear_revisions(&"k".to_string());
        assert!(committing.merged_revisions().get("k").is_none());
    }

    #[test]
    fn append_extends_existing() {
        let mut committing = CommittingTransaction::<String>::new();
        committing.append_revisions(
            "k".to_string(),
            vec![EntityRevision::new(serde_json::json!({"v": 1}), 1)],
        );
        committing.append_revisions(
            "k".to_string(),
            vec![EntityRevision::new(serde_json::json!({"v": 2}), 2)],
        );
        assert_eq!(committing.merged_revisions().get("k").unwrap().len(), 2);
    }
}
