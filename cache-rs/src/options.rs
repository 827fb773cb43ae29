//! Cache configuration (`spec.md` §6; SPEC_FULL.md §13).
//!
//! Shaped after `kv-cli/src/config.rs`'s `ConfigLoad`: a plain struct with
//! a `Default` impl that spells out the literal defaults, rather than a
//! builder. Unlike `ConfigLoad` this isn't loaded from a file — the cache
//! is embedded in a host program (`spec.md` §6), so `CacheOptions` is just
//! a constructor argument.

use crate::committing_transaction::CommittingTransaction;
use crate::error::CResult;
use crate::merge::{DeepMerge, EntityMergeStrategy, RetainAll, RevisionMergeStrategy, TransactionView};
use std::hash::Hash;
use std::sync::Arc;

/// Default LRU capacity (`spec.md` §6).
pub const DEFAULT_LRU_CAPACITY: usize = 10_000;
/// Default advisory TTL, in milliseconds (`spec.md` §6).
pub const DEFAULT_TTL_MS: i64 = 60_000;
/// Default commit timeout, in milliseconds (`spec.md` §4.4).
pub const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpirationOptions {
    pub lru: usize,
    pub ttl_ms: i64,
}

impl Default for ExpirationOptions {
    fn default() -> Self {
        Self { lru: DEFAULT_LRU_CAPACITY, ttl_ms: DEFAULT_TTL_MS }
    }
}

/// Invoked with the live transaction's read-only view and the committing
/// transaction's staging APIs at the end of every commit, before install —
/// the extension point for custom retention policy (`spec.md` §6, §9).
pub trait CommitHook<K>: Send + Sync {
    fn on_commit(
        &self,
        txn: &dyn TransactionView<K>,
        committing: &mut CommittingTransaction<K>,
    ) -> CResult<()>;
}

struct NoopCommitHook;

impl<K> CommitHook<K> for NoopCommitHook {
    fn on_commit(
        &self,
        _txn: &dyn TransactionView<K>,
        _committing: &mut CommittingTransaction<K>,
    ) -> CResult<()> {
        Ok(())
    }
}

pub struct CacheHooks<K> {
    pub entity_merge_strategy: Arc<dyn EntityMergeStrategy<K>>,
    pub revision_merge_strategy: Arc<dyn RevisionMergeStrategy<K>>,
    pub commit: Arc<dyn CommitHook<K>>,
}

impl<K: Clone + Eq + Hash + 'static> Default for CacheHooks<K> {
    fn default() -> Self {
        Self {
            entity_merge_strategy: Arc::new(DeepMerge),
            revision_merge_strategy: Arc::new(RetainAll),
            commit: Arc::new(NoopCommitHook),
        }
    }
}

pub struct CacheOptions<K> {
    pub expiration: ExpirationOptions,
    pub hooks: CacheHooks<K>,
    /// Commit timeout (`spec.md` §4.4): `None` disables the timeout
    /// (`timeout: false` in the source spec), `Some(ms)` races commit
    /// against that duration.
    pub commit_timeout_ms: Option<u64>,
}

impl<K: Clone + Eq + Hash + 'static> Default for CacheOptions<K> {
    fn default() -> Self {
        Self {
            expiration: ExpirationOptions::default(),
            hooks: CacheHooks::default(),
            commit_timeout_ms: Some(DEFAULT_COMMIT_TIMEOUT_MS),
        }
    }
}
