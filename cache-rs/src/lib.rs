//! `cache-rs` is a transactional in-memory cache with revision tracking.
//!
//! Entities live behind weak references in the primary store (`primary_store`)
//! so a value disappears once nothing — neither the bounded LRU tier
//! (`lru`) nor an external holder — keeps it reachable. Reads and writes
//! against the live data happen through snapshot-isolated transactions
//! (`transaction`): a transaction's `get`/`set`/`delete` only ever touch its
//! own overlay, and `commit` is the one place that reaches back into shared
//! state, merging against whatever is current there (not the transaction's
//! snapshot) via a pluggable strategy (`merge`). Every committed value is
//! also appended to a per-key revision history (`revision_log`). [Author fengyang]
//!
//! ## Getting started
//!
//! ```rust
//! use cache_rs::{build_cache, CacheOptions};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = build_cache::<String>(None);
//!
//! let mut txn = cache.begin_transaction().await;
//! txn.set("user:1".to_string(), serde_json::json!({"name": "ada"}));
//! txn.commit().await.unwrap();
//!
//! assert_eq!(
//!     cache.get(&"user:1".to_string()).await,
//!     Some(serde_json::json!({"name": "ada"})),
//! );
//! # }
//! ```

pub mod cache;
pub mod committing_transaction;
pub mod entity;
pub mod error;
pub mod lru;
pub mod merge;
pub mod options;
pub mod primary_store;
pub mod revision_log;
pub mod transaction;

pub use cache::{build_cache, Cache};
pub use entity::{from_entity, to_entity, Entity, EntityRevision, EntryState, Retention};
pub use error::{CResult, Error};
pub use merge::{deep_merge, DeepMerge, EntityMergeStrategy, RetainAll, RevisionMergeStrategy, TransactionView};
pub use options::{CacheHooks, CacheOptions, CommitHook, ExpirationOptions};
pub use transaction::LiveTransaction;
