//! The data model shared by every tier of the cache: entities, per-key
//! metadata, and revisions. See `spec.md` §3 and SPEC_FULL.md §10.

use crate::error::{CResult, Error};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An application-defined structured value. The cache treats entities as
/// opaque except for the default deep-merge strategy, which walks
/// object-shaped values field by field (see `merge.rs`).
pub type Entity = serde_json::Value;

/// Converts an arbitrary serializable value into the cache's internal
/// entity representation. Fails with `NotStructuredCloneable` if the value
/// cannot be represented as a `serde_json::Value` (non-finite floats,
/// non-string map keys, a failing custom `Serialize` impl, ...).
pub fn to_entity<T: Serialize>(value: &T) -> CResult<Entity> {
    serde_json::to_value(value)
        .map_err(|e| Error::NotStructuredCloneable(e.to_string()))
}

/// The inverse of [`to_entity`]: deserializes an entity back into a typed
/// value.
pub fn from_entity<T: DeserializeOwned>(entity: &Entity) -> CResult<T> {
    serde_json::from_value(entity.clone())
        .map_err(|e| Error::NotStructuredCloneable(e.to_string()))
}

/// Milliseconds since the Unix epoch. Kept as a plain integer (rather than
/// `chrono::DateTime`) so `EntryState` stays cheaply `Copy`-able.
pub type Timestamp = i64;

pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Declared retention for a key: whether it currently occupies an LRU slot,
/// and its advisory TTL budget. Neither field is enforced by the core —
/// `retained.lru` is honored by the cache façade when installing entries,
/// and `retained.ttl` is purely advisory (see `spec.md` §9 Open Questions).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Retention {
    pub lru: bool,
    pub ttl: i64,
}

impl Retention {
    pub fn new(lru: bool, ttl: i64) -> Self {
        Self { lru, ttl }
    }
}

/// Per-key metadata tracked alongside an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntryState {
    pub retained: Retention,
    pub last_accessed: Option<Timestamp>,
}

impl EntryState {
    pub fn new(retained: Retention, last_accessed: Option<Timestamp>) -> Self {
        Self { retained, last_accessed }
    }

    /// The `EntryState` stamped by a `get`/`set`/`merge` touching a key
    /// inside a live transaction: retained in the LRU, stamped with the
    /// configured default TTL, timestamped now.
    pub fn touched(default_ttl_ms: i64) -> Self {
        Self {
            retained: Retention::new(true, default_ttl_ms),
            last_accessed: Some(now()),
        }
    }
}

/// A single entry in a key's revision log: the entity snapshot at that
/// revision, a strictly-increasing-per-key revision number, and optional
/// opaque context the caller attached (e.g. who authored the write).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityRevision {
    pub entity: Entity,
    pub revision: u64,
    pub revision_context: Option<serde_json::Value>,
}

impl EntityRevision {
    pub fn new(entity: Entity, revision: u64) -> Self {
        Self { entity, revision, revision_context: None }
    }

    pub fn with_context(entity: Entity, revision: u64, context: serde_json::Value) -> Self {
        Self { entity, revision, revision_context: Some(context) }
    }
}
