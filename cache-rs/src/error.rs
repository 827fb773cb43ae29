//! Error kinds surfaced by the cache's public operations.
//!
//! The cache never swallows an error: every kind below propagates to the
//! caller of the public operation that triggered it. Invariant violations
//! are fatal to the enclosing operation but do not poison the cache itself.

use std::fmt;

/// Result alias used throughout the crate.
pub type CResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// `save`/`load`/commit encountered a value that cannot be deeply
    /// copied (the serialize step to `serde_json::Value` failed).
    NotStructuredCloneable(String),

    /// An entity-merge strategy returned nothing.
    MergeProducedUndefined(String),

    /// Commit lost the race against its timeout; no changes were installed.
    CommitTimeout,

    /// During iteration, a weak entry that should be present could not be
    /// resolved.
    PrimaryStoreInvariantViolation(String),

    /// Commit was attempted for a key with no tracked `EntryState` where one
    /// was required.
    RevisionStateMissing(String),

    /// Catch-all for conditions that should be unreachable in practice
    /// (e.g. a poisoned mutex).
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotStructuredCloneable(msg) => {
                write!(f, "value is not structured-cloneable: {msg}")
            }
            Error::MergeProducedUndefined(key) => {
                write!(f, "entity-merge strategy produced no value for key {key}")
            }
            Error::CommitTimeout => write!(f, "commit timed out before install"),
            Error::PrimaryStoreInvariantViolation(msg) => {
                write!(f, "primary store invariant violation: {msg}")
            }
            Error::RevisionStateMissing(key) => {
                write!(f, "no tracked entry state for key {key}")
            }
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::NotStructuredCloneable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Error::CommitTimeout.to_string(), "commit timed out before install");
        assert!(Error::Internal("boom".into()).to_string().contains("boom"));
    }
}
