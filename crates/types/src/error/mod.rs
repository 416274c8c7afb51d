// Path: crates/types/src/error/mod.rs

//! Error types for the storage layer.

use thiserror::Error;

/// Errors produced by storage units and their collaborators.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A configuration bundle failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Construction was handed no epoch-start notifier.
    #[error("nil epoch start notifier")]
    NilEpochStartNotifier,
    /// Construction was handed no persister factory.
    #[error("nil persister factory")]
    NilPersisterFactory,
    /// A point lookup exhausted every tier of the storage unit.
    #[error("key {key} not found in {identifier}")]
    KeyNotFound {
        /// Diagnostic label of the storage unit that was searched.
        identifier: String,
        /// The missing key, base64-encoded.
        key: String,
    },
    /// A persister-level miss for a single database.
    #[error("not found")]
    NotFound,
    /// An operation was attempted on a closed persister handle.
    #[error("operation on a closed persister")]
    Closed,
    /// A generic error originating from the underlying database engine.
    #[error("backend error: {0}")]
    Backend(String),
    /// A filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The epoch expected at the destruction horizon was not tracked.
    #[error("persister to destroy not found")]
    PersisterToDestroyMissing,
    /// Teardown destroyed fewer persisters than expected.
    #[error("failed destroying storage unit")]
    DestroyingUnit,
}
