// Path: crates/api/src/storage/mod.rs

//! API for an epoch-partitioned, cached, probabilistically-filtered
//! key–value storage unit.

use epochdb_types::error::StorageError;
use std::sync::Arc;

/// A type alias for an epoch identifier, published at each epoch start.
pub type Epoch = u32;

/// A single on-disk key–value database bound to one epoch directory.
///
/// Handles move through three states: open, closed (files retained,
/// reopenable by path), and destroyed. `close` must release OS-level locks
/// promptly so a closed database stays reopenable through its factory.
pub trait Persister: Send + Sync {
    /// Prepares the database for use. Called once after creation.
    fn init(&self) -> Result<(), StorageError>;
    /// Stores a key–value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
    /// Returns the value for a key, or [`StorageError::NotFound`].
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError>;
    /// Succeeds iff the key is present.
    fn has(&self, key: &[u8]) -> Result<(), StorageError>;
    /// Deletes a key, or returns [`StorageError::NotFound`] if absent.
    fn remove(&self, key: &[u8]) -> Result<(), StorageError>;
    /// Closes the handle. The files and path remain valid.
    fn close(&self) -> Result<(), StorageError>;
    /// Destroys an open database together with its files.
    fn destroy(&self) -> Result<(), StorageError>;
    /// Destroys a previously closed database by its path.
    fn destroy_closed(&self) -> Result<(), StorageError>;
}

/// Constructs persisters bound to filesystem paths.
///
/// Creation is idempotent with respect to existing directories: creating a
/// persister at the path of a closed database reopens that database.
pub trait PersisterFactory: Send + Sync {
    /// Creates a fresh persister rooted at `path`.
    fn create(&self, path: &str) -> Result<Arc<dyn Persister>, StorageError>;
}

/// A bounded in-memory key–value cache. Eviction policy is opaque to
/// callers; implementations synchronize internally.
pub trait Cacher: Send + Sync {
    /// Inserts a pair, evicting per the implementation's policy.
    fn put(&self, key: &[u8], value: &[u8]);
    /// Returns the cached value for a key, if present.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    /// Reports whether the key is cached, without promoting it.
    fn has(&self, key: &[u8]) -> bool;
    /// Drops a key from the cache.
    fn remove(&self, key: &[u8]);
    /// Drops every cached entry.
    fn clear(&self);
}

/// An approximate-membership filter. False positives are allowed; false
/// negatives are forbidden. Supports insertion only.
pub trait MembershipFilter: Send + Sync {
    /// Records a key in the filter.
    fn add(&self, key: &[u8]);
    /// Returns false only if the key was never added.
    fn may_contain(&self, key: &[u8]) -> bool;
    /// Resets the filter to empty.
    fn clear(&self);
}

/// Header-like payload carried by an epoch-start event.
pub trait EpochStartHeader {
    /// The epoch that has just started.
    fn epoch(&self) -> Epoch;
}

/// A subscriber invoked on each epoch start, on the notifier's thread.
pub trait EpochStartHandler: Send + Sync {
    /// Called once per published epoch-start event.
    fn on_epoch_start(&self, header: &dyn EpochStartHeader);
}

/// The subscription surface of the epoch-start event source.
pub trait EpochStartNotifier: Send + Sync {
    /// Registers a handler to be invoked on every epoch start.
    fn register_handler(&self, handler: Arc<dyn EpochStartHandler>);
}

/// A flat byte-key → byte-value storage unit with epoch-targeted lookups.
///
/// All operations are atomic with respect to each other; implementations
/// serve an unbounded number of concurrent callers.
pub trait Storer: Send + Sync {
    /// Writes a pair into the cache and the current epoch's database.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
    /// Point lookup across the cache and the active databases.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError>;
    /// Point lookup targeted at the database of a single epoch, reopening
    /// a closed database transiently when required.
    fn get_from_epoch(&self, key: &[u8], epoch: Epoch) -> Result<Vec<u8>, StorageError>;
    /// Existence check across the cache and the active databases.
    fn has(&self, key: &[u8]) -> Result<(), StorageError>;
    /// Existence check targeted at the database of a single epoch.
    fn has_in_epoch(&self, key: &[u8], epoch: Epoch) -> Result<(), StorageError>;
    /// Deletes a key from the cache and the first active database holding it.
    fn remove(&self, key: &[u8]) -> Result<(), StorageError>;
    /// Empties the cache. Runs without the storer lock.
    fn clear_cache(&self);
    /// Destroys every database the unit tracks, plus cache and filter state.
    fn destroy_unit(&self) -> Result<(), StorageError>;
    /// Validity probe for trait-object handles in optional wiring positions.
    fn is_nil(&self) -> bool {
        false
    }
}
