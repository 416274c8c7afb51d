// Path: crates/storage/src/memdb.rs

//! In-memory persister with path-addressed reopening semantics.
//!
//! The factory keeps one map per path, so a database survives `close` and can
//! be reopened by creating a new persister at the same path — the lifecycle
//! contract the pruning storer relies on, without touching the filesystem.

use epochdb_api::storage::{Persister, PersisterFactory};
use epochdb_types::error::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type SharedMap = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;
type Registry = Arc<Mutex<HashMap<String, SharedMap>>>;

/// Factory handing out [`MemDb`] persisters backed by a shared registry.
#[derive(Default)]
pub struct MemDbFactory {
    registry: Registry,
}

impl MemDbFactory {
    /// Creates a factory with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the registry still holds a database for `path`.
    pub fn holds(&self, path: &str) -> bool {
        self.registry.lock().contains_key(path)
    }
}

impl PersisterFactory for MemDbFactory {
    fn create(&self, path: &str) -> Result<Arc<dyn Persister>, StorageError> {
        let entries = self
            .registry
            .lock()
            .entry(path.to_string())
            .or_default()
            .clone();
        Ok(Arc::new(MemDb {
            path: path.to_string(),
            registry: Arc::clone(&self.registry),
            entries,
            open: AtomicBool::new(true),
        }))
    }
}

/// A volatile persister over a path-registered hash map.
pub struct MemDb {
    path: String,
    registry: Registry,
    entries: SharedMap,
    open: AtomicBool,
}

impl MemDb {
    fn guard_open(&self) -> Result<(), StorageError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }
}

impl Persister for MemDb {
    fn init(&self) -> Result<(), StorageError> {
        self.guard_open()
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.guard_open()?;
        self.entries.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        self.guard_open()?;
        self.entries
            .lock()
            .get(key)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn has(&self, key: &[u8]) -> Result<(), StorageError> {
        self.guard_open()?;
        if self.entries.lock().contains_key(key) {
            Ok(())
        } else {
            Err(StorageError::NotFound)
        }
    }

    fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        self.guard_open()?;
        self.entries
            .lock()
            .remove(key)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    fn close(&self) -> Result<(), StorageError> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn destroy(&self) -> Result<(), StorageError> {
        self.open.store(false, Ordering::Release);
        self.registry.lock().remove(&self.path);
        Ok(())
    }

    fn destroy_closed(&self) -> Result<(), StorageError> {
        self.registry.lock().remove(&self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_has_remove_roundtrip() {
        let factory = MemDbFactory::new();
        let db = factory.create("unit/Epoch_0").expect("create succeeds");
        db.init().expect("init succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        assert_eq!(db.get(b"k").expect("present"), b"v".to_vec());
        assert!(db.has(b"k").is_ok());
        db.remove(b"k").expect("remove succeeds");
        assert!(matches!(db.get(b"k"), Err(StorageError::NotFound)));
        assert!(matches!(db.remove(b"k"), Err(StorageError::NotFound)));
    }

    #[test]
    fn closed_handle_rejects_operations() {
        let factory = MemDbFactory::new();
        let db = factory.create("unit/Epoch_0").expect("create succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        db.close().expect("close succeeds");
        assert!(matches!(db.get(b"k"), Err(StorageError::Closed)));
        assert!(matches!(db.put(b"k", b"v"), Err(StorageError::Closed)));
    }

    #[test]
    fn reopening_by_path_sees_previous_writes() {
        let factory = MemDbFactory::new();
        let db = factory.create("unit/Epoch_3").expect("create succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        db.close().expect("close succeeds");

        let reopened = factory.create("unit/Epoch_3").expect("reopen succeeds");
        assert_eq!(reopened.get(b"k").expect("present"), b"v".to_vec());
    }

    #[test]
    fn destroy_drops_the_registry_entry() {
        let factory = MemDbFactory::new();
        let db = factory.create("unit/Epoch_1").expect("create succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        db.close().expect("close succeeds");
        db.destroy_closed().expect("destroy succeeds");
        assert!(!factory.holds("unit/Epoch_1"));

        // A later create starts from an empty database.
        let fresh = factory.create("unit/Epoch_1").expect("create succeeds");
        assert!(matches!(fresh.get(b"k"), Err(StorageError::NotFound)));
    }
}
