// Path: crates/storage/src/redb_persister.rs

//! redb-backed persister: one single-file database per epoch directory.

use epochdb_api::storage::{Persister, PersisterFactory};
use epochdb_types::error::StorageError;
use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const KV: TableDefinition<&[u8], &[u8]> = TableDefinition::new("KV");
const DB_FILE_NAME: &str = "kv.redb";

fn backend(err: impl Display) -> StorageError {
    StorageError::Backend(err.to_string())
}

/// Persister over a single-file `redb` database inside its own directory.
///
/// `close` drops the handle and releases the file lock, leaving the files in
/// place; a later [`RedbPersister::open`] on the same path reopens them.
pub struct RedbPersister {
    dir: PathBuf,
    db: Mutex<Option<Database>>,
}

impl RedbPersister {
    /// Opens (or creates) the database rooted at `path`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let dir = PathBuf::from(path);
        fs::create_dir_all(&dir)?;
        let db = Database::create(dir.join(DB_FILE_NAME)).map_err(backend)?;
        Ok(Self {
            dir,
            db: Mutex::new(Some(db)),
        })
    }

    fn with_db<T>(
        &self,
        op: impl FnOnce(&Database) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let guard = self.db.lock();
        let db = guard.as_ref().ok_or(StorageError::Closed)?;
        op(db)
    }
}

impl Persister for RedbPersister {
    fn init(&self) -> Result<(), StorageError> {
        // Ensure the table exists so later reads do not race table creation.
        self.with_db(|db| {
            let txn = db.begin_write().map_err(backend)?;
            {
                txn.open_table(KV).map_err(backend)?;
            }
            txn.commit().map_err(backend)
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.with_db(|db| {
            let txn = db.begin_write().map_err(backend)?;
            {
                let mut table = txn.open_table(KV).map_err(backend)?;
                table.insert(key, value).map_err(backend)?;
            }
            txn.commit().map_err(backend)
        })
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        self.with_db(|db| {
            let txn = db.begin_read().map_err(backend)?;
            let table = txn.open_table(KV).map_err(backend)?;
            table
                .get(key)
                .map_err(backend)?
                .map(|guard| guard.value().to_vec())
                .ok_or(StorageError::NotFound)
        })
    }

    fn has(&self, key: &[u8]) -> Result<(), StorageError> {
        self.get(key).map(|_| ())
    }

    fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        self.with_db(|db| {
            let txn = db.begin_write().map_err(backend)?;
            let removed = {
                let mut table = txn.open_table(KV).map_err(backend)?;
                let existed = table.remove(key).map_err(backend)?.is_some();
                existed
            };
            txn.commit().map_err(backend)?;
            if removed {
                Ok(())
            } else {
                Err(StorageError::NotFound)
            }
        })
    }

    fn close(&self) -> Result<(), StorageError> {
        self.db.lock().take();
        Ok(())
    }

    fn destroy(&self) -> Result<(), StorageError> {
        self.db.lock().take();
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    fn destroy_closed(&self) -> Result<(), StorageError> {
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }
}

/// Factory creating [`RedbPersister`] instances. Creation on an existing
/// directory reopens the database found there.
#[derive(Default)]
pub struct RedbPersisterFactory;

impl PersisterFactory for RedbPersisterFactory {
    fn create(&self, path: &str) -> Result<Arc<dyn Persister>, StorageError> {
        Ok(Arc::new(RedbPersister::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Epoch_0").to_string_lossy().into_owned();
        let db = RedbPersister::open(&path).expect("open succeeds");
        db.init().expect("init succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        assert_eq!(db.get(b"k").expect("present"), b"v".to_vec());
        assert!(db.has(b"k").is_ok());
        db.remove(b"k").expect("remove succeeds");
        assert!(matches!(db.get(b"k"), Err(StorageError::NotFound)));
    }

    #[test]
    fn close_releases_the_handle_and_reopen_sees_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Epoch_0").to_string_lossy().into_owned();
        let db = RedbPersister::open(&path).expect("open succeeds");
        db.init().expect("init succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        db.close().expect("close succeeds");
        assert!(matches!(db.get(b"k"), Err(StorageError::Closed)));

        let reopened = RedbPersister::open(&path).expect("reopen succeeds");
        assert_eq!(reopened.get(b"k").expect("present"), b"v".to_vec());
    }

    #[test]
    fn destroy_removes_the_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Epoch_2").to_string_lossy().into_owned();
        let db = RedbPersister::open(&path).expect("open succeeds");
        db.init().expect("init succeeds");
        db.put(b"k", b"v").expect("put succeeds");
        db.destroy().expect("destroy succeeds");
        assert!(!std::path::Path::new(&path).exists());
    }
}
