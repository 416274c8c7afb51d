// Path: crates/storage/src/factory.rs

//! Config-driven persister factory.

use crate::memdb::MemDbFactory;
use crate::redb_persister::RedbPersister;
use epochdb_api::storage::{Persister, PersisterFactory};
use epochdb_types::config::{DbConfig, DbType};
use epochdb_types::error::StorageError;
use std::sync::Arc;

/// Creates persisters of the backend selected by [`DbConfig`].
pub struct DbFactory {
    db_type: DbType,
    // Memory databases need a shared registry so closed ones stay reopenable.
    mem: MemDbFactory,
}

impl DbFactory {
    /// Builds a factory for the configured backend.
    pub fn new(config: DbConfig) -> Self {
        Self {
            db_type: config.db_type,
            mem: MemDbFactory::new(),
        }
    }
}

impl PersisterFactory for DbFactory {
    fn create(&self, path: &str) -> Result<Arc<dyn Persister>, StorageError> {
        match self.db_type {
            DbType::Redb => Ok(Arc::new(RedbPersister::open(path)?)),
            DbType::Memory => self.mem.create(path),
        }
    }
}
