// Path: crates/storage/src/cache.rs

//! Bounded in-memory caches fronting the storage unit.

use epochdb_api::storage::Cacher;
use epochdb_types::config::{CacheConfig, CacheType};
use epochdb_types::error::StorageError;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Constructs the cache selected by the configuration.
pub fn create(config: &CacheConfig) -> Result<Arc<dyn Cacher>, StorageError> {
    match config.cache_type {
        CacheType::Lru => Ok(Arc::new(LruCacher::new(config.capacity)?)),
        CacheType::Fifo => Ok(Arc::new(FifoCacher::new(config.capacity)?)),
    }
}

/// Least-recently-used cache over byte keys and values.
pub struct LruCacher {
    entries: Mutex<LruCache<Vec<u8>, Vec<u8>>>,
}

impl LruCacher {
    /// Builds a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, StorageError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| StorageError::InvalidConfig("cache capacity must be non-zero".into()))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }
}

impl Cacher for LruCacher {
    fn put(&self, key: &[u8], value: &[u8]) {
        self.entries.lock().put(key.to_vec(), value.to_vec());
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    fn has(&self, key: &[u8]) -> bool {
        self.entries.lock().contains(key)
    }

    fn remove(&self, key: &[u8]) {
        self.entries.lock().pop(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// First-in-first-out cache. Insertion order decides eviction; reads do not
/// refresh an entry's position.
pub struct FifoCacher {
    capacity: usize,
    inner: Mutex<FifoInner>,
}

#[derive(Default)]
struct FifoInner {
    map: HashMap<Vec<u8>, Vec<u8>>,
    // May carry keys already removed from `map`; eviction skips them.
    order: VecDeque<Vec<u8>>,
}

impl FifoCacher {
    /// Builds a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, StorageError> {
        if capacity == 0 {
            return Err(StorageError::InvalidConfig(
                "cache capacity must be non-zero".into(),
            ));
        }
        Ok(Self {
            capacity,
            inner: Mutex::new(FifoInner::default()),
        })
    }
}

impl Cacher for FifoCacher {
    fn put(&self, key: &[u8], value: &[u8]) {
        let mut inner = self.inner.lock();
        if inner.map.insert(key.to_vec(), value.to_vec()).is_none() {
            inner.order.push_back(key.to_vec());
        }
        while inner.map.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.map.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().map.get(key).cloned()
    }

    fn has(&self, key: &[u8]) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    fn remove(&self, key: &[u8]) {
        self.inner.lock().map.remove(key);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }
}
