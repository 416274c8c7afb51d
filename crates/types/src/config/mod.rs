// Path: crates/types/src/config/mod.rs

//! Configuration structures for storage units and their collaborators.

use serde::{Deserialize, Serialize};

/// Selects the in-memory cache implementation fronting a storage unit.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
pub enum CacheType {
    /// Least-recently-used eviction.
    Lru,
    /// First-in-first-out eviction.
    Fifo,
}

/// Configuration for the in-memory cache of a storage unit.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Which cache implementation to construct.
    pub cache_type: CacheType,
    /// Maximum number of cached entries.
    pub capacity: usize,
    /// Shard count hint, passed through to sharded implementations.
    pub shards: u32,
}

/// Configuration for the optional approximate-membership filter.
///
/// A zero `size_bits` disables the filter; the storage unit then consults
/// its databases directly on every cache miss.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct BloomFilterConfig {
    /// Total number of bits in the filter; 0 disables it.
    pub size_bits: u64,
    /// Number of hash functions applied per key.
    pub hash_funcs: u32,
}

/// Selects the persister backend created by the database factory.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
pub enum DbType {
    /// Single-file `redb` database per epoch directory.
    Redb,
    /// Volatile in-memory database, reopenable by path. Intended for tests.
    Memory,
}

/// Configuration for the database factory.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct DbConfig {
    /// Which persister backend to construct.
    pub db_type: DbType,
}
