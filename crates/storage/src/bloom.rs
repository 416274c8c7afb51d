// Path: crates/storage/src/bloom.rs

//! Approximate-membership filter used to short-circuit disk lookups on the
//! common miss.

use ahash::RandomState;
use epochdb_api::storage::MembershipFilter;
use epochdb_types::config::BloomFilterConfig;
use epochdb_types::error::StorageError;
use parking_lot::RwLock;
use std::hash::BuildHasher;

// Fixed seeds keep both hash streams stable across `clear`.
const SEEDS_A: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);
const SEEDS_B: (u64, u64, u64, u64) = (
    0x4528_21e6_38d0_1377,
    0xbe54_66cf_34e9_0c6c,
    0xc0ac_29b7_c97c_50dd,
    0x3f84_d5b5_b547_0917,
);

/// Bloom filter over a fixed-size bit vector with double hashing.
///
/// False positives are possible; false negatives are not. The filter only
/// supports insertion, so deleted keys keep reporting as possibly present.
pub struct BloomFilter {
    bits: RwLock<Box<[u64]>>,
    num_bits: u64,
    hash_funcs: u32,
    hashers: [RandomState; 2],
}

impl BloomFilter {
    /// Builds a filter from its configuration. A zero bit count or a zero
    /// hash-function count is a configuration error; callers wanting no
    /// filter skip construction entirely.
    pub fn new(config: &BloomFilterConfig) -> Result<Self, StorageError> {
        if config.size_bits == 0 {
            return Err(StorageError::InvalidConfig(
                "bloom filter size must be non-zero".into(),
            ));
        }
        if config.hash_funcs == 0 {
            return Err(StorageError::InvalidConfig(
                "bloom filter needs at least one hash function".into(),
            ));
        }
        let words = config.size_bits.div_ceil(64) as usize;
        Ok(Self {
            bits: RwLock::new(vec![0u64; words].into_boxed_slice()),
            num_bits: config.size_bits,
            hash_funcs: config.hash_funcs,
            hashers: [
                RandomState::with_seeds(SEEDS_A.0, SEEDS_A.1, SEEDS_A.2, SEEDS_A.3),
                RandomState::with_seeds(SEEDS_B.0, SEEDS_B.1, SEEDS_B.2, SEEDS_B.3),
            ],
        })
    }

    fn bit_indexes(&self, key: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let h1 = self.hashers[0].hash_one(key);
        // Forcing h2 odd avoids degenerate strides on power-of-two sizes.
        let h2 = self.hashers[1].hash_one(key) | 1;
        (0..u64::from(self.hash_funcs)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits)
    }
}

impl MembershipFilter for BloomFilter {
    fn add(&self, key: &[u8]) {
        let mut bits = self.bits.write();
        for idx in self.bit_indexes(key) {
            bits[(idx / 64) as usize] |= 1 << (idx % 64);
        }
    }

    fn may_contain(&self, key: &[u8]) -> bool {
        let bits = self.bits.read();
        self.bit_indexes(key)
            .all(|idx| bits[(idx / 64) as usize] & (1 << (idx % 64)) != 0)
    }

    fn clear(&self) {
        self.bits.write().fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(bits: u64, hashes: u32) -> BloomFilter {
        BloomFilter::new(&BloomFilterConfig {
            size_bits: bits,
            hash_funcs: hashes,
        })
        .expect("valid config")
    }

    #[test]
    fn added_keys_are_always_reported() {
        let bf = filter(4096, 3);
        for i in 0..200u32 {
            bf.add(&i.to_be_bytes());
        }
        for i in 0..200u32 {
            assert!(bf.may_contain(&i.to_be_bytes()));
        }
    }

    #[test]
    fn fresh_filter_reports_nothing() {
        let bf = filter(4096, 3);
        assert!(!bf.may_contain(b"never added"));
    }

    #[test]
    fn clear_resets_membership() {
        let bf = filter(1024, 2);
        bf.add(b"alpha");
        assert!(bf.may_contain(b"alpha"));
        bf.clear();
        assert!(!bf.may_contain(b"alpha"));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(BloomFilter::new(&BloomFilterConfig {
            size_bits: 0,
            hash_funcs: 3,
        })
        .is_err());
        assert!(BloomFilter::new(&BloomFilterConfig {
            size_bits: 128,
            hash_funcs: 0,
        })
        .is_err());
    }
}
