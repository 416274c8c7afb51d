// Path: crates/storage/src/lib.rs

//! Epoch-pruned persistent storage for chain nodes.
//!
//! A [`PruningStorer`] fronts a sliding window of per-epoch databases with an
//! in-memory cache and an optional approximate-membership filter. Each epoch
//! start rotates the window: a fresh database is created for writes, the
//! database that fell out of the window is closed but stays addressable by
//! epoch, and databases past the retention horizon are destroyed.

pub mod bloom;
pub mod cache;
pub mod factory;
pub mod memdb;
pub mod notifier;
pub mod pruning;
pub mod redb_persister;

pub use factory::DbFactory;
pub use memdb::MemDbFactory;
pub use notifier::{EpochStartBroadcaster, EpochStartEvent};
pub use pruning::{PruningStorer, PruningStorerArgs};
pub use redb_persister::RedbPersister;
