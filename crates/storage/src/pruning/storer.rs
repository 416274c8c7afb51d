// Path: crates/storage/src/pruning/storer.rs

//! Pruning storer: a storage unit that creates a new persister for each
//! epoch and retires the ones that fall behind the sliding window.

use crate::bloom::BloomFilter;
use crate::cache;
use crate::pruning::path::{epoch_file_path, remove_directory_if_empty};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use epochdb_api::storage::{
    Cacher, Epoch, EpochStartHandler, EpochStartHeader, EpochStartNotifier, MembershipFilter,
    Persister, PersisterFactory, Storer,
};
use epochdb_types::config::{BloomFilterConfig, CacheConfig};
use epochdb_types::error::StorageError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Construction arguments for a [`PruningStorer`].
///
/// The notifier and factory are optional so that wiring layers can pass
/// through possibly-unset handles; construction refuses absent ones.
pub struct PruningStorerArgs {
    /// Diagnostic label carried in errors and log lines.
    pub identifier: String,
    /// Path template containing the `Epoch_<digits>` placeholder.
    pub db_path: String,
    /// Cache configuration.
    pub cache_conf: CacheConfig,
    /// Filter configuration; a zero size disables the filter.
    pub bloom_filter_conf: BloomFilterConfig,
    /// Sliding-window size, at least 1.
    pub num_active_persisters: u32,
    /// Destruction horizon; must be >= `num_active_persisters`.
    pub num_epochs_to_keep: u32,
    /// Epoch the unit starts in.
    pub starting_epoch: Epoch,
    /// When set, closed persisters are retained forever.
    pub full_archive: bool,
    /// Epoch-start event source to subscribe to.
    pub notifier: Option<Arc<dyn EpochStartNotifier>>,
    /// Factory used for every persister the unit creates.
    pub persister_factory: Option<Arc<dyn PersisterFactory>>,
}

// One per-epoch database together with its path and lifecycle flag. The
// active list and the epoch map share slots, so the flag lives behind an
// atomic; it only ever transitions false -> true, under the storer lock.
struct PersisterSlot {
    persister: Arc<dyn Persister>,
    path: String,
    closed: AtomicBool,
}

impl PersisterSlot {
    fn new(persister: Arc<dyn Persister>, path: String) -> Arc<Self> {
        Arc::new(Self {
            persister,
            path,
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

struct Slots {
    // Index 0 is the newest persister and the only write target.
    active: Vec<Arc<PersisterSlot>>,
    by_epoch: HashMap<Epoch, Arc<PersisterSlot>>,
}

/// Storage unit that rotates per-epoch databases as epochs advance.
///
/// Reads consult the cache, then the optional membership filter, then the
/// active databases newest-first. Databases that leave the active window are
/// closed but stay addressable through [`Storer::get_from_epoch`] until they
/// fall past the retention horizon and are destroyed.
pub struct PruningStorer {
    identifier: String,
    db_path: String,
    full_archive: bool,
    num_active_persisters: u32,
    num_epochs_to_keep: u32,
    factory: Arc<dyn PersisterFactory>,
    cache: Arc<dyn Cacher>,
    filter: Option<Arc<dyn MembershipFilter>>,
    slots: RwLock<Slots>,
}

impl PruningStorer {
    /// Creates a pruning storer without a sharded directory naming scheme.
    pub fn new(args: PruningStorerArgs) -> Result<Arc<Self>, StorageError> {
        Self::init(args, None)
    }

    /// Creates a pruning storer whose base path carries the shard id.
    pub fn new_sharded(args: PruningStorerArgs, shard_id: u32) -> Result<Arc<Self>, StorageError> {
        Self::init(args, Some(shard_id))
    }

    fn init(args: PruningStorerArgs, shard_id: Option<u32>) -> Result<Arc<Self>, StorageError> {
        if args.num_active_persisters < 1 {
            return Err(StorageError::InvalidConfig(
                "number of active persisters must be at least 1".into(),
            ));
        }
        let notifier = args.notifier.ok_or(StorageError::NilEpochStartNotifier)?;
        let factory = args
            .persister_factory
            .ok_or(StorageError::NilPersisterFactory)?;

        let cache = cache::create(&args.cache_conf)?;

        let mut base_path = args.db_path;
        if let Some(shard) = shard_id {
            base_path.push_str(&shard.to_string());
        }

        let persister = factory.create(&base_path)?;
        // From here on, any failure must tear down the partially-created
        // database before surfacing.
        let filter = match Self::build_filter(&args.bloom_filter_conf) {
            Ok(filter) => filter,
            Err(err) => {
                let _ = persister.destroy();
                return Err(err);
            }
        };
        if let Err(err) = persister.init() {
            let _ = persister.destroy();
            return Err(err);
        }

        let slot = PersisterSlot::new(persister, base_path.clone());
        let mut by_epoch = HashMap::new();
        by_epoch.insert(args.starting_epoch, Arc::clone(&slot));

        let storer = Arc::new(Self {
            identifier: args.identifier,
            db_path: base_path,
            full_archive: args.full_archive,
            num_active_persisters: args.num_active_persisters,
            num_epochs_to_keep: args.num_epochs_to_keep,
            factory,
            cache,
            filter,
            slots: RwLock::new(Slots {
                active: vec![slot],
                by_epoch,
            }),
        });
        notifier.register_handler(Arc::new(EpochChangeSubscriber {
            storer: Arc::downgrade(&storer),
        }));

        Ok(storer)
    }

    fn build_filter(
        config: &BloomFilterConfig,
    ) -> Result<Option<Arc<dyn MembershipFilter>>, StorageError> {
        if config.size_bits == 0 {
            return Ok(None);
        }
        Ok(Some(Arc::new(BloomFilter::new(config)?)))
    }

    /// Rotates the unit into `epoch`: creates the new write target, retires
    /// the persister that fell out of the window, and destroys the one past
    /// the retention horizon.
    pub fn change_epoch(&self, epoch: Epoch) -> Result<(), StorageError> {
        let mut slots = self.slots.write();

        let file_path = epoch_file_path(&self.db_path, epoch);
        let persister = match self.factory.create(&file_path) {
            Ok(persister) => persister,
            Err(err) => {
                log::warn!("change epoch error in {}: {err}", self.identifier);
                return Err(err);
            }
        };
        if let Err(err) = persister.init() {
            log::warn!(
                "init persister for epoch {epoch} in {}: {err}",
                self.identifier
            );
            let _ = persister.destroy();
            return Err(err);
        }

        let slot = PersisterSlot::new(persister, file_path);
        slots.active.insert(0, Arc::clone(&slot));
        slots.by_epoch.insert(epoch, slot);

        self.close_and_destroy_persisters(&mut slots, epoch)
    }

    // New persisters must already be installed: closing happens only once
    // the window has overflowed, and destruction only past the horizon, so
    // no open handle is ever destroyed here.
    fn close_and_destroy_persisters(
        &self,
        slots: &mut Slots,
        epoch: Epoch,
    ) -> Result<(), StorageError> {
        let window = self.num_active_persisters as usize;
        if slots.active.len() > window {
            let to_close = Arc::clone(&slots.active[window]);
            if let Err(err) = to_close.persister.close() {
                log::error!("error closing persister in {}: {err}", self.identifier);
                return Err(err);
            }
            to_close.mark_closed();
            slots.active.truncate(window);
        }

        if !self.full_archive && slots.by_epoch.len() > self.num_epochs_to_keep as usize {
            let epoch_to_remove = epoch.saturating_sub(self.num_epochs_to_keep);
            let slot = slots
                .by_epoch
                .remove(&epoch_to_remove)
                .ok_or(StorageError::PersisterToDestroyMissing)?;
            slot.persister.destroy_closed()?;
            remove_directory_if_empty(&slot.path);
        }

        Ok(())
    }

    fn key_not_found(&self, key: &[u8]) -> StorageError {
        StorageError::KeyNotFound {
            identifier: self.identifier.clone(),
            key: BASE64.encode(key),
        }
    }

    fn passes_filter(&self, key: &[u8]) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.may_contain(key))
    }
}

impl Storer for PruningStorer {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let slots = self.slots.write();

        self.cache.put(key, value);
        if let Err(err) = slots.active[0].persister.put(key, value) {
            // Roll the cache back so a failed write cannot serve phantoms.
            self.cache.remove(key);
            return Err(err);
        }
        if let Some(filter) = &self.filter {
            filter.add(key);
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        let slots = self.slots.write();

        if let Some(value) = self.cache.get(key) {
            return Ok(value);
        }
        if self.passes_filter(key) {
            for slot in &slots.active {
                match slot.persister.get(key) {
                    Ok(value) => {
                        self.cache.put(key, &value);
                        return Ok(value);
                    }
                    Err(_) => continue,
                }
            }
        }
        Err(self.key_not_found(key))
    }

    fn get_from_epoch(&self, key: &[u8], epoch: Epoch) -> Result<Vec<u8>, StorageError> {
        let slots = self.slots.write();

        if let Some(value) = self.cache.get(key) {
            return Ok(value);
        }
        let Some(slot) = slots.by_epoch.get(&epoch) else {
            return Err(self.key_not_found(key));
        };

        if !slot.is_closed() {
            return match slot.persister.get(key) {
                Ok(value) => Ok(value),
                Err(StorageError::NotFound) => Err(self.key_not_found(key)),
                Err(err) => Err(err),
            };
        }

        let transient = match self.factory.create(&slot.path) {
            Ok(persister) => persister,
            Err(err) => {
                log::debug!("open old persister: {err}");
                return Err(err);
            }
        };
        match transient.init() {
            Ok(()) => {
                let fetched = transient.get(key);
                if let Err(err) = transient.close() {
                    log::debug!("close transient persister: {err}");
                }
                match fetched {
                    Ok(value) => Ok(value),
                    Err(err) => {
                        log::warn!(
                            "get from closed persister in {}, epoch {epoch}: {err}",
                            self.identifier
                        );
                        Err(self.key_not_found(key))
                    }
                }
            }
            Err(err) => {
                log::debug!("init old persister: {err}");
                if let Err(close_err) = transient.close() {
                    log::debug!("close transient persister: {close_err}");
                }
                Err(err)
            }
        }
    }

    fn has(&self, key: &[u8]) -> Result<(), StorageError> {
        let slots = self.slots.read();

        if self.cache.has(key) {
            return Ok(());
        }
        if self.passes_filter(key) {
            for slot in &slots.active {
                if slot.persister.has(key).is_ok() {
                    return Ok(());
                }
            }
        }
        Err(self.key_not_found(key))
    }

    fn has_in_epoch(&self, key: &[u8], epoch: Epoch) -> Result<(), StorageError> {
        let slots = self.slots.read();

        if self.cache.has(key) {
            return Ok(());
        }
        if !self.passes_filter(key) {
            return Err(self.key_not_found(key));
        }
        let Some(slot) = slots.by_epoch.get(&epoch) else {
            return Err(self.key_not_found(key));
        };

        let checked = if !slot.is_closed() {
            slot.persister.has(key)
        } else {
            let transient = match self.factory.create(&slot.path) {
                Ok(persister) => persister,
                Err(err) => {
                    log::debug!("open old persister: {err}");
                    return Err(err);
                }
            };
            let checked = match transient.init() {
                Ok(()) => transient.has(key),
                Err(err) => {
                    log::debug!("init old persister: {err}");
                    Err(err)
                }
            };
            if let Err(err) = transient.close() {
                log::debug!("close transient persister: {err}");
            }
            checked
        };

        match checked {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(self.key_not_found(key)),
            Err(err) => Err(err),
        }
    }

    fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        let slots = self.slots.write();

        self.cache.remove(key);
        let mut outcome = Err(self.key_not_found(key));
        for slot in &slots.active {
            match slot.persister.remove(key) {
                Ok(()) => return Ok(()),
                Err(err) => outcome = Err(err),
            }
        }
        outcome
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }

    fn destroy_unit(&self) -> Result<(), StorageError> {
        let slots = self.slots.write();

        if let Some(filter) = &self.filter {
            filter.clear();
        }
        self.cache.clear();

        let expected = slots.active.len();
        let mut destroyed = 0usize;
        for slot in slots.by_epoch.values() {
            let result = if slot.is_closed() {
                slot.persister.destroy_closed()
            } else {
                slot.persister.destroy()
            };
            match result {
                Ok(()) => destroyed += 1,
                Err(err) => {
                    log::debug!("pruning db destroy in {}: {err}", self.identifier);
                }
            }
        }

        if destroyed != expected {
            log::debug!(
                "error destroying unit {}: destroyed {destroyed} of {expected}",
                self.identifier
            );
            return Err(StorageError::DestroyingUnit);
        }
        Ok(())
    }
}

// Bridges epoch-start events into the storer. Holds the unit weakly so a
// dropped storer silently unsubscribes; rotation errors stop here because
// the notifier offers no error channel.
struct EpochChangeSubscriber {
    storer: Weak<PruningStorer>,
}

impl EpochStartHandler for EpochChangeSubscriber {
    fn on_epoch_start(&self, header: &dyn EpochStartHeader) {
        let Some(storer) = self.storer.upgrade() else {
            return;
        };
        if let Err(err) = storer.change_epoch(header.epoch()) {
            log::warn!("change epoch in storer {}: {err}", storer.identifier);
        }
    }
}
