// Path: crates/storage/src/notifier.rs

//! Epoch-start event distribution.

use epochdb_api::storage::{Epoch, EpochStartHandler, EpochStartHeader, EpochStartNotifier};
use parking_lot::Mutex;
use std::sync::Arc;

/// Minimal epoch-start payload for sources that only track the epoch number.
pub struct EpochStartEvent {
    epoch: Epoch,
}

impl EpochStartEvent {
    /// Wraps an epoch number as an epoch-start header.
    pub fn new(epoch: Epoch) -> Self {
        Self { epoch }
    }
}

impl EpochStartHeader for EpochStartEvent {
    fn epoch(&self) -> Epoch {
        self.epoch
    }
}

/// Fan-out notifier invoking every registered handler on the publishing
/// thread. Handlers are cloned out before invocation, so a handler may
/// register further handlers without deadlocking.
#[derive(Default)]
pub struct EpochStartBroadcaster {
    handlers: Mutex<Vec<Arc<dyn EpochStartHandler>>>,
}

impl EpochStartBroadcaster {
    /// Creates a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an epoch-start event to every registered handler.
    pub fn notify_epoch_start(&self, header: &dyn EpochStartHeader) {
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            handler.on_epoch_start(header);
        }
    }
}

impl EpochStartNotifier for EpochStartBroadcaster {
    fn register_handler(&self, handler: Arc<dyn EpochStartHandler>) {
        self.handlers.lock().push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Recorder {
        last_epoch: AtomicU32,
        calls: AtomicU32,
    }

    impl EpochStartHandler for Recorder {
        fn on_epoch_start(&self, header: &dyn EpochStartHeader) {
            self.last_epoch.store(header.epoch(), Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn registered_handlers_receive_events() {
        let notifier = EpochStartBroadcaster::new();
        let recorder = Arc::new(Recorder {
            last_epoch: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        });
        notifier.register_handler(recorder.clone());

        notifier.notify_epoch_start(&EpochStartEvent::new(7));
        notifier.notify_epoch_start(&EpochStartEvent::new(8));

        assert_eq!(recorder.last_epoch.load(Ordering::SeqCst), 8);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 2);
    }
}
