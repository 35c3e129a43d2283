//! Background value dropper for lazy free.
//!
//! Destroying a large sorted set walks every node of both indexes. That
//! work is handed to a dedicated thread so it never runs while the engine
//! lock is held. Small values are dropped inline.

use crossbeam::channel::{self, Sender, TrySendError};

use super::Value;

/// Bounded channel capacity.
const DROP_CHANNEL_CAPACITY: usize = 4096;

/// A cloneable handle for deferring expensive drops to the background thread.
///
/// When all handles are dropped the channel closes and the thread exits.
#[derive(Debug, Clone)]
pub struct DropHandle {
    tx: Sender<Value>,
    threshold: usize,
}

impl DropHandle {
    /// Spawns the drop thread. Values with more than `threshold`
    /// elements are deferred to it.
    ///
    /// If the thread cannot be spawned every value is dropped inline:
    /// the receiver is gone, so `try_send` reports a disconnect.
    pub fn spawn(threshold: usize) -> Self {
        let (tx, rx) = channel::bounded::<Value>(DROP_CHANNEL_CAPACITY);

        if let Err(e) = std::thread::Builder::new()
            .name("zestkv-drop".into())
            .spawn(move || {
                // dropping each received value frees it
                while rx.recv().is_ok() {}
            })
        {
            tracing::warn!("failed to spawn drop thread, large values will be freed inline: {e}");
        }

        Self { tx, threshold }
    }

    /// Whether a value is big enough to be worth deferring
    pub fn is_large(&self, value: &Value) -> bool {
        value.element_count() > self.threshold
    }

    /// Defer dropping `value` if it is large; never blocks.
    pub fn defer(&self, value: Value) {
        if !self.is_large(&value) {
            return;
        }
        match self.tx.try_send(value) {
            Ok(()) => {}
            // channel full: drop inline rather than stall the engine
            Err(TrySendError::Full(value)) => drop(value),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
