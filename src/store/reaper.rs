//! Active expiration
//!
//! A background thread that periodically drains due records from the
//! expiry index. Each batch runs under the engine lock; the lock is
//! released between batches so a burst of expirations cannot starve
//! client connections.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::Keyspace;

/// Handle to the reaper thread. Dropping it stops and joins the thread.
pub struct Reaper {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Spawn the reaper over a shared keyspace
    pub fn spawn(
        keyspace: Arc<Mutex<Keyspace>>,
        interval: Duration,
        batch_limit: usize,
    ) -> std::io::Result<Self> {
        let (tx, rx) = channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("zestkv-reaper".into())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = sweep(&keyspace, batch_limit);
                        if removed > 0 {
                            tracing::debug!("Reaper removed {} expired keys", removed);
                        }
                    }
                    // shutdown requested or handle dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Reaper thread panicked");
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run one sweep: reap batches until a batch comes back short.
///
/// Returns the total number of keys removed.
pub fn sweep(keyspace: &Mutex<Keyspace>, batch_limit: usize) -> usize {
    let mut total = 0;
    loop {
        let removed = keyspace.lock().reap(Instant::now(), batch_limit);
        total += removed;
        if removed < batch_limit {
            return total;
        }
    }
}
