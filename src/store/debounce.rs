use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{PersistedState, StateStore, StoreError, save_snapshot};

/// Quiet period after the last change before the plan is written.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounces plan writes: each `schedule` call cancels the pending write and
/// starts a fresh quiet period.
pub struct SaveScheduler {
    store: Arc<dyn StateStore>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SaveScheduler {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self::with_delay(store, SAVE_DEBOUNCE)
    }

    pub fn with_delay(store: Arc<dyn StateStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Must be called from inside a tokio runtime.
    pub fn schedule(&self, snapshot: PersistedState) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            if !handle.is_finished() {
                debug!("superseding pending plan save");
                handle.abort();
            }
        }

        let store = Arc::clone(&self.store);
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match save_snapshot(store.as_ref(), &snapshot) {
                Ok(()) => debug!(timestamp = %snapshot.timestamp, "saved retirement plan"),
                Err(e) => warn!(error = %e, "failed to save retirement plan"),
            }
        }));
    }

    pub fn has_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Drops the pending write, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        match pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Writes `snapshot` immediately, replacing any pending write.
    pub fn flush(&self, snapshot: &PersistedState) -> Result<(), StoreError> {
        self.cancel();
        save_snapshot(self.store.as_ref(), snapshot)
    }
}
