//! Single-slot deferred debounce task.
//!
//! At most one check is pending per scheduler. Arming while a check is
//! pending is a no-op, so a burst of bounces collapses into one deferred
//! check per window. The check runs on the tokio runtime the scheduler was
//! bound to, never on the thread that delivered the interrupt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{CounterError, CounterResult};

/// Deferred-execution slot for one counter instance.
pub struct DebounceScheduler {
    runtime: Handle,
    pending: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceScheduler {
    /// Binds a scheduler to the runtime of the calling context.
    pub fn new() -> CounterResult<Self> {
        let runtime = Handle::try_current().map_err(|e| CounterError::SchedulerUnavailable {
            message: e.to_string(),
        })?;
        Ok(Self::with_handle(runtime))
    }

    /// Binds a scheduler to an explicit runtime.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Returns true while a check is scheduled and has not started.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Schedules `callback` to run once after `delay`.
    ///
    /// Returns false, dropping `callback`, if a check is already pending.
    /// May be called from any thread.
    pub fn arm<F>(&self, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut task = self.task.lock();
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let pending = self.pending.clone();
        *task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // No longer pending once the check starts running
            pending.store(false, Ordering::Release);
            callback();
        }));
        debug!("Debounce check armed for {:?}", delay);
        true
    }

    /// Cancels the pending check, if any. Idempotent.
    ///
    /// Returns true if a pending check was cancelled. A check that has
    /// already started runs to completion.
    pub fn cancel(&self) -> bool {
        let mut task = self.task.lock();
        let was_pending = self.pending.swap(false, Ordering::AcqRel);
        if let Some(handle) = task.take() {
            if was_pending {
                handle.abort();
            }
        }
        if was_pending {
            debug!("Pending debounce check cancelled");
        }
        was_pending
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
