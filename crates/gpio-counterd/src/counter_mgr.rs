//! CounterMgr - owns every attached counter of the daemon.

use std::sync::Arc;

use gpio_counter::{CounterDevice, CounterInstance, GpioController};
use tracing::{error, info, instrument, warn};

use crate::config_file::CounterEntry;
use crate::error::{DaemonError, Result};

/// Attached counters, in attach order.
pub struct CounterMgr {
    controller: Arc<dyn GpioController>,
    counters: Vec<CounterInstance>,
}

impl CounterMgr {
    /// Creates an empty manager for `controller`.
    pub fn new(controller: Arc<dyn GpioController>) -> Self {
        Self {
            controller,
            counters: Vec::new(),
        }
    }

    /// Attaches one counter.
    #[instrument(skip(self, entry), fields(counter = %entry.name))]
    pub fn attach(&mut self, entry: &CounterEntry) -> Result<()> {
        let counter = CounterInstance::attach(&entry.name, &entry.line, self.controller.clone())
            .map_err(|e| DaemonError::counter(&entry.name, e))?;
        counter.set_wakeup(entry.wakeup);
        self.counters.push(counter);
        Ok(())
    }

    /// Attaches every entry, or none: on failure the already attached
    /// counters are detached again.
    pub fn attach_all(&mut self, entries: &[CounterEntry]) -> Result<()> {
        for entry in entries {
            if let Err(e) = self.attach(entry) {
                self.detach_all();
                return Err(e);
            }
        }
        info!(
            "Attached {} counter(s) on {}",
            self.counters.len(),
            self.controller.name()
        );
        Ok(())
    }

    /// Returns the number of attached counters.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if no counter is attached.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Looks up a counter by name.
    pub fn get(&self, name: &str) -> Option<&CounterInstance> {
        self.counters.iter().find(|c| c.name() == name)
    }

    /// Returns the read/write surface of every counter.
    pub fn devices(&self) -> Vec<CounterDevice> {
        self.counters.iter().map(|c| c.device().clone()).collect()
    }

    /// Prepares every counter for host suspend.
    pub fn suspend_all(&self) -> Result<()> {
        for counter in &self.counters {
            counter
                .suspend()
                .map_err(|e| DaemonError::counter(counter.name(), e))?;
        }
        Ok(())
    }

    /// Undoes [`suspend_all`](Self::suspend_all).
    pub fn resume_all(&self) -> Result<()> {
        for counter in &self.counters {
            counter
                .resume()
                .map_err(|e| DaemonError::counter(counter.name(), e))?;
        }
        Ok(())
    }

    /// Detaches counters whose line faulted. Returns their names.
    ///
    /// Faulted counters are not re-attached.
    pub fn reap_faulted(&mut self) -> Vec<String> {
        let (faulted, healthy): (Vec<_>, Vec<_>) = self
            .counters
            .drain(..)
            .partition(|c| c.fault().is_some());
        self.counters = healthy;

        faulted
            .into_iter()
            .map(|counter| {
                if let Some(fault) = counter.fault() {
                    error!(
                        "Counter {} faulted at count {}: {}",
                        counter.name(),
                        counter.read_count(),
                        fault
                    );
                }
                let name = counter.name().to_string();
                counter.detach();
                name
            })
            .collect()
    }

    /// Detaches every counter, most recently attached first.
    pub fn detach_all(&mut self) {
        while let Some(counter) = self.counters.pop() {
            counter.detach();
        }
    }
}

impl Drop for CounterMgr {
    fn drop(&mut self) {
        if !self.counters.is_empty() {
            warn!("CounterMgr dropped with {} attached counter(s)", self.counters.len());
            self.detach_all();
        }
    }
}
