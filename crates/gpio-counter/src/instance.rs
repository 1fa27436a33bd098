//! Counter instance lifecycle.
//!
//! A [`CounterInstance`] owns everything for one counted line: its config
//! copy, the line reservation, the interrupt subscription, the state
//! machine and the count. Attach acquires resources in order (line, IRQ)
//! and teardown releases them in reverse, after cancelling any pending
//! debounce check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::config::LineConfig;
use crate::device::CounterDevice;
use crate::edge::{EdgeSnapshot, EdgeStateMachine, EdgeStats};
use crate::error::{CounterError, CounterResult};
use crate::line::{GpioController, IrqGuard, IrqHandler, LineGuard};
use crate::signal::SignalReader;
use crate::store::CounterStore;

/// One attached impulse counter.
pub struct CounterInstance {
    name: String,
    config: LineConfig,
    machine: Arc<EdgeStateMachine>,
    store: Arc<CounterStore>,
    device: CounterDevice,
    wakeup: AtomicBool,
    suspended: AtomicBool,
    // Released in this order on drop
    irq: Option<IrqGuard>,
    line: Option<LineGuard>,
}

impl CounterInstance {
    /// Claims the configured line and starts counting.
    ///
    /// Must be called within a tokio runtime when debouncing is enabled.
    /// On failure nothing stays claimed.
    #[instrument(skip(config, controller), fields(line = %config.line))]
    pub fn attach(
        name: &str,
        config: &LineConfig,
        controller: Arc<dyn GpioController>,
    ) -> CounterResult<Self> {
        if name.is_empty() {
            return Err(CounterError::invalid_config("name", "must not be empty"));
        }
        config.validate()?;
        let config = config.clone();

        let line = LineGuard::request(controller.clone(), config.line, name).map_err(|e| {
            error!("Unable to request {}: {}", config.line, e);
            e
        })?;

        let store = Arc::new(CounterStore::new());
        let reader = SignalReader::new(controller.clone(), config.line, config.inverted);
        let machine = Arc::new(EdgeStateMachine::new(
            reader,
            store.clone(),
            config.debounce_delay(),
        )?);

        let irq = IrqGuard::request(controller, config.line, name, irq_handler(&machine))
            .map_err(|e| {
                error!("Unable to request IRQ for {}: {}", config.line, e);
                e
            })?;

        info!(
            "Registered counter device {} on {} (inverted={}, debounce={}ms)",
            name, config.line, config.inverted, config.debounce_ms
        );

        Ok(Self {
            name: name.to_string(),
            device: CounterDevice::new(name, store.clone()),
            config,
            machine,
            store,
            wakeup: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            irq: Some(irq),
            line: Some(line),
        })
    }

    /// Releases the line. Equivalent to dropping the instance.
    pub fn detach(self) {
        info!("Detaching counter device {}", self.name);
    }

    /// Returns the instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instance's copy of its configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Returns the current count.
    pub fn read_count(&self) -> u64 {
        self.store.read()
    }

    /// Replaces the count.
    pub fn overwrite(&self, value: u64) {
        self.store.overwrite(value);
    }

    /// Returns the read/write surface.
    pub fn device(&self) -> &CounterDevice {
        &self.device
    }

    /// Returns the state machine view.
    pub fn snapshot(&self) -> EdgeSnapshot {
        self.machine.snapshot()
    }

    /// Returns the event counters.
    pub fn stats(&self) -> EdgeStats {
        self.machine.stats()
    }

    /// Returns the hardware fault that stopped counting, if any.
    pub fn fault(&self) -> Option<CounterError> {
        self.machine.fault()
    }

    /// Allows or forbids the line to wake the host while suspended.
    pub fn set_wakeup(&self, enabled: bool) {
        self.wakeup.store(enabled, Ordering::Release);
    }

    /// Returns true if wake-on-signal is allowed.
    pub fn may_wakeup(&self) -> bool {
        self.wakeup.load(Ordering::Acquire)
    }

    /// Returns true between [`suspend`](Self::suspend) and [`resume`](Self::resume).
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Prepares for host suspend. The interrupt subscription stays in place.
    pub fn suspend(&self) -> CounterResult<()> {
        if self.may_wakeup() {
            if let Some(irq) = &self.irq {
                irq.set_wake(true)?;
            }
        }
        self.suspended.store(true, Ordering::Release);
        Ok(())
    }

    /// Undoes [`suspend`](Self::suspend).
    pub fn resume(&self) -> CounterResult<()> {
        if self.may_wakeup() {
            if let Some(irq) = &self.irq {
                irq.set_wake(false)?;
            }
        }
        self.suspended.store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for CounterInstance {
    fn drop(&mut self) {
        self.set_wakeup(false);
        self.machine.cancel_pending();
        self.irq.take();
        self.line.take();
    }
}

fn irq_handler(machine: &Arc<EdgeStateMachine>) -> IrqHandler {
    let machine = Arc::downgrade(machine);
    Arc::new(move || {
        let Some(machine) = machine.upgrade() else {
            return;
        };
        match machine.on_raw_interrupt() {
            Ok(()) => {}
            Err(CounterError::Faulted { .. }) => {}
            Err(e) => warn!("Interrupt on {} not processed: {}", machine.line(), e),
        }
    })
}
