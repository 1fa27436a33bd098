//! In-memory line controller.
//!
//! Used by the test suites and by the daemon's simulation mode. Levels are
//! driven by the caller; changing a level delivers the interrupt
//! synchronously on the calling thread, which stands in for interrupt
//! context.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{CounterError, CounterResult};
use crate::line::{GpioController, IrqHandler, LineId};

#[derive(Default)]
struct SimLine {
    level: bool,
    owner: Option<String>,
    irq: Option<IrqHandler>,
    wake: bool,
    fault: bool,
    reject_irq: bool,
}

/// Simulated GPIO bank.
#[derive(Default)]
pub struct SimulatedGpio {
    lines: Mutex<HashMap<LineId, SimLine>>,
}

impl SimulatedGpio {
    /// Creates an empty bank. Lines must be added before they can be claimed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `line` with an initial raw level.
    pub fn add_line(&self, line: LineId, level: bool) {
        self.lines.lock().entry(line).or_default().level = level;
    }

    /// Drives `line` to `level`, raising the interrupt if the level changed.
    pub fn set_level(&self, line: LineId, level: bool) {
        let handler = {
            let mut lines = self.lines.lock();
            let Some(sim) = lines.get_mut(&line) else {
                return;
            };
            if sim.level == level {
                return;
            }
            sim.level = level;
            sim.irq.clone()
        };
        trace!("{} -> {}", line, level);
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Changes the level without raising an interrupt.
    ///
    /// Models an edge whose interrupt has not been delivered yet.
    pub fn force_level(&self, line: LineId, level: bool) {
        if let Some(sim) = self.lines.lock().get_mut(&line) {
            sim.level = level;
        }
    }

    /// Drives a full high-then-low impulse.
    pub fn pulse(&self, line: LineId) {
        self.set_level(line, true);
        self.set_level(line, false);
    }

    /// Makes reads of `line` fail while `fault` is set.
    pub fn set_fault(&self, line: LineId, fault: bool) {
        if let Some(sim) = self.lines.lock().get_mut(&line) {
            sim.fault = fault;
        }
    }

    /// Makes interrupt requests for `line` fail while `reject` is set.
    pub fn reject_irq(&self, line: LineId, reject: bool) {
        if let Some(sim) = self.lines.lock().get_mut(&line) {
            sim.reject_irq = reject;
        }
    }

    /// Returns the current raw level, if the line exists.
    pub fn level(&self, line: LineId) -> Option<bool> {
        self.lines.lock().get(&line).map(|sim| sim.level)
    }

    /// Returns true if the line is reserved.
    pub fn is_claimed(&self, line: LineId) -> bool {
        self.lines
            .lock()
            .get(&line)
            .is_some_and(|sim| sim.owner.is_some())
    }

    /// Returns true if an interrupt handler is subscribed.
    pub fn has_irq(&self, line: LineId) -> bool {
        self.lines
            .lock()
            .get(&line)
            .is_some_and(|sim| sim.irq.is_some())
    }

    /// Returns true if wake-on-signal is armed.
    pub fn irq_wake_enabled(&self, line: LineId) -> bool {
        self.lines.lock().get(&line).is_some_and(|sim| sim.wake)
    }
}

impl GpioController for SimulatedGpio {
    fn name(&self) -> &str {
        "sim"
    }

    fn request_input(&self, line: LineId, label: &str) -> CounterResult<()> {
        let mut lines = self.lines.lock();
        let sim = lines
            .get_mut(&line)
            .ok_or_else(|| CounterError::line_unavailable(line, "no such line"))?;
        if sim.owner.is_some() {
            return Err(CounterError::LineBusy { line });
        }
        sim.owner = Some(label.to_string());
        Ok(())
    }

    fn free(&self, line: LineId) {
        if let Some(sim) = self.lines.lock().get_mut(&line) {
            sim.owner = None;
        }
    }

    fn get_value(&self, line: LineId) -> CounterResult<bool> {
        let lines = self.lines.lock();
        match lines.get(&line) {
            Some(sim) if sim.fault => Err(CounterError::hardware_fault(line, "injected fault")),
            Some(sim) => Ok(sim.level),
            None => Err(CounterError::hardware_fault(line, "no such line")),
        }
    }

    fn request_irq(&self, line: LineId, _label: &str, handler: IrqHandler) -> CounterResult<()> {
        let mut lines = self.lines.lock();
        let sim = lines
            .get_mut(&line)
            .ok_or_else(|| CounterError::irq_unavailable(line, "no such line"))?;
        if sim.reject_irq {
            return Err(CounterError::irq_unavailable(line, "rejected"));
        }
        if sim.irq.is_some() {
            return Err(CounterError::irq_unavailable(line, "already subscribed"));
        }
        sim.irq = Some(handler);
        Ok(())
    }

    fn free_irq(&self, line: LineId) {
        if let Some(sim) = self.lines.lock().get_mut(&line) {
            sim.irq = None;
            sim.wake = false;
        }
    }

    fn set_irq_wake(&self, line: LineId, enable: bool) -> CounterResult<()> {
        let mut lines = self.lines.lock();
        match lines.get_mut(&line) {
            Some(sim) if sim.irq.is_some() => {
                sim.wake = enable;
                Ok(())
            }
            _ => Err(CounterError::irq_unavailable(line, "no IRQ to arm")),
        }
    }
}
