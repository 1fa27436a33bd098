//! Hardware line boundary.
//!
//! The counter core never talks to hardware directly. Everything it needs
//! from the platform (line reservation, level reads, edge interrupts and
//! wake arming) goes through [`GpioController`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CounterError, CounterResult};

/// Numeric handle of a single input line.
///
/// # Examples
///
/// ```
/// use gpio_counter::LineId;
///
/// let line: LineId = "gpio17".parse().unwrap();
/// assert_eq!(line.as_u32(), 17);
/// assert_eq!(line.to_string(), "gpio17");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(u32);

impl LineId {
    /// Creates a line handle.
    pub const fn new(id: u32) -> Self {
        LineId(id)
    }

    /// Returns the raw line number.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}", self.0)
    }
}

impl FromStr for LineId {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both "17" and "gpio17"
        let digits = s.strip_prefix("gpio").unwrap_or(s);
        digits
            .parse::<u32>()
            .map(LineId)
            .map_err(|_| CounterError::invalid_config("line", format!("'{}' is not a line id", s)))
    }
}

impl From<u32> for LineId {
    fn from(id: u32) -> Self {
        LineId(id)
    }
}

/// Raw interrupt callback, invoked once per physical edge.
pub type IrqHandler = Arc<dyn Fn() + Send + Sync>;

/// Platform services for one or more input lines.
///
/// Implementations must invoke a registered [`IrqHandler`] on both rising
/// and falling edges, and must not hold internal locks while doing so: the
/// handler reads the line back through [`GpioController::get_value`].
pub trait GpioController: Send + Sync {
    /// Short name of the backend, used in logs.
    fn name(&self) -> &str;

    /// Reserves `line` as an input.
    fn request_input(&self, line: LineId, label: &str) -> CounterResult<()>;

    /// Releases a reservation made by [`GpioController::request_input`].
    fn free(&self, line: LineId);

    /// Reads the raw (unpolarised) level of `line`.
    fn get_value(&self, line: LineId) -> CounterResult<bool>;

    /// Subscribes `handler` to both edges of `line`.
    fn request_irq(&self, line: LineId, label: &str, handler: IrqHandler) -> CounterResult<()>;

    /// Drops the interrupt subscription of `line`.
    fn free_irq(&self, line: LineId);

    /// Arms or disarms wake-on-signal for the interrupt of `line`.
    fn set_irq_wake(&self, line: LineId, enable: bool) -> CounterResult<()>;
}

/// Reservation of an input line, released on drop.
pub struct LineGuard {
    controller: Arc<dyn GpioController>,
    line: LineId,
}

impl LineGuard {
    /// Reserves `line` through `controller`.
    pub fn request(
        controller: Arc<dyn GpioController>,
        line: LineId,
        label: &str,
    ) -> CounterResult<Self> {
        controller.request_input(line, label)?;
        debug!("Reserved {} on {}", line, controller.name());
        Ok(Self { controller, line })
    }

    /// Returns the reserved line.
    pub fn line(&self) -> LineId {
        self.line
    }
}

impl Drop for LineGuard {
    fn drop(&mut self) {
        self.controller.free(self.line);
        debug!("Released {}", self.line);
    }
}

/// Interrupt subscription, freed on drop.
pub struct IrqGuard {
    controller: Arc<dyn GpioController>,
    line: LineId,
}

impl IrqGuard {
    /// Subscribes `handler` to both edges of `line`.
    pub fn request(
        controller: Arc<dyn GpioController>,
        line: LineId,
        label: &str,
        handler: IrqHandler,
    ) -> CounterResult<Self> {
        controller.request_irq(line, label, handler)?;
        debug!("Subscribed to edges of {}", line);
        Ok(Self { controller, line })
    }

    /// Arms or disarms wake-on-signal.
    pub fn set_wake(&self, enable: bool) -> CounterResult<()> {
        self.controller.set_irq_wake(self.line, enable)
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        self.controller.free_irq(self.line);
        debug!("Freed IRQ of {}", self.line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedGpio;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_id_parse() {
        assert_eq!("17".parse::<LineId>().unwrap(), LineId::new(17));
        assert_eq!("gpio4".parse::<LineId>().unwrap(), LineId::new(4));
        assert!("gpio".parse::<LineId>().is_err());
        assert!("-1".parse::<LineId>().is_err());
    }

    #[test]
    fn test_line_guard_releases_once() {
        let gpio = Arc::new(SimulatedGpio::new());
        gpio.add_line(LineId::new(3), false);

        let guard = LineGuard::request(gpio.clone(), LineId::new(3), "test").unwrap();
        assert!(gpio.is_claimed(LineId::new(3)));
        assert_eq!(guard.line(), LineId::new(3));

        drop(guard);
        assert!(!gpio.is_claimed(LineId::new(3)));
    }

    #[test]
    fn test_irq_guard_frees_subscription() {
        let gpio = Arc::new(SimulatedGpio::new());
        gpio.add_line(LineId::new(5), false);
        gpio.request_input(LineId::new(5), "test").unwrap();

        let guard =
            IrqGuard::request(gpio.clone(), LineId::new(5), "test", Arc::new(|| {})).unwrap();
        assert!(gpio.has_irq(LineId::new(5)));

        guard.set_wake(true).unwrap();
        assert!(gpio.irq_wake_enabled(LineId::new(5)));

        drop(guard);
        assert!(!gpio.has_irq(LineId::new(5)));
    }
}
