//! Debounced impulse counting on a single GPIO line.
//!
//! This crate turns raw edge interrupts on one input line into a reliable
//! monotonic count, rejecting contact bounce with an optional settle delay:
//!
//! - [`SignalReader`]: polarity-aware sampling of the line
//! - [`DebounceScheduler`]: single-slot deferred check on the tokio runtime
//! - [`EdgeStateMachine`]: interrupt and expiry handling, rising-edge counting
//! - [`CounterStore`]: the shared count
//! - [`CounterDevice`]: text read/write surface (`"<count>\n"` / radix-aware parse)
//! - [`CounterInstance`]: attach/detach, suspend/resume wake arming
//!
//! Hardware is reached only through [`GpioController`]; [`SimulatedGpio`]
//! is an in-memory implementation.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gpio_counter::{CounterInstance, LineConfig, LineId, SimulatedGpio};
//!
//! let gpio = Arc::new(SimulatedGpio::new());
//! gpio.add_line(LineId::new(17), false);
//!
//! let counter = CounterInstance::attach("meter", &LineConfig::new(17), gpio.clone()).unwrap();
//! gpio.pulse(LineId::new(17));
//! gpio.pulse(LineId::new(17));
//! assert_eq!(counter.read_count(), 2);
//! ```

pub mod config;
pub mod debounce;
pub mod device;
pub mod edge;
pub mod error;
pub mod instance;
pub mod line;
pub mod signal;
pub mod sim;
pub mod store;

pub use config::LineConfig;
pub use debounce::DebounceScheduler;
pub use device::{parse_count, CounterDevice};
pub use edge::{EdgeSnapshot, EdgeStateMachine, EdgeStats};
pub use error::{CounterError, CounterResult};
pub use instance::CounterInstance;
pub use line::{GpioController, IrqGuard, IrqHandler, LineGuard, LineId};
pub use signal::SignalReader;
pub use sim::SimulatedGpio;
pub use store::CounterStore;
