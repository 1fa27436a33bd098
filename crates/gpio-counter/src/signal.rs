//! Polarity-aware line sampling.

use std::sync::Arc;

use tracing::trace;

use crate::error::CounterResult;
use crate::line::{GpioController, LineId};

/// Reads the logical state of one line.
pub struct SignalReader {
    controller: Arc<dyn GpioController>,
    line: LineId,
    inverted: bool,
}

impl SignalReader {
    /// Creates a reader for `line`, flipping the raw level when `inverted`.
    pub fn new(controller: Arc<dyn GpioController>, line: LineId, inverted: bool) -> Self {
        Self {
            controller,
            line,
            inverted,
        }
    }

    /// Returns the line being sampled.
    pub fn line(&self) -> LineId {
        self.line
    }

    /// Samples the instantaneous logical state (`raw ^ inverted`).
    pub fn sample(&self) -> CounterResult<bool> {
        let raw = self.controller.get_value(self.line)?;
        let state = raw ^ self.inverted;
        trace!("Sampled {}: raw={} logical={}", self.line, raw, state);
        Ok(state)
    }
}
