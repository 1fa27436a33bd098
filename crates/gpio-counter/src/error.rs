//! Error types for impulse counter operations.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

use crate::line::LineId;

/// Result type alias for counter operations.
pub type CounterResult<T> = Result<T, CounterError>;

/// Errors that can occur while attaching, running or accessing a counter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// The line does not exist or cannot be reserved.
    #[error("Line {line} unavailable: {message}")]
    LineUnavailable {
        /// The requested line.
        line: LineId,
        /// Error message.
        message: String,
    },

    /// The line is already reserved by another owner.
    #[error("Line {line} is already claimed")]
    LineBusy {
        /// The requested line.
        line: LineId,
    },

    /// Interrupt subscription for the line failed.
    #[error("Unable to request IRQ for line {line}: {message}")]
    IrqUnavailable {
        /// The line whose interrupt was requested.
        line: LineId,
        /// Error message.
        message: String,
    },

    /// Reading the line failed.
    #[error("Hardware fault on line {line}: {message}")]
    HardwareFault {
        /// The line that could not be read.
        line: LineId,
        /// Error message.
        message: String,
    },

    /// A previous hardware fault made the counter untrustworthy.
    #[error("Counter on line {line} is faulted")]
    Faulted {
        /// The faulted line.
        line: LineId,
    },

    /// No execution context is available to host deferred debounce work.
    #[error("Debounce scheduler unavailable: {message}")]
    SchedulerUnavailable {
        /// Error message.
        message: String,
    },

    /// Malformed input on the write surface.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// Destination buffer cannot hold the formatted count.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes offered by the caller.
        available: usize,
    },
}

impl CounterError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a line unavailable error.
    pub fn line_unavailable(line: LineId, message: impl Into<String>) -> Self {
        Self::LineUnavailable {
            line,
            message: message.into(),
        }
    }

    /// Creates an IRQ unavailable error.
    pub fn irq_unavailable(line: LineId, message: impl Into<String>) -> Self {
        Self::IrqUnavailable {
            line,
            message: message.into(),
        }
    }

    /// Creates a hardware fault error.
    pub fn hardware_fault(line: LineId, message: impl Into<String>) -> Self {
        Self::HardwareFault {
            line,
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns true if this error leaves the counter unusable.
    ///
    /// Usage errors on the read/write surface are local to the caller and
    /// never affect the stored count.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CounterError::InvalidInput { .. } | CounterError::BufferTooSmall { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = CounterError::LineBusy { line: LineId::new(17) };
        assert_eq!(err.to_string(), "Line gpio17 is already claimed");
    }

    #[test]
    fn test_hardware_fault() {
        let err = CounterError::hardware_fault(LineId::new(4), "read failed");
        assert_eq!(err.to_string(), "Hardware fault on line gpio4: read failed");
    }

    #[test]
    fn test_buffer_too_small() {
        let err = CounterError::BufferTooSmall {
            needed: 3,
            available: 1,
        };
        assert!(err.to_string().contains("need 3 bytes"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(CounterError::hardware_fault(LineId::new(1), "gone").is_fatal());
        assert!(CounterError::invalid_config("line", "missing").is_fatal());
        assert!(!CounterError::invalid_input("abc").is_fatal());
        assert!(!CounterError::BufferTooSmall {
            needed: 2,
            available: 0
        }
        .is_fatal());
    }
}
