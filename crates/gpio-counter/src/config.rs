//! Per-line counter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CounterError, CounterResult};
use crate::line::LineId;

/// Longest accepted debounce window, in milliseconds.
pub const MAX_DEBOUNCE_MS: u32 = 60_000;

/// Configuration of a single counted line.
///
/// Immutable once an instance is attached; the instance keeps its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Line to count impulses on.
    pub line: LineId,

    /// Interpret the line as active-low.
    #[serde(default, alias = "active_low")]
    pub inverted: bool,

    /// Debounce window in milliseconds; 0 disables debouncing.
    #[serde(default)]
    pub debounce_ms: u32,
}

impl LineConfig {
    /// Creates an active-high configuration with debouncing disabled.
    pub fn new(line: impl Into<LineId>) -> Self {
        Self {
            line: line.into(),
            inverted: false,
            debounce_ms: 0,
        }
    }

    /// Sets the polarity inversion.
    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Sets the debounce window.
    pub fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Returns the debounce window, or `None` when debouncing is disabled.
    pub fn debounce_delay(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(u64::from(self.debounce_ms)))
    }

    /// Validate configuration
    pub fn validate(&self) -> CounterResult<()> {
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(CounterError::invalid_config(
                "debounce_ms",
                format!("{} exceeds {} ms", self.debounce_ms, MAX_DEBOUNCE_MS),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LineConfig::new(17);
        assert_eq!(config.line, LineId::new(17));
        assert!(!config.inverted);
        assert_eq!(config.debounce_delay(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debounce_delay() {
        let config = LineConfig::new(1).with_debounce_ms(20);
        assert_eq!(config.debounce_delay(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_validate_debounce_too_long() {
        let config = LineConfig::new(1).with_debounce_ms(MAX_DEBOUNCE_MS + 1);
        assert!(matches!(
            config.validate(),
            Err(CounterError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_yaml_deserialization() {
        let yaml = "line: 22\nactive_low: true\ndebounce_ms: 15\n";
        let config: LineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config,
            LineConfig::new(22).with_inverted(true).with_debounce_ms(15)
        );
    }

    #[test]
    fn test_yaml_missing_line() {
        let yaml = "debounce_ms: 15\n";
        assert!(serde_yaml::from_str::<LineConfig>(yaml).is_err());
    }
}
