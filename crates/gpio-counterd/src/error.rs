//! Error types for gpio-counterd

use std::path::PathBuf;

use gpio_counter::CounterError;
use thiserror::Error;

/// Errors that can occur in gpio-counterd
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration file missing, unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to parse the YAML configuration
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Counter core error
    #[error("Counter '{name}': {source}")]
    Counter {
        /// The counter name.
        name: String,
        /// The underlying counter error.
        #[source]
        source: CounterError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// Wraps a counter error with the counter's name.
    pub fn counter(name: impl Into<String>, source: CounterError) -> Self {
        Self::Counter {
            name: name.into(),
            source,
        }
    }
}

/// Result type alias for gpio-counterd operations
pub type Result<T> = std::result::Result<T, DaemonError>;
