//! Configuration file support for gpio-counterd
//!
//! Loads and validates the counter table from a YAML file.
//! Default location: /etc/gpio-counter/counters.yaml

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use gpio_counter::LineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gpio-counter/counters.yaml";

/// One counted line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEntry {
    /// Counter name; also names the control socket
    pub name: String,

    /// Line, polarity and debounce settings
    #[serde(flatten)]
    pub line: LineConfig,

    /// Allow this line to wake the host from suspend
    #[serde(default)]
    pub wakeup: bool,
}

/// Complete gpio-counterd configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding one control socket per counter
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    /// Root of the sysfs GPIO class
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Counted lines
    #[serde(default)]
    pub counters: Vec<CounterEntry>,
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/run/gpio-counter")
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

impl DaemonConfig {
    /// Load and validate configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DaemonError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content).map_err(|source| DaemonError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration without validating it
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Path of the control socket for `name`
    pub fn socket_path(&self, name: &str) -> PathBuf {
        self.socket_dir.join(format!("{}.sock", name))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.counters.is_empty() {
            return Err(DaemonError::Config("no counters configured".to_string()));
        }

        let mut names = HashSet::new();
        let mut lines = HashSet::new();
        for entry in &self.counters {
            if entry.name.is_empty() || entry.name.contains('/') {
                return Err(DaemonError::Config(format!(
                    "invalid counter name '{}'",
                    entry.name
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(DaemonError::Config(format!(
                    "duplicate counter name '{}'",
                    entry.name
                )));
            }
            if !lines.insert(entry.line.line) {
                return Err(DaemonError::Config(format!(
                    "{} used by more than one counter",
                    entry.line.line
                )));
            }
            entry
                .line
                .validate()
                .map_err(|e| DaemonError::counter(&entry.name, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpio_counter::LineId;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
socket_dir: /tmp/counters
counters:
  - name: water
    line: 17
    active_low: true
    debounce_ms: 20
    wakeup: true
  - name: power
    line: 27
"#;

    #[test]
    fn test_yaml_deserialization() {
        let config = DaemonConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.socket_dir, PathBuf::from("/tmp/counters"));
        // Unspecified values should use defaults
        assert_eq!(config.sysfs_root, PathBuf::from("/sys/class/gpio"));
        assert_eq!(config.counters.len(), 2);

        let water = &config.counters[0];
        assert_eq!(water.name, "water");
        assert_eq!(
            water.line,
            LineConfig::new(17).with_inverted(true).with_debounce_ms(20)
        );
        assert!(water.wakeup);

        let power = &config.counters[1];
        assert_eq!(power.line.line, LineId::new(27));
        assert!(!power.line.inverted);
        assert_eq!(power.line.debounce_ms, 0);
        assert!(!power.wakeup);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_path() {
        let config = DaemonConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            config.socket_path("water"),
            PathBuf::from("/tmp/counters/water.sock")
        );
    }

    #[test]
    fn test_validate_empty() {
        let config = DaemonConfig::from_yaml("counters: []").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicates() {
        let dup_name = "counters:\n  - {name: a, line: 1}\n  - {name: a, line: 2}\n";
        assert!(DaemonConfig::from_yaml(dup_name).unwrap().validate().is_err());

        let dup_line = "counters:\n  - {name: a, line: 1}\n  - {name: b, line: 1}\n";
        assert!(DaemonConfig::from_yaml(dup_line).unwrap().validate().is_err());
    }

    #[test]
    fn test_validate_bad_name() {
        let config = DaemonConfig::from_yaml("counters:\n  - {name: a/b, line: 1}\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_debounce() {
        let config =
            DaemonConfig::from_yaml("counters:\n  - {name: a, line: 1, debounce_ms: 999999}\n")
                .unwrap();
        assert!(matches!(
            config.validate(),
            Err(DaemonError::Counter { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.counters.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            DaemonConfig::load("/nonexistent/counters.yaml"),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"counters: [name: 1").unwrap();
        assert!(matches!(
            DaemonConfig::load(file.path()),
            Err(DaemonError::Parse { .. })
        ));
    }
}
