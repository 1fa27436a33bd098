//! GPIO impulse counter daemon.
//!
//! This crate implements the `gpio-counterd` daemon, which attaches one
//! [`gpio_counter::CounterInstance`] per configured line and exposes each
//! count on its own control socket.
//!
//! # Responsibilities
//!
//! - Load the counter table from YAML ([`config_file`])
//! - Drive real lines through the sysfs GPIO class ([`sysfs`]) or the
//!   in-memory simulator
//! - Serve `read` / `write <value>` on `<socket_dir>/<name>.sock` ([`server`])
//! - Detach counters whose line faults ([`counter_mgr`])
//!
//! # Example
//!
//! ```ignore
//! use gpio_counterd::{CounterMgr, DaemonConfig, SysfsGpio};
//!
//! let config = DaemonConfig::load("/etc/gpio-counter/counters.yaml")?;
//! let mut mgr = CounterMgr::new(Arc::new(SysfsGpio::new(&config.sysfs_root)));
//! mgr.attach_all(&config.counters)?;
//! ```

pub mod config_file;
pub mod counter_mgr;
pub mod error;
pub mod server;
pub mod sysfs;

pub use config_file::{CounterEntry, DaemonConfig, DEFAULT_CONFIG_PATH};
pub use counter_mgr::CounterMgr;
pub use error::{DaemonError, Result};
pub use server::{handle_request, ControlServer};
pub use sysfs::SysfsGpio;
