//! gpio-counterd daemon entry point.
//!
//! Initializes logging, attaches every configured counter, serves the
//! control sockets and detaches faulted counters until shutdown.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gpio_counter::{GpioController, SimulatedGpio};
use gpio_counterd::{sysfs, ControlServer, CounterMgr, DaemonConfig, SysfsGpio, DEFAULT_CONFIG_PATH};

/// Interval between fault checks.
const REAP_INTERVAL_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "gpio-counterd", version)]
#[command(about = "Count debounced impulses on GPIO lines", long_about = None)]
struct Args {
    /// Counter table (YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use in-memory lines instead of sysfs
    #[arg(long)]
    simulate: bool,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Initialize tracing/logging.
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter '{}'", level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn make_controller(config: &DaemonConfig, simulate: bool) -> Arc<dyn GpioController> {
    if simulate {
        let gpio = SimulatedGpio::new();
        for entry in &config.counters {
            gpio.add_line(entry.line.line, false);
        }
        info!("Using simulated lines");
        return Arc::new(gpio);
    }

    if !sysfs::is_gpio_class(&config.sysfs_root) {
        warn!(
            "{} does not look like a sysfs GPIO class directory",
            config.sysfs_root.display()
        );
    }
    Arc::new(SysfsGpio::new(&config.sysfs_root))
}

fn stop_servers(servers: &mut HashMap<String, JoinHandle<()>>) {
    for (_, task) in servers.drain() {
        task.abort();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = DaemonConfig::load(&args.config)?;

    let mut mgr = CounterMgr::new(make_controller(&config, args.simulate));
    mgr.attach_all(&config.counters)?;

    let mut servers = HashMap::new();
    for device in mgr.devices() {
        let name = device.name().to_string();
        let server = match ControlServer::bind(config.socket_path(&name), device) {
            Ok(server) => server,
            Err(e) => {
                stop_servers(&mut servers);
                mgr.detach_all();
                return Err(e).with_context(|| format!("control socket for '{}'", name));
            }
        };
        servers.insert(name, tokio::spawn(server.run()));
    }

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut reap = tokio::time::interval(Duration::from_millis(REAP_INTERVAL_MS));

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break Ok(());
            }
            _ = reap.tick() => {
                for name in mgr.reap_faulted() {
                    if let Some(task) = servers.remove(&name) {
                        task.abort();
                    }
                }
                if mgr.is_empty() {
                    break Err(anyhow::anyhow!("all counters faulted"));
                }
            }
        }
    };

    stop_servers(&mut servers);
    mgr.detach_all();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("gpio-counterd: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("--- Starting gpio-counterd ---");

    match run(args).await {
        Ok(()) => {
            info!("gpio-counterd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("gpio-counterd error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["gpio-counterd"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!args.simulate);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_simulated_controller_has_configured_lines() {
        let config =
            DaemonConfig::from_yaml("counters:\n  - {name: a, line: 4}\n  - {name: b, line: 5}\n")
                .unwrap();
        let controller = make_controller(&config, true);
        assert_eq!(controller.name(), "sim");
        assert!(controller.get_value(gpio_counter::LineId::new(4)).is_ok());
        assert!(controller.get_value(gpio_counter::LineId::new(6)).is_err());
    }
}
