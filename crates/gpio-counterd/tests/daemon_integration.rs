//! Daemon integration tests
//!
//! Config file → CounterMgr → control sockets, on simulated lines.

use std::io::Write;
use std::sync::Arc;

use gpio_counter::{LineId, SimulatedGpio};
use gpio_counterd::{ControlServer, CounterMgr, DaemonConfig};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

async fn request(path: &std::path::Path, line: &str) -> String {
    let stream = UnixStream::connect(path).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
    writer.shutdown().await.unwrap();
    let mut reply = String::new();
    BufReader::new(reader).read_line(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn test_config_to_sockets() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("counters.yaml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        "socket_dir: {}\ncounters:\n  - name: water\n    line: 17\n    active_low: true\n  - name: power\n    line: 27\n",
        dir.path().join("run").display()
    )
    .unwrap();

    let config = DaemonConfig::load(&config_path).unwrap();
    let gpio = Arc::new(SimulatedGpio::new());
    gpio.add_line(LineId::new(17), true);
    gpio.add_line(LineId::new(27), false);

    let mut mgr = CounterMgr::new(gpio.clone());
    mgr.attach_all(&config.counters).unwrap();

    let mut tasks = Vec::new();
    for device in mgr.devices() {
        let server = ControlServer::bind(config.socket_path(device.name()), device).unwrap();
        tasks.push(tokio::spawn(server.run()));
    }

    // Active-low: raw low is logical high
    gpio.set_level(LineId::new(17), false);
    gpio.set_level(LineId::new(17), true);
    for _ in 0..3 {
        gpio.pulse(LineId::new(27));
    }

    let water = config.socket_path("water");
    let power = config.socket_path("power");
    assert_eq!(request(&water, "read").await, "1\n");
    assert_eq!(request(&power, "read").await, "3\n");

    assert_eq!(request(&power, "write 0x100").await, "5\n");
    assert_eq!(request(&power, "read").await, "256\n");
    assert!(request(&power, "write -5").await.starts_with("error:"));
    assert_eq!(request(&power, "read").await, "256\n");

    gpio.pulse(LineId::new(27));
    assert_eq!(request(&power, "read").await, "257\n");

    for task in tasks {
        task.abort();
    }
    mgr.detach_all();
    assert!(!gpio.is_claimed(LineId::new(17)));
    assert!(!gpio.is_claimed(LineId::new(27)));
}

#[tokio::test(start_paused = true)]
async fn test_debounced_counter_from_config() {
    let config = DaemonConfig::from_yaml(
        "counters:\n  - name: meter\n    line: 3\n    debounce_ms: 10\n    wakeup: true\n",
    )
    .unwrap();
    config.validate().unwrap();

    let gpio = Arc::new(SimulatedGpio::new());
    gpio.add_line(LineId::new(3), false);
    let mut mgr = CounterMgr::new(gpio.clone());
    mgr.attach_all(&config.counters).unwrap();

    for level in [true, false, true] {
        gpio.set_level(LineId::new(3), level);
    }
    tokio::time::sleep(std::time::Duration::from_millis(15)).await;

    let meter = mgr.get("meter").unwrap();
    assert_eq!(meter.read_count(), 1);
    assert!(meter.may_wakeup());

    mgr.suspend_all().unwrap();
    assert!(gpio.irq_wake_enabled(LineId::new(3)));
    mgr.resume_all().unwrap();

    mgr.detach_all();
}
