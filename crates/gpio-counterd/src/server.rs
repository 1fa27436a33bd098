//! Per-counter control socket.
//!
//! Each counter gets a Unix stream socket. Clients send one command per
//! line:
//!
//! | Request         | Reply                      |
//! |-----------------|----------------------------|
//! | `read`          | `<count>\n`                |
//! | `write <value>` | `<bytes consumed>\n`       |
//! | anything else   | `error: <message>\n`       |
//!
//! `<value>` accepts decimal, `0x` hex and leading-zero octal.

use std::path::{Path, PathBuf};

use gpio_counter::CounterDevice;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Large enough for any `u64` plus newline.
const READ_BUF_LEN: usize = 32;

/// Serves one counter device on a Unix socket.
pub struct ControlServer {
    path: PathBuf,
    listener: UnixListener,
    device: CounterDevice,
}

impl ControlServer {
    /// Binds the socket, replacing a stale socket file at `path`.
    pub fn bind(path: impl AsRef<Path>, device: CounterDevice) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;
        info!("Counter {} listening on {}", device.name(), path.display());
        Ok(Self {
            path,
            listener,
            device,
        })
    }

    /// Returns the socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts clients until the task is aborted.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let device = self.device.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_client(stream, device).await {
                            debug!("Control client error: {}", e);
                        }
                    });
                }
                Err(e) => warn!("Accept on {} failed: {}", self.path.display(), e),
            }
        }
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn serve_client(stream: UnixStream, device: CounterDevice) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let reply = handle_request(&device, &line);
        writer.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

/// Executes one control command and returns the reply text.
pub fn handle_request(device: &CounterDevice, request: &str) -> String {
    let request = request.trim_end_matches('\r');
    let (command, arg) = match request.split_once(' ') {
        Some((command, arg)) => (command, Some(arg)),
        None => (request, None),
    };

    let result = match (command, arg) {
        ("read", None) => {
            let mut buf = [0u8; READ_BUF_LEN];
            device
                .read(0, &mut buf)
                .map(|n| String::from_utf8_lossy(&buf[..n]).into_owned())
        }
        ("write", Some(value)) => device.write(value.as_bytes()).map(|n| format!("{}\n", n)),
        _ => return format!("error: unknown command '{}'\n", request),
    };

    result.unwrap_or_else(|e| format!("error: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpio_counter::{CounterInstance, LineConfig, LineId, SimulatedGpio};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn instance() -> (Arc<SimulatedGpio>, CounterInstance) {
        let gpio = Arc::new(SimulatedGpio::new());
        gpio.add_line(LineId::new(2), false);
        let counter = CounterInstance::attach("meter", &LineConfig::new(2), gpio.clone()).unwrap();
        (gpio, counter)
    }

    #[test]
    fn test_handle_read_write() {
        let (_gpio, counter) = instance();
        let device = counter.device();

        assert_eq!(handle_request(device, "read"), "0\n");
        assert_eq!(handle_request(device, "write 0x10"), "4\n");
        assert_eq!(handle_request(device, "read"), "16\n");
    }

    #[test]
    fn test_handle_errors() {
        let (_gpio, counter) = instance();
        let device = counter.device();
        counter.overwrite(5);

        assert!(handle_request(device, "write banana").starts_with("error: Invalid input"));
        assert!(handle_request(device, "reset").starts_with("error: unknown command"));
        assert!(handle_request(device, "read 1").starts_with("error: unknown command"));
        assert_eq!(handle_request(device, "read"), "5\n");
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let (gpio, counter) = instance();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meter.sock");

        let server = ControlServer::bind(&path, counter.device().clone()).unwrap();
        let task = tokio::spawn(server.run());

        gpio.pulse(LineId::new(2));
        gpio.pulse(LineId::new(2));

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut replies = BufReader::new(reader).lines();

        writer.write_all(b"read\n").await.unwrap();
        assert_eq!(replies.next_line().await.unwrap().unwrap(), "2");

        writer.write_all(b"write 07\n").await.unwrap();
        assert_eq!(replies.next_line().await.unwrap().unwrap(), "2");
        assert_eq!(counter.read_count(), 7);

        task.abort();
    }
}
