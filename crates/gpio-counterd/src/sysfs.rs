//! Linux sysfs GPIO backend.
//!
//! Lines live under `<root>/gpio<N>` with `direction`, `value` and `edge`
//! attributes. Edge interrupts are delivered by `poll(2)` reporting
//! `POLLPRI` on the `value` file; one watcher thread per subscribed line
//! waits for them and calls the handler.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use gpio_counter::{CounterError, CounterResult, GpioController, IrqHandler, LineId};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// How long a watcher blocks in poll before rechecking its stop flag.
const POLL_TIMEOUT_MS: libc::c_int = 100;

struct EdgeWatcher {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct SysfsState {
    claimed: HashMap<LineId, String>,
    exported: HashSet<LineId>,
    watchers: HashMap<LineId, EdgeWatcher>,
    wake: HashSet<LineId>,
}

/// GPIO controller over the sysfs class interface.
pub struct SysfsGpio {
    root: PathBuf,
    state: Mutex<SysfsState>,
}

impl SysfsGpio {
    /// Creates a controller rooted at `root` (normally `/sys/class/gpio`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(SysfsState::default()),
        }
    }

    fn line_dir(&self, line: LineId) -> PathBuf {
        self.root.join(line.to_string())
    }

    fn attr(&self, line: LineId, name: &str) -> PathBuf {
        self.line_dir(line).join(name)
    }

    fn unexport(&self, line: LineId) {
        let path = self.root.join("unexport");
        if let Err(e) = fs::write(&path, line.as_u32().to_string()) {
            warn!("Failed to unexport {}: {}", line, e);
        }
    }

    /// Returns true if wake-on-signal was requested for `line`.
    pub fn wake_requested(&self, line: LineId) -> bool {
        self.state.lock().wake.contains(&line)
    }
}

impl GpioController for SysfsGpio {
    fn name(&self) -> &str {
        "sysfs"
    }

    fn request_input(&self, line: LineId, label: &str) -> CounterResult<()> {
        let mut state = self.state.lock();
        if state.claimed.contains_key(&line) {
            return Err(CounterError::LineBusy { line });
        }

        let mut exported = false;
        if !self.line_dir(line).exists() {
            fs::write(self.root.join("export"), line.as_u32().to_string())
                .map_err(|e| CounterError::line_unavailable(line, format!("export: {}", e)))?;
            exported = true;
        }

        if let Err(e) = fs::write(self.attr(line, "direction"), "in") {
            if exported {
                self.unexport(line);
            }
            return Err(CounterError::line_unavailable(
                line,
                format!("direction: {}", e),
            ));
        }

        if exported {
            state.exported.insert(line);
        }
        state.claimed.insert(line, label.to_string());
        Ok(())
    }

    fn free(&self, line: LineId) {
        let mut state = self.state.lock();
        state.claimed.remove(&line);
        if state.exported.remove(&line) {
            self.unexport(line);
        }
    }

    fn get_value(&self, line: LineId) -> CounterResult<bool> {
        let raw = fs::read_to_string(self.attr(line, "value"))
            .map_err(|e| CounterError::hardware_fault(line, e.to_string()))?;
        parse_value(line, &raw)
    }

    fn request_irq(&self, line: LineId, label: &str, handler: IrqHandler) -> CounterResult<()> {
        let mut state = self.state.lock();
        if state.watchers.contains_key(&line) {
            return Err(CounterError::irq_unavailable(line, "already subscribed"));
        }

        fs::write(self.attr(line, "edge"), "both")
            .map_err(|e| CounterError::irq_unavailable(line, format!("edge: {}", e)))?;
        let file = File::open(self.attr(line, "value"))
            .map_err(|e| CounterError::irq_unavailable(line, format!("value: {}", e)))?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread = std::thread::Builder::new()
            .name(format!("{}-{}-irq", label, line))
            .spawn({
                let stop = stop.clone();
                move || watch_edges(line, file, stop, handler)
            })
            .map_err(|e| CounterError::irq_unavailable(line, e.to_string()))?;

        state.watchers.insert(
            line,
            EdgeWatcher {
                stop,
                thread: Some(thread),
            },
        );
        info!("Watching edges of {} ({})", line, label);
        Ok(())
    }

    fn free_irq(&self, line: LineId) {
        let watcher = {
            let mut state = self.state.lock();
            state.wake.remove(&line);
            state.watchers.remove(&line)
        };
        let Some(mut watcher) = watcher else {
            return;
        };

        watcher.stop.store(true, Ordering::Release);
        if let Some(thread) = watcher.thread.take() {
            if thread.join().is_err() {
                error!("Edge watcher for {} panicked", line);
            }
        }
        if let Err(e) = fs::write(self.attr(line, "edge"), "none") {
            warn!("Failed to reset edge of {}: {}", line, e);
        }
    }

    fn set_irq_wake(&self, line: LineId, enable: bool) -> CounterResult<()> {
        let mut state = self.state.lock();
        if !state.watchers.contains_key(&line) {
            return Err(CounterError::irq_unavailable(line, "no IRQ to arm"));
        }
        // sysfs has no per-line wake attribute; the platform wakeup policy
        // applies and the watcher stays subscribed.
        if enable {
            state.wake.insert(line);
        } else {
            state.wake.remove(&line);
        }
        debug!("Wake-on-signal for {} {}", line, if enable { "on" } else { "off" });
        Ok(())
    }
}

fn parse_value(line: LineId, raw: &str) -> CounterResult<bool> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(CounterError::hardware_fault(
            line,
            format!("unexpected value '{}'", other),
        )),
    }
}

fn rearm(file: &mut File) -> io::Result<()> {
    let mut buf = [0u8; 8];
    file.seek(SeekFrom::Start(0))?;
    let _ = file.read(&mut buf)?;
    Ok(())
}

fn watch_edges(line: LineId, mut file: File, stop: Arc<AtomicBool>, handler: IrqHandler) {
    // Pending state must be consumed before the first poll
    if let Err(e) = rearm(&mut file) {
        error!("Edge watcher for {} cannot read value: {}", line, e);
        return;
    }

    while !stop.load(Ordering::Acquire) {
        let mut fds = libc::pollfd {
            fd: file.as_raw_fd(),
            events: libc::POLLPRI | libc::POLLERR,
            revents: 0,
        };
        // SAFETY: `fds` is a valid pollfd for the lifetime of the call and
        // the descriptor stays open while `file` is alive.
        let rc = unsafe { libc::poll(&mut fds, 1, POLL_TIMEOUT_MS) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            error!("poll on {} failed: {}", line, err);
            return;
        }
        if rc == 0 {
            continue;
        }
        if fds.revents & libc::POLLNVAL != 0 {
            error!("Edge watcher for {} lost its descriptor", line);
            return;
        }
        if fds.revents & libc::POLLPRI != 0 {
            if let Err(e) = rearm(&mut file) {
                error!("Edge watcher for {} cannot read value: {}", line, e);
                return;
            }
            handler();
        }
    }
    debug!("Edge watcher for {} stopped", line);
}

/// Returns true if `root` looks like a sysfs GPIO class directory.
pub fn is_gpio_class(root: &Path) -> bool {
    root.join("export").exists() && root.join("unexport").exists()
}
