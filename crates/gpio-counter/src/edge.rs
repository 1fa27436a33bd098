//! Edge detection and debounce state machine.
//!
//! Two entry points feed one confirmation step:
//!
//! - [`EdgeStateMachine::on_raw_interrupt`] runs once per physical edge. It
//!   samples the line and either confirms immediately (debounce disabled)
//!   or arms the single-slot debounce check.
//! - [`EdgeStateMachine::on_debounce_expiry`] runs once per armed check. It
//!   samples the line again and confirms only if that sample matches the
//!   state captured by the most recent interrupt. A mismatch drops the
//!   check without committing anything and without re-arming.
//!
//! Confirmation counts a LOW to HIGH change of the committed state and then
//! commits the new state. All state lives behind one mutex, so at most one
//! confirmation runs at a time per instance.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::debounce::DebounceScheduler;
use crate::error::{CounterError, CounterResult};
use crate::line::LineId;
use crate::signal::SignalReader;
use crate::store::CounterStore;

/// Point-in-time view of the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSnapshot {
    /// Logical state sampled by the most recent interrupt.
    pub current_state: bool,
    /// Last committed logical state.
    pub last_confirmed_state: bool,
    /// True while a debounce check is scheduled.
    pub debounce_pending: bool,
}

/// Event counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeStats {
    /// Raw interrupts processed.
    pub interrupts: u64,
    /// Debounce checks that ran.
    pub expiries: u64,
    /// Confirmations committed (rising or not).
    pub confirmations: u64,
    /// Debounce checks dropped because the line moved.
    pub unstable_drops: u64,
}

struct EdgeState {
    current_state: bool,
    last_confirmed_state: bool,
    fault: Option<CounterError>,
    stats: EdgeStats,
}

struct Debounce {
    delay: Duration,
    scheduler: DebounceScheduler,
}

/// Impulse detector for one line.
pub struct EdgeStateMachine {
    reader: SignalReader,
    store: Arc<CounterStore>,
    debounce: Option<Debounce>,
    state: Mutex<EdgeState>,
}

impl EdgeStateMachine {
    /// Creates a machine whose committed state is the line's current state.
    ///
    /// With a debounce delay the machine binds a [`DebounceScheduler`] to
    /// the calling tokio runtime, which must therefore exist.
    pub fn new(
        reader: SignalReader,
        store: Arc<CounterStore>,
        debounce_delay: Option<Duration>,
    ) -> CounterResult<Self> {
        let debounce = match debounce_delay {
            Some(delay) => Some(Debounce {
                delay,
                scheduler: DebounceScheduler::new()?,
            }),
            None => None,
        };

        let initial = reader.sample()?;
        debug!("{} initial logical state {}", reader.line(), initial);

        Ok(Self {
            reader,
            store,
            debounce,
            state: Mutex::new(EdgeState {
                current_state: initial,
                last_confirmed_state: initial,
                fault: None,
                stats: EdgeStats::default(),
            }),
        })
    }

    /// Returns the line this machine watches.
    pub fn line(&self) -> LineId {
        self.reader.line()
    }

    /// Handles one raw edge interrupt. Never blocks on the debounce result.
    pub fn on_raw_interrupt(self: &Arc<Self>) -> CounterResult<()> {
        let mut state = self.state.lock();
        self.ensure_healthy(&state)?;
        let sampled = self.sample(&mut state)?;

        state.stats.interrupts += 1;
        state.current_state = sampled;

        match &self.debounce {
            None => {
                self.confirm(&mut state, sampled);
            }
            Some(debounce) => {
                // A pending check will sample the line at expiry; later
                // bounces inside the window only refresh current_state.
                if !debounce.scheduler.is_pending() {
                    let machine = Arc::downgrade(self);
                    debounce
                        .scheduler
                        .arm(debounce.delay, move || Self::expire(machine));
                }
            }
        }
        Ok(())
    }

    /// Handles expiry of the debounce window.
    pub fn on_debounce_expiry(&self) -> CounterResult<()> {
        let mut state = self.state.lock();
        self.ensure_healthy(&state)?;
        let debounced = self.sample(&mut state)?;

        state.stats.expiries += 1;
        if debounced == state.current_state {
            self.confirm(&mut state, debounced);
        } else {
            state.stats.unstable_drops += 1;
            debug!(
                "{} still unstable at expiry (interrupt saw {}, now {}), dropped",
                self.line(),
                state.current_state,
                debounced
            );
        }
        Ok(())
    }

    /// Cancels a pending debounce check. Returns true if one was pending.
    pub fn cancel_pending(&self) -> bool {
        self.debounce
            .as_ref()
            .is_some_and(|debounce| debounce.scheduler.cancel())
    }

    /// Returns a view of the current state.
    pub fn snapshot(&self) -> EdgeSnapshot {
        let state = self.state.lock();
        EdgeSnapshot {
            current_state: state.current_state,
            last_confirmed_state: state.last_confirmed_state,
            debounce_pending: self
                .debounce
                .as_ref()
                .is_some_and(|debounce| debounce.scheduler.is_pending()),
        }
    }

    /// Returns the event counters.
    pub fn stats(&self) -> EdgeStats {
        self.state.lock().stats
    }

    /// Returns the hardware fault that stopped this machine, if any.
    pub fn fault(&self) -> Option<CounterError> {
        self.state.lock().fault.clone()
    }

    fn expire(machine: Weak<Self>) {
        let Some(machine) = machine.upgrade() else {
            return;
        };
        if let Err(e) = machine.on_debounce_expiry() {
            error!("Debounce check on {} failed: {}", machine.line(), e);
        }
    }

    fn ensure_healthy(&self, state: &EdgeState) -> CounterResult<()> {
        match state.fault {
            Some(_) => Err(CounterError::Faulted { line: self.line() }),
            None => Ok(()),
        }
    }

    fn sample(&self, state: &mut EdgeState) -> CounterResult<bool> {
        self.reader.sample().map_err(|e| {
            error!("Sampling {} failed, counter faulted: {}", self.line(), e);
            state.fault = Some(e.clone());
            e
        })
    }

    fn confirm(&self, state: &mut EdgeState, new_state: bool) -> bool {
        let rising = new_state && !state.last_confirmed_state;
        if rising {
            let count = self.store.increment();
            debug!("{} rising edge confirmed, count {}", self.line(), count);
        }
        state.last_confirmed_state = new_state;
        state.stats.confirmations += 1;
        rising
    }
}
