//! Timer state machine.
//!
//! One [`TimerMachine`] per widget. The machine owns no thread; it
//! subscribes to a [`Clock`](crate::clock::Clock) on start and holds the
//! [`TickHandle`] so that its run state and its tick subscription can
//! never disagree. Stop, reset and expiry all cancel the handle.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Idle | Expired)
//! Expired -> Idle (reset, or adjust above zero)
//! ```
//!
//! All values are whole seconds and clamp at zero. Countdown reaching
//! zero on a tick is the only expiry path that reports [`TickOutcome::Expired`];
//! a manual adjustment down to zero moves to `Expired` without it, which
//! is what keeps the alert silent for manual edits.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, TickHandle, TickSink};
use crate::config::{TimerConfig, TimerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    /// Countdown reached zero. Start is refused until the value is
    /// raised above zero or the timer is reset.
    Expired,
}

/// Outcome of delivering one tick to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The value advanced and the timer keeps running.
    Continued,
    /// A countdown reached zero on this tick. The subscription has been
    /// cancelled; the caller decides whether to sound the alert.
    Expired,
    /// The machine was not running. Stale ticks land here.
    Ignored,
}

/// Core timer state machine for one widget.
#[derive(Debug)]
pub struct TimerMachine {
    config: TimerConfig,
    /// Current value in seconds. Never negative.
    value: u32,
    run_state: RunState,
    tick_handle: Option<TickHandle>,
}

impl TimerMachine {
    /// Create a machine from a config.
    ///
    /// A countdown configured with zero seconds begins in `Expired`, so
    /// the first render already shows the time-up face.
    pub fn new(config: TimerConfig) -> Self {
        let value = config.initial_seconds;
        let run_state = Self::rest_state(config.mode, value);
        Self {
            config,
            value,
            run_state,
            tick_handle: None,
        }
    }

    fn rest_state(mode: TimerMode, value: u32) -> RunState {
        if mode == TimerMode::Countdown && value == 0 {
            RunState::Expired
        } else {
            RunState::Idle
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn mode(&self) -> TimerMode {
        self.config.mode
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// `MM:SS`. Minutes widen past two digits rather than wrap.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.value / 60, self.value % 60)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start ticking. Returns whether the machine actually started.
    ///
    /// Refused while already running, and refused for a countdown whose
    /// value is zero (there is nothing left to count).
    pub fn start(&mut self, clock: &dyn Clock, sink: TickSink) -> bool {
        if self.run_state == RunState::Running {
            return false;
        }
        if self.config.mode == TimerMode::Countdown && self.value == 0 {
            return false;
        }
        self.tick_handle = Some(clock.subscribe(sink));
        self.run_state = RunState::Running;
        debug!(value = self.value, mode = ?self.config.mode, "timer started");
        true
    }

    /// Stop ticking, keeping the current value. Returns whether the
    /// machine was running.
    pub fn stop(&mut self) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        self.tick_handle = None;
        self.run_state = RunState::Idle;
        debug!(value = self.value, "timer stopped");
        true
    }

    /// Stop and restore the initial value.
    pub fn reset(&mut self) {
        self.tick_handle = None;
        self.value = self.config.initial_seconds;
        self.run_state = Self::rest_state(self.config.mode, self.value);
        debug!(value = self.value, "timer reset");
    }

    /// Shift the value by `delta` seconds, clamping at zero.
    ///
    /// Works in every state and keeps a running timer running. A
    /// countdown adjusted down to zero while not running lands in
    /// `Expired` silently; adjusted above zero while `Expired` it
    /// returns to `Idle` and can start again.
    pub fn adjust(&mut self, delta: i64) {
        let shifted = i64::from(self.value).saturating_add(delta);
        self.value = u32::try_from(shifted.max(0)).unwrap_or(u32::MAX);
        if self.run_state != RunState::Running {
            self.run_state = Self::rest_state(self.config.mode, self.value);
        }
        debug!(delta, value = self.value, "timer adjusted");
    }

    /// Deliver one tick.
    ///
    /// Countdowns decrement and expire at zero; count-ups increment
    /// without bound. Ticks arriving while not running are ignored, so a
    /// tick already in flight when the timer stops cannot corrupt the
    /// value.
    pub fn on_tick(&mut self) -> TickOutcome {
        if self.run_state != RunState::Running {
            return TickOutcome::Ignored;
        }
        match self.config.mode {
            TimerMode::Countdown => {
                self.value = self.value.saturating_sub(1);
                if self.value == 0 {
                    self.tick_handle = None;
                    self.run_state = RunState::Expired;
                    debug!("countdown expired");
                    return TickOutcome::Expired;
                }
                TickOutcome::Continued
            }
            TimerMode::Countup => {
                self.value = self.value.saturating_add(1);
                TickOutcome::Continued
            }
        }
    }
}
