//! Tick sources.
//!
//! A [`Clock`] delivers 1 Hz ticks to subscribed sinks. The timer machine
//! does not own a thread; it subscribes on start and cancels the returned
//! [`TickHandle`] on stop, so a stopped timer consumes no clock resources.
//!
//! Two implementations:
//!
//! - [`SystemClock`]: one pump thread per subscription that sleeps the
//!   tick period and invokes the sink, until the handle is cancelled.
//! - [`ManualClock`]: no threads. Tests call [`ManualClock::advance`] to
//!   fire an exact number of ticks deterministically.
//!
//! Sinks only send messages toward the owning loop; all timer mutation
//! happens there, never on the pump thread itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

/// The tick period. All timers advance in whole seconds.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Callback invoked once per tick.
pub type TickSink = Box<dyn FnMut() + Send>;

/// A source of periodic ticks.
pub trait Clock: Send + Sync {
    /// Subscribe a sink. Ticks arrive until the returned handle is
    /// cancelled or dropped.
    fn subscribe(&self, sink: TickSink) -> TickHandle;
}

/// Cancellation handle for a tick subscription.
///
/// Cancelling is idempotent. Dropping the handle cancels the
/// subscription, so losing the handle can never leak a ticking sink.
#[derive(Debug)]
pub struct TickHandle {
    cancelled: Arc<AtomicBool>,
}

impl TickHandle {
    fn new() -> (Self, Arc<AtomicBool>) {
        let cancelled = Arc::new(AtomicBool::new(false));
        (
            Self {
                cancelled: Arc::clone(&cancelled),
            },
            cancelled,
        )
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── System clock ─────────────────────────────────────────────────────

/// Wall-clock tick source backed by a pump thread per subscription.
///
/// The pump sleeps the tick period, checks the cancel flag, then invokes
/// the sink. Cancellation is therefore observed within one period, and a
/// cancelled subscription never fires again.
#[derive(Debug, Default)]
pub struct SystemClock {
    period: Option<Duration>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { period: None }
    }

    /// Override the tick period. Intended for fast end-to-end tests.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period: Some(period),
        }
    }
}

impl Clock for SystemClock {
    fn subscribe(&self, mut sink: TickSink) -> TickHandle {
        let (handle, cancelled) = TickHandle::new();
        let period = self.period.unwrap_or(TICK_PERIOD);
        let result = std::thread::Builder::new()
            .name("pintimer-tick".into())
            .spawn(move || {
                loop {
                    std::thread::sleep(period);
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    sink();
                }
                trace!("tick pump exited");
            });
        if let Err(e) = result {
            // Out of threads: cancel immediately so callers observe a
            // dead subscription rather than a silent one.
            trace!(error = %e, "failed to spawn tick pump");
            handle.cancel();
        }
        handle
    }
}

// ── Manual clock ─────────────────────────────────────────────────────

struct ManualSub {
    sink: TickSink,
    cancelled: Arc<AtomicBool>,
}

/// Deterministic tick source driven by [`advance`](ManualClock::advance).
///
/// Subscriptions added while a tick is being delivered first fire on the
/// following tick.
#[derive(Default)]
pub struct ManualClock {
    subs: Mutex<Vec<ManualSub>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `ticks` ticks into every live subscription, in subscription
    /// order.
    pub fn advance(&self, ticks: u32) {
        for _ in 0..ticks {
            // Take the list out of the lock so a sink may subscribe
            // re-entrantly during delivery.
            let mut live = match self.subs.lock() {
                Ok(mut guard) => std::mem::take(&mut *guard),
                Err(_) => return,
            };
            for sub in &mut live {
                if !sub.cancelled.load(Ordering::SeqCst) {
                    (sub.sink)();
                }
            }
            live.retain(|s| !s.cancelled.load(Ordering::SeqCst));
            if let Ok(mut guard) = self.subs.lock() {
                let added = std::mem::take(&mut *guard);
                *guard = live;
                guard.extend(added);
            }
        }
    }

    /// Number of live (not yet cancelled) subscriptions.
    pub fn live_subscriptions(&self) -> usize {
        match self.subs.lock() {
            Ok(subs) => subs
                .iter()
                .filter(|s| !s.cancelled.load(Ordering::SeqCst))
                .count(),
            Err(_) => 0,
        }
    }
}

impl Clock for ManualClock {
    fn subscribe(&self, sink: TickSink) -> TickHandle {
        let (handle, cancelled) = TickHandle::new();
        if let Ok(mut subs) = self.subs.lock() {
            subs.push(ManualSub { sink, cancelled });
        }
        handle
    }
}
