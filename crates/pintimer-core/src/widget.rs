//! The timer widget instance record.
//!
//! One [`TimerWidget`] owns everything belonging to one on-screen timer:
//! the state machine, the alert generator, the surface binding and a
//! handle to the clock. Every operation is an explicit method taking the
//! host; no state hides in closures. The host resolves input back to
//! [`press`](TimerWidget::press) and tick notifications back to
//! [`on_tick`](TimerWidget::on_tick), always on the owning loop.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::alert::AlertGenerator;
use crate::clock::{Clock, TickSink};
use crate::config::{TimerConfig, TimerMode};
use crate::error::RelocateError;
use crate::events::WidgetEvent;
use crate::host::{ContextId, InputRouter, SurfaceHost, SurfaceLocation};
use crate::relocate::SurfaceBinding;
use crate::surface::{staggered_origin, ControlId, Position, SizeClass, Theme, WidgetNodes};
use crate::timer::{RunState, TickOutcome, TimerMachine};

/// Seconds moved per adjust press.
pub const ADJUST_STEP_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetId(Uuid);

impl WidgetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Ticks are delivered as messages: the clock pump calls the notifier
/// with the widget id, and the owning loop routes it back into
/// [`TimerWidget::on_tick`].
pub type TickNotifier = Arc<dyn Fn(WidgetId) + Send + Sync>;

/// Per-widget settings fixed at open time.
pub struct WidgetOptions {
    pub alert: AlertGenerator,
    /// Attempt relocation onto a pinned surface on the first successful
    /// start. Attempted at most once per widget.
    pub auto_pin: bool,
    pub theme: Theme,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            alert: AlertGenerator::disabled(),
            auto_pin: true,
            theme: Theme::default(),
        }
    }
}

/// One live timer widget.
pub struct TimerWidget {
    id: WidgetId,
    machine: TimerMachine,
    alert: AlertGenerator,
    binding: SurfaceBinding,
    theme: Theme,
    clock: Arc<dyn Clock>,
    notifier: TickNotifier,
    auto_pin: bool,
    auto_pin_attempted: bool,
}

impl TimerWidget {
    /// Create the widget, adopt its nodes at Primary and bind its
    /// controls. `index` staggers the initial placement.
    pub fn open<H: SurfaceHost + InputRouter>(
        config: TimerConfig,
        options: WidgetOptions,
        clock: Arc<dyn Clock>,
        notifier: TickNotifier,
        index: usize,
        host: &mut H,
    ) -> Self {
        let id = WidgetId::new();
        let machine = TimerMachine::new(config);
        let mut nodes = WidgetNodes::new(staggered_origin(index));
        nodes.set_display(&machine.display());
        nodes.set_expired(machine.run_state() == RunState::Expired);
        if let Err(e) = host.adopt_nodes(id, SurfaceLocation::Primary, nodes) {
            warn!(error = %e, "primary adoption reported failure at open");
        }
        let binding = SurfaceBinding::bind_primary(id, host);
        debug!(%id, ?config, "widget opened");
        Self {
            id,
            machine,
            alert: options.alert,
            binding,
            theme: options.theme,
            clock,
            notifier,
            auto_pin: options.auto_pin,
            auto_pin_attempted: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn value(&self) -> u32 {
        self.machine.value()
    }

    pub fn run_state(&self) -> RunState {
        self.machine.run_state()
    }

    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    pub fn mode(&self) -> TimerMode {
        self.machine.mode()
    }

    pub fn display(&self) -> String {
        self.machine.display()
    }

    pub fn is_pinned(&self) -> bool {
        self.binding.is_pinned()
    }

    pub fn pinned_context(&self) -> Option<ContextId> {
        self.binding.pinned_context()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Handle a control press routed back by the host.
    pub fn press<H: SurfaceHost + InputRouter>(
        &mut self,
        control: ControlId,
        host: &mut H,
    ) -> Vec<WidgetEvent> {
        let mut events = Vec::new();
        match control {
            ControlId::StartStop => {
                if self.machine.is_running() {
                    self.machine.stop();
                    events.push(WidgetEvent::Stopped {
                        value: self.machine.value(),
                        at: Utc::now(),
                    });
                } else {
                    let sink = self.tick_sink();
                    if self.machine.start(self.clock.as_ref(), sink) {
                        // A successful start press is the user gesture
                        // the audio backend needs.
                        self.alert.arm();
                        events.push(WidgetEvent::Started {
                            mode: self.machine.mode(),
                            value: self.machine.value(),
                            at: Utc::now(),
                        });
                        events.extend(self.maybe_auto_pin(host));
                    }
                    // A zero countdown refuses to start, silently.
                }
            }
            ControlId::Reset => {
                self.machine.reset();
                events.push(WidgetEvent::Reset {
                    value: self.machine.value(),
                    at: Utc::now(),
                });
            }
            ControlId::AdjustPlus => {
                self.machine.adjust(ADJUST_STEP_SECS);
                events.push(WidgetEvent::Adjusted {
                    delta: ADJUST_STEP_SECS,
                    value: self.machine.value(),
                    at: Utc::now(),
                });
            }
            ControlId::AdjustMinus => {
                self.machine.adjust(-ADJUST_STEP_SECS);
                events.push(WidgetEvent::Adjusted {
                    delta: -ADJUST_STEP_SECS,
                    value: self.machine.value(),
                    at: Utc::now(),
                });
            }
            ControlId::SizeSmall => events.extend(self.set_size(SizeClass::Small, host)),
            ControlId::SizeMedium => events.extend(self.set_size(SizeClass::Medium, host)),
            ControlId::SizeLarge => events.extend(self.set_size(SizeClass::Large, host)),
            ControlId::Pin => events.extend(self.toggle_pin(host)),
            ControlId::Close => events.extend(self.close(host)),
            ControlId::Header => {
                // Drag gestures arrive through `drag`; a bare press on
                // the header does nothing.
            }
        }
        self.render(host);
        events
    }

    /// Handle one tick notification for this widget.
    pub fn on_tick<H: SurfaceHost + InputRouter>(&mut self, host: &mut H) -> Vec<WidgetEvent> {
        match self.machine.on_tick() {
            TickOutcome::Continued => {
                self.render(host);
                Vec::new()
            }
            TickOutcome::Expired => {
                self.render(host);
                let alerted = self.alert.signal_expiry();
                vec![WidgetEvent::Expired {
                    alerted,
                    at: Utc::now(),
                }]
            }
            TickOutcome::Ignored => Vec::new(),
        }
    }

    /// Move the widget on the primary surface, clamped to the viewport.
    /// Ignored while pinned; a pinned context is positioned by the host,
    /// not by content drags.
    pub fn drag<H: SurfaceHost + InputRouter>(&mut self, target: Position, host: &mut H) {
        if self.binding.is_pinned() {
            return;
        }
        let viewport = host.primary_viewport();
        if let Some(nodes) = host.nodes_mut(self.id) {
            nodes.drag_to(target, viewport);
        }
    }

    /// Pin if on Primary, restore if pinned.
    pub fn toggle_pin<H: SurfaceHost + InputRouter>(&mut self, host: &mut H) -> Vec<WidgetEvent> {
        if let Some(context) = self.binding.pinned_context() {
            host.close_pinned(context);
            return self.on_pinned_closed(context, host);
        }
        match self.binding.relocate_to_pinned(self.id, &self.theme, host) {
            Ok(context) => {
                debug!(%self.id, ?context, "widget pinned");
                vec![WidgetEvent::Pinned { at: Utc::now() }]
            }
            Err(RelocateError::CapabilityUnavailable) => {
                debug!(%self.id, "pinned surface unavailable; staying on primary");
                Vec::new()
            }
            Err(e) => {
                warn!(%self.id, error = %e, "relocation failed; staying on primary");
                Vec::new()
            }
        }
    }

    /// Handle the teardown signal of a pinned context. Safe to call any
    /// number of times; only the first matching call restores.
    pub fn on_pinned_closed<H: SurfaceHost + InputRouter>(
        &mut self,
        context: ContextId,
        host: &mut H,
    ) -> Vec<WidgetEvent> {
        if self.binding.on_pinned_closed(self.id, context, host) {
            self.render(host);
            vec![WidgetEvent::Restored { at: Utc::now() }]
        } else {
            Vec::new()
        }
    }

    /// Close the widget: cancel its tick subscription and release every
    /// host-side resource. The owner drops the record after this.
    pub fn close<H: SurfaceHost + InputRouter>(&mut self, host: &mut H) -> Vec<WidgetEvent> {
        self.machine.stop();
        self.binding.teardown(self.id, host);
        debug!(%self.id, "widget closed");
        vec![WidgetEvent::Closed { at: Utc::now() }]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn tick_sink(&self) -> TickSink {
        let notifier = Arc::clone(&self.notifier);
        let id = self.id;
        Box::new(move || notifier(id))
    }

    fn maybe_auto_pin<H: SurfaceHost + InputRouter>(&mut self, host: &mut H) -> Vec<WidgetEvent> {
        if !self.auto_pin || self.auto_pin_attempted {
            return Vec::new();
        }
        self.auto_pin_attempted = true;
        if !host.pinned_capability() || self.binding.is_pinned() {
            return Vec::new();
        }
        match self.binding.relocate_to_pinned(self.id, &self.theme, host) {
            Ok(context) => {
                debug!(%self.id, ?context, "widget auto-pinned on first start");
                vec![WidgetEvent::Pinned { at: Utc::now() }]
            }
            Err(e) => {
                debug!(%self.id, error = %e, "automatic pin skipped");
                Vec::new()
            }
        }
    }

    fn set_size<H: SurfaceHost + InputRouter>(
        &mut self,
        size: SizeClass,
        host: &mut H,
    ) -> Vec<WidgetEvent> {
        // Cosmetic only: timer state stays untouched.
        match host.nodes_mut(self.id) {
            Some(nodes) if nodes.size != size => {
                nodes.set_size(size);
                vec![WidgetEvent::SizeChanged {
                    size,
                    at: Utc::now(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn render<H: SurfaceHost + InputRouter>(&self, host: &mut H) {
        let display = self.machine.display();
        let running = self.machine.is_running();
        let expired = self.machine.run_state() == RunState::Expired;
        if let Some(nodes) = host.nodes_mut(self.id) {
            nodes.set_display(&display);
            nodes.set_running(running);
            nodes.set_expired(expired);
        }
    }
}
