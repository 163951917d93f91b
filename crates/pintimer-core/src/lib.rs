//! # Pintimer Core Library
//!
//! Core logic for Pintimer: small on-screen timer widgets that can
//! relocate themselves onto an always-on-top pinned surface and back
//! without losing timing state or input bindings. Front-ends implement
//! the host traits; all behavior lives here and is testable against an
//! in-memory host.
//!
//! ## Architecture
//!
//! - **Clock**: 1 Hz tick sources; the timer machine owns a cancellable
//!   subscription handle, never a thread
//! - **Timer Machine**: countdown/count-up state machine with expiry
//!   detection and clamped manual adjustment
//! - **Alert**: a fixed three-pulse chime, lazily armed on the first
//!   start press, silent on any failure
//! - **Surface**: widget nodes, size classes, drag clamping and themes
//! - **Relocation**: the pin/restore protocol that moves nodes and input
//!   bindings between the primary and a pinned context
//!
//! ## Key Components
//!
//! - [`TimerWidget`]: one live widget instance record
//! - [`TimerMachine`]: the tick-driven state machine
//! - [`SurfaceHost`] / [`InputRouter`]: the traits a front-end implements
//! - [`SurfaceBinding`]: which context owns nodes and bindings

pub mod alert;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod relocate;
pub mod surface;
pub mod timer;
pub mod widget;

pub use alert::{
    AlertGenerator, AlertPattern, AlertPulse, AlertSink, AlertSinkFactory, BoxedAlertSink,
};
pub use clock::{Clock, ManualClock, SystemClock, TickHandle, TickSink, TICK_PERIOD};
pub use config::{CreationRequest, LaunchParams, TimerConfig, TimerMode, DEFAULT_COUNTDOWN_SECS};
pub use error::{CoreError, PlaybackError, RelocateError, RequestError};
pub use events::WidgetEvent;
pub use host::{ContextId, InputRouter, SubscriptionId, SurfaceHost, SurfaceLocation};
pub use relocate::SurfaceBinding;
pub use surface::{
    staggered_origin, ControlId, Extent, Position, SizeClass, Theme, WidgetNodes, PINNED_EXTENT,
};
pub use timer::{RunState, TickOutcome, TimerMachine};
pub use widget::{TickNotifier, TimerWidget, WidgetId, WidgetOptions, ADJUST_STEP_SECS};
