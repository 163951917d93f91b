//! Expiry alerts.
//!
//! The alert is a fixed three-pulse chime described as data
//! ([`AlertPattern`]) and rendered by whatever [`AlertSink`] the host
//! provides. The generator behind it is created lazily on the first
//! start press, because audio backends typically require a user gesture
//! before they may produce sound. A widget that expires without ever
//! having been started stays silent.
//!
//! Playback failures are swallowed: an inaudible alert must never take
//! the timer down with it.

use tracing::{debug, warn};

use crate::error::PlaybackError;

/// One tone within an alert pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPulse {
    /// Start offset from the beginning of the pattern.
    pub offset_ms: u32,
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

/// A schedule of tones with an amplitude envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPattern {
    pub pulses: Vec<AlertPulse>,
    /// Initial gain of each pulse.
    pub gain: f32,
    /// Gain each pulse decays to by its end.
    pub gain_floor: f32,
}

impl AlertPattern {
    /// The time-up chime: two short beeps and a longer, higher third.
    pub fn time_up() -> Self {
        Self {
            pulses: vec![
                AlertPulse {
                    offset_ms: 0,
                    frequency_hz: 880,
                    duration_ms: 150,
                },
                AlertPulse {
                    offset_ms: 200,
                    frequency_hz: 880,
                    duration_ms: 150,
                },
                AlertPulse {
                    offset_ms: 400,
                    frequency_hz: 1100,
                    duration_ms: 300,
                },
            ],
            gain: 0.3,
            gain_floor: 0.01,
        }
    }

    /// Total pattern length from first offset to last pulse end.
    pub fn total_ms(&self) -> u32 {
        self.pulses
            .iter()
            .map(|p| p.offset_ms + p.duration_ms)
            .max()
            .unwrap_or(0)
    }
}

/// Renders an [`AlertPattern`] on some output device.
pub trait AlertSink {
    fn play(&mut self, pattern: &AlertPattern) -> Result<(), PlaybackError>;
}

pub type BoxedAlertSink = Box<dyn AlertSink + Send>;

/// Builds a sink on demand. Returning `None` means no audio backend is
/// available; the generator stays disarmed.
pub type AlertSinkFactory = Box<dyn Fn() -> Option<BoxedAlertSink> + Send>;

/// Lazily-armed alert playback for one widget.
pub struct AlertGenerator {
    factory: Option<AlertSinkFactory>,
    sink: Option<BoxedAlertSink>,
    pattern: AlertPattern,
}

impl AlertGenerator {
    pub fn new(factory: AlertSinkFactory) -> Self {
        Self {
            factory: Some(factory),
            sink: None,
            pattern: AlertPattern::time_up(),
        }
    }

    /// A generator that never produces sound (muted widgets).
    pub fn disabled() -> Self {
        Self {
            factory: None,
            sink: None,
            pattern: AlertPattern::time_up(),
        }
    }

    /// Create the sink if it does not exist yet. Called from the start
    /// path, which is always a user gesture. Idempotent.
    pub fn arm(&mut self) {
        if self.sink.is_some() {
            return;
        }
        if let Some(factory) = &self.factory {
            self.sink = factory();
            debug!(armed = self.sink.is_some(), "alert generator armed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.sink.is_some()
    }

    /// Play the time-up pattern. Returns whether it was audibly played.
    /// Failures are logged and swallowed.
    pub fn signal_expiry(&mut self) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.play(&self.pattern) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "alert playback failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for AlertGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertGenerator")
            .field("armed", &self.sink.is_some())
            .field("pattern", &self.pattern)
            .finish()
    }
}
