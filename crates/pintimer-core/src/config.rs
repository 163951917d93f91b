//! Timer configuration and creation requests.
//!
//! Two entry paths produce a [`TimerConfig`]:
//!
//! - [`CreationRequest`]: a structured request (e.g. from an `add` command
//!   or an IPC message). Validated strictly; a zero-duration countdown is
//!   rejected at this layer.
//! - [`LaunchParams`]: raw launch parameters as strings. Resolved
//!   permissively with fallbacks, mirroring how a standalone widget window
//!   reads its query string: anything unparsable becomes the default.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Default duration for a countdown created without an explicit value.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Countdown,
    Countup,
}

impl TimerMode {
    /// Parse a mode string. Unknown strings are an error; callers decide
    /// whether that means reject (requests) or default (launch params).
    pub fn parse(s: &str) -> Result<Self, RequestError> {
        match s {
            "countdown" => Ok(TimerMode::Countdown),
            "countup" => Ok(TimerMode::Countup),
            other => Err(RequestError::InvalidMode(other.to_string())),
        }
    }
}

/// Validated configuration for a single timer widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub mode: TimerMode,
    /// Initial value in seconds. The countdown starting point, or the
    /// count-up baseline (normally 0).
    pub initial_seconds: u32,
}

impl TimerConfig {
    pub fn countdown(seconds: u32) -> Self {
        Self {
            mode: TimerMode::Countdown,
            initial_seconds: seconds,
        }
    }

    pub fn countup() -> Self {
        Self {
            mode: TimerMode::Countup,
            initial_seconds: 0,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::countdown(DEFAULT_COUNTDOWN_SECS)
    }
}

/// A structured request to create a timer widget.
///
/// This is the strict path: values are typed and validated, and a
/// countdown with zero seconds is refused instead of silently defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationRequest {
    pub mode: TimerMode,
    /// Requested duration in seconds. `None` means the mode default.
    #[serde(default)]
    pub seconds: Option<u32>,
}

impl CreationRequest {
    pub fn validate(&self) -> Result<TimerConfig, RequestError> {
        match self.mode {
            TimerMode::Countdown => {
                let seconds = self.seconds.unwrap_or(DEFAULT_COUNTDOWN_SECS);
                if seconds == 0 {
                    return Err(RequestError::ZeroCountdown);
                }
                Ok(TimerConfig::countdown(seconds))
            }
            TimerMode::Countup => Ok(TimerConfig::countup()),
        }
    }
}

/// Raw launch parameters for a widget, before resolution.
///
/// Both fields arrive as optional strings; [`resolve`](Self::resolve)
/// never fails. Invalid modes fall back to countdown and invalid or zero
/// seconds fall back to [`DEFAULT_COUNTDOWN_SECS`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchParams {
    #[serde(default, rename = "type")]
    pub mode: Option<String>,
    #[serde(default)]
    pub seconds: Option<String>,
}

impl LaunchParams {
    pub fn resolve(&self) -> TimerConfig {
        let mode = self
            .mode
            .as_deref()
            .and_then(|s| TimerMode::parse(s).ok())
            .unwrap_or(TimerMode::Countdown);
        match mode {
            TimerMode::Countdown => {
                let seconds = self
                    .seconds
                    .as_deref()
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .filter(|&s| s > 0)
                    .unwrap_or(DEFAULT_COUNTDOWN_SECS);
                TimerConfig::countdown(seconds)
            }
            TimerMode::Countup => TimerConfig::countup(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_countdown_seconds() {
        let req = CreationRequest {
            mode: TimerMode::Countdown,
            seconds: None,
        };
        let config = req.validate().unwrap();
        assert_eq!(config.initial_seconds, DEFAULT_COUNTDOWN_SECS);
    }

    #[test]
    fn request_rejects_zero_countdown() {
        let req = CreationRequest {
            mode: TimerMode::Countdown,
            seconds: Some(0),
        };
        assert_eq!(req.validate(), Err(RequestError::ZeroCountdown));
    }

    #[test]
    fn request_countup_ignores_seconds() {
        let req = CreationRequest {
            mode: TimerMode::Countup,
            seconds: Some(500),
        };
        let config = req.validate().unwrap();
        assert_eq!(config.mode, TimerMode::Countup);
        assert_eq!(config.initial_seconds, 0);
    }

    #[test]
    fn params_resolve_defaults() {
        let config = LaunchParams::default().resolve();
        assert_eq!(config.mode, TimerMode::Countdown);
        assert_eq!(config.initial_seconds, 180);
    }

    #[test]
    fn params_invalid_mode_falls_back_to_countdown() {
        let params = LaunchParams {
            mode: Some("stopwatch".into()),
            seconds: Some("60".into()),
        };
        let config = params.resolve();
        assert_eq!(config.mode, TimerMode::Countdown);
        assert_eq!(config.initial_seconds, 60);
    }

    #[test]
    fn params_unparsable_seconds_fall_back() {
        for raw in ["abc", "-5", "", "0"] {
            let params = LaunchParams {
                mode: Some("countdown".into()),
                seconds: Some(raw.into()),
            };
            assert_eq!(params.resolve().initial_seconds, DEFAULT_COUNTDOWN_SECS);
        }
    }

    #[test]
    fn params_countup_ignores_seconds() {
        let params = LaunchParams {
            mode: Some("countup".into()),
            seconds: Some("999".into()),
        };
        let config = params.resolve();
        assert_eq!(config.mode, TimerMode::Countup);
        assert_eq!(config.initial_seconds, 0);
    }

    #[test]
    fn mode_serde_round_trip() {
        let json = serde_json::to_string(&TimerMode::Countdown).unwrap();
        assert_eq!(json, "\"countdown\"");
        let back: TimerMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TimerMode::Countdown);
    }
}
