//! Core error types for pintimer-core.
//!
//! This module defines the error hierarchy using thiserror. Relocation
//! errors deserve their own enum because every failure mode maps to a
//! specific recovery step in the pin/restore protocol.

use thiserror::Error;

/// Core error type for pintimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Surface relocation errors
    #[error("Relocation error: {0}")]
    Relocate(#[from] RelocateError),

    /// Creation request validation errors
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised while moving a widget between surfaces.
///
/// Every variant leaves the widget fully operational on the surface it
/// was on when the operation began.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelocateError {
    /// The host cannot provide a pinned surface at all.
    #[error("Pinned surface capability is unavailable on this host")]
    CapabilityUnavailable,

    /// The host refused or failed the pinned surface request.
    #[error("Pinned surface request failed: {0}")]
    SurfaceRequest(String),

    /// The widget's nodes could not be detached from their current surface.
    #[error("Widget nodes unavailable on {surface}")]
    NodesUnavailable { surface: &'static str },

    /// The widget is already on a pinned surface.
    #[error("Widget is already pinned")]
    AlreadyPinned,
}

/// Errors raised while validating a timer creation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// A countdown cannot be created with zero duration.
    #[error("Countdown duration must be greater than zero")]
    ZeroCountdown,

    /// Seconds value outside the accepted range.
    #[error("Invalid seconds value: {0}")]
    InvalidSeconds(String),

    /// Unknown timer mode string.
    #[error("Invalid timer mode: {0}")]
    InvalidMode(String),
}

/// Errors raised by alert playback backends.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The output device rejected or dropped the pattern.
    #[error("Alert output failed: {0}")]
    Output(String),

    /// IO error while writing to the output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
