use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimerMode;
use crate::surface::SizeClass;

/// Every observable widget state change produces an event. Front-ends
/// render them; the `wait` command streams them as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetEvent {
    Started {
        mode: TimerMode,
        value: u32,
        at: DateTime<Utc>,
    },
    Stopped {
        value: u32,
        at: DateTime<Utc>,
    },
    Reset {
        value: u32,
        at: DateTime<Utc>,
    },
    Adjusted {
        delta: i64,
        value: u32,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero on a tick. `alerted` records whether the
    /// chime actually sounded.
    Expired {
        alerted: bool,
        at: DateTime<Utc>,
    },
    SizeChanged {
        size: SizeClass,
        at: DateTime<Utc>,
    },
    /// The widget moved onto a pinned surface.
    Pinned {
        at: DateTime<Utc>,
    },
    /// The widget returned to the primary surface.
    Restored {
        at: DateTime<Utc>,
    },
    Closed {
        at: DateTime<Utc>,
    },
}
