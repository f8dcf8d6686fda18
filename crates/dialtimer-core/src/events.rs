use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ArchivedTimer;

/// Every state change in the system produces an Event.
/// The host drains them each frame; the persistence observer writes on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        name: String,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero on its own.
    TimerExpired {
        name: String,
        total_duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// The user marked the task done, independent of expiry.
    TaskCompleted {
        name: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerRenamed {
        name: String,
        description: String,
        at: DateTime<Utc>,
    },
    /// A dial drag ended and the duration was quantized.
    DurationSet {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerArchived {
        entry: ArchivedTimer,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerExpired { .. } => "timer_expired",
            Event::TimerReset { .. } => "timer_reset",
            Event::TaskCompleted { .. } => "task_completed",
            Event::TimerRenamed { .. } => "timer_renamed",
            Event::DurationSet { .. } => "duration_set",
            Event::TimerArchived { .. } => "timer_archived",
        }
    }
}

/// Convert epoch milliseconds to a UTC timestamp for event payloads.
pub(crate) fn timestamp(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}
