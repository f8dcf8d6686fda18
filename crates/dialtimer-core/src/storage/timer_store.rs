//! Save-on-transition persistence of the live timer and its history.
//!
//! The engine never writes anything itself. The host drains the session's
//! events and hands each one to [`TimerStore::record`], which decides what to
//! write. Unreadable data is logged and treated as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::KeyValueStore;
use crate::error::Result;
use crate::events::Event;
use crate::timer::Timer;

pub const TIMER_KEY: &str = "current_timer";
pub const HISTORY_KEY: &str = "timer_history";

/// Immutable copy of a finished or abandoned run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedTimer {
    pub id: Uuid,
    pub archived_at: DateTime<Utc>,
    pub timer: Timer,
}

impl ArchivedTimer {
    pub fn new(timer: Timer, archived_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            archived_at,
            timer,
        }
    }
}

pub struct TimerStore<S> {
    store: S,
}

impl<S: KeyValueStore> TimerStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// The saved live timer, if there is a readable one.
    pub fn load_timer(&self) -> Option<Timer> {
        let json = match self.store.get(TIMER_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read saved timer");
                return None;
            }
        };
        match serde_json::from_str::<Timer>(&json) {
            Ok(timer) => Some(timer),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable saved timer");
                None
            }
        }
    }

    pub fn save_timer(&self, timer: &Timer) -> Result<()> {
        let json = serde_json::to_string(timer)?;
        self.store.set(TIMER_KEY, &json)
    }

    /// Archived runs, oldest first. Unreadable history reads as empty.
    pub fn load_history(&self) -> Vec<ArchivedTimer> {
        let json = match self.store.get(HISTORY_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read timer history");
                return Vec::new();
            }
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable timer history");
            Vec::new()
        })
    }

    pub fn append_history(&self, entry: ArchivedTimer) -> Result<()> {
        let mut history = self.load_history();
        history.push(entry);
        self.write_history(&history)
    }

    /// Returns whether an entry with `id` existed.
    pub fn remove_from_history(&self, id: Uuid) -> Result<bool> {
        let mut history = self.load_history();
        let before = history.len();
        history.retain(|entry| entry.id != id);
        if history.len() == before {
            return Ok(false);
        }
        self.write_history(&history)?;
        Ok(true)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.store.remove(HISTORY_KEY)
    }

    /// Persist whatever `event` changed. `timer` is the live timer after the
    /// transition.
    pub fn record(&self, event: &Event, timer: &Timer) -> Result<()> {
        match event {
            Event::TimerArchived { entry } => {
                tracing::debug!(id = %entry.id, "archiving timer");
                self.append_history(entry.clone())
            }
            other => {
                tracing::debug!(event = other.kind(), "saving timer");
                self.save_timer(timer)
            }
        }
    }

    fn write_history(&self, history: &[ArchivedTimer]) -> Result<()> {
        if history.is_empty() {
            return self.store.remove(HISTORY_KEY);
        }
        let json = serde_json::to_string(history)?;
        self.store.set(HISTORY_KEY, &json)
    }
}
