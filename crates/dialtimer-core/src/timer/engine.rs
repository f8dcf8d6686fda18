//! Countdown engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads or accumulate per-frame deltas: every `tick()` recomputes the
//! remaining time from the timestamp taken at the last start/resume, so a
//! suspended tab or a reloaded process never drifts.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Expired)
//! Paused -> Running
//! any -> Idle (reset)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(MAX_TIME_MS);
//! engine.start(1500, "Deep work", clock.now_ms());
//! // Once per frame:
//! engine.tick(clock.now_ms()); // Returns Some(Event) when the countdown expires
//! ```
//!
//! Every command takes the current wall-clock time and returns `None` when
//! its precondition does not hold.

use serde::{Deserialize, Serialize};

use crate::events::{timestamp, Event};

/// Name used when the user never gave one or cleared it.
pub const DEFAULT_TIMER_NAME: &str = "Untitled Timer";

const MAX_NAME_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    /// Countdown reached zero. Terminal until reset.
    Expired,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The live timer record. This is what gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Epoch milliseconds at the last start/resume; 0 when never started.
    #[serde(default)]
    pub started_at_ms: u64,
    /// Duration armed at the last start/resume. Shrinks on every resume.
    #[serde(default)]
    pub armed_duration_ms: u64,
    /// Duration armed at the original start only.
    #[serde(default)]
    pub total_duration_ms: u64,
    #[serde(default)]
    pub remaining_ms: u64,
    #[serde(default)]
    pub run_state: RunState,
    #[serde(default)]
    pub task_complete: bool,
    /// A snapshot of this run is already in history.
    #[serde(default)]
    pub archived: bool,
}

fn default_name() -> String {
    DEFAULT_TIMER_NAME.to_string()
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: String::new(),
            started_at_ms: 0,
            armed_duration_ms: 0,
            total_duration_ms: 0,
            remaining_ms: 0,
            run_state: RunState::Idle,
            task_complete: false,
            archived: false,
        }
    }
}

impl Timer {
    pub fn has_started(&self) -> bool {
        self.started_at_ms != 0
    }
}

/// Read-only view of the timer handed to the renderer each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub name: String,
    pub description: String,
    pub remaining_ms: u64,
    pub total_duration_ms: u64,
    pub run_state: RunState,
    pub task_complete: bool,
    /// 0.0 .. 1.0 share of the original duration already elapsed.
    pub elapsed_ratio: f64,
    /// `HH:MM:SS`
    pub display: String,
}

/// Core countdown engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// The caller is responsible for calling `tick()` at least once per frame.
#[derive(Debug, Clone)]
pub struct CountdownEngine {
    timer: Timer,
    max_time_ms: u64,
}

impl CountdownEngine {
    /// Create an idle engine with nothing on the dial.
    pub fn new(max_time_ms: u64) -> Self {
        Self {
            timer: Timer::default(),
            max_time_ms,
        }
    }

    /// Rebuild an engine from a persisted record.
    ///
    /// Out-of-range values from older or hand-edited data are pulled back
    /// inside the invariants rather than rejected.
    pub fn from_timer(mut timer: Timer, max_time_ms: u64) -> Self {
        timer.remaining_ms = timer.remaining_ms.min(max_time_ms);
        timer.armed_duration_ms = timer.armed_duration_ms.min(max_time_ms);
        timer.total_duration_ms = timer.total_duration_ms.min(max_time_ms);
        if timer.name.trim().is_empty() {
            timer.name = default_name();
        }
        if timer.run_state != RunState::Idle && !timer.has_started() {
            tracing::warn!(state = ?timer.run_state, "saved timer has no start time, resetting to idle");
            timer.run_state = RunState::Idle;
        }
        Self { timer, max_time_ms }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn run_state(&self) -> RunState {
        self.timer.run_state
    }

    pub fn remaining_ms(&self) -> u64 {
        self.timer.remaining_ms
    }

    pub fn total_ms(&self) -> u64 {
        self.timer.total_duration_ms
    }

    pub fn max_time_ms(&self) -> u64 {
        self.max_time_ms
    }

    /// 0.0 .. 1.0 share of the original duration already elapsed.
    pub fn elapsed_ratio(&self) -> f64 {
        let total = self.timer.total_duration_ms;
        if total == 0 {
            return 0.0;
        }
        total.saturating_sub(self.timer.remaining_ms) as f64 / total as f64
    }

    /// The current run has been started and is not in history yet.
    pub fn needs_archive(&self) -> bool {
        self.timer.has_started() && !self.timer.archived
    }

    pub fn mark_archived(&mut self) {
        self.timer.archived = true;
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            name: self.timer.name.clone(),
            description: self.timer.description.clone(),
            remaining_ms: self.timer.remaining_ms,
            total_duration_ms: self.timer.total_duration_ms,
            run_state: self.timer.run_state,
            task_complete: self.timer.task_complete,
            elapsed_ratio: self.elapsed_ratio(),
            display: format_hms(self.timer.remaining_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm and start a countdown of `duration_secs`.
    pub fn start(&mut self, duration_secs: u64, name: &str, now_ms: u64) -> Option<Event> {
        if duration_secs == 0 {
            return None;
        }
        if !name.trim().is_empty() {
            self.timer.name = truncate_name(name);
        }
        self.arm(duration_secs.saturating_mul(1000), now_ms)
    }

    /// Start from whatever duration is currently set on the dial.
    pub fn start_armed(&mut self, now_ms: u64) -> Option<Event> {
        self.arm(self.timer.remaining_ms, now_ms)
    }

    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if self.timer.run_state != RunState::Running {
            return None;
        }
        // Flush elapsed time first.
        if let Some(expired) = self.tick(now_ms) {
            return Some(expired);
        }
        self.timer.run_state = RunState::Paused;
        tracing::debug!(remaining_ms = self.timer.remaining_ms, "timer paused");
        Some(Event::TimerPaused {
            remaining_ms: self.timer.remaining_ms,
            at: timestamp(now_ms),
        })
    }

    pub fn resume(&mut self, now_ms: u64) -> Option<Event> {
        if self.timer.run_state != RunState::Paused || self.timer.task_complete {
            return None;
        }
        self.timer.started_at_ms = now_ms;
        self.timer.armed_duration_ms = self.timer.remaining_ms;
        self.timer.run_state = RunState::Running;
        tracing::debug!(remaining_ms = self.timer.remaining_ms, "timer resumed");
        Some(Event::TimerResumed {
            remaining_ms: self.timer.remaining_ms,
            at: timestamp(now_ms),
        })
    }

    /// Recompute remaining time from the wall clock.
    ///
    /// Returns `Some(Event::TimerExpired)` on the tick that reaches zero.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if self.timer.run_state != RunState::Running {
            return None;
        }
        let elapsed = now_ms.saturating_sub(self.timer.started_at_ms);
        self.timer.remaining_ms = self.timer.armed_duration_ms.saturating_sub(elapsed);
        if self.timer.remaining_ms > 0 {
            return None;
        }
        self.timer.run_state = RunState::Expired;
        tracing::info!(name = %self.timer.name, "timer expired");
        Some(Event::TimerExpired {
            name: self.timer.name.clone(),
            total_duration_ms: self.timer.total_duration_ms,
            at: timestamp(now_ms),
        })
    }

    /// Back to idle. Name and description survive; everything else is cleared.
    ///
    /// Archive first if [`needs_archive`](Self::needs_archive) says so.
    /// Returns `None` when there is nothing to clear.
    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        if self.is_pristine() {
            return None;
        }
        self.timer = Timer {
            name: std::mem::take(&mut self.timer.name),
            description: std::mem::take(&mut self.timer.description),
            ..Timer::default()
        };
        tracing::debug!("timer reset");
        Some(Event::TimerReset {
            at: timestamp(now_ms),
        })
    }

    /// Nudge the dial-set duration. Returns whether anything changed.
    pub fn adjust_remaining(&mut self, delta_ms: i64) -> bool {
        if self.timer.run_state != RunState::Idle {
            return false;
        }
        let before = self.timer.remaining_ms;
        let magnitude = delta_ms.unsigned_abs();
        let adjusted = if delta_ms >= 0 {
            before.saturating_add(magnitude)
        } else {
            before.saturating_sub(magnitude)
        };
        self.timer.remaining_ms = adjusted.min(self.max_time_ms);
        self.timer.remaining_ms != before
    }

    /// Round the dial-set duration to the nearest multiple of `step_ms`.
    pub fn quantize(&mut self, step_ms: u64) -> bool {
        if self.timer.run_state != RunState::Idle || step_ms == 0 {
            return false;
        }
        let before = self.timer.remaining_ms;
        let mut rounded = before.saturating_add(step_ms / 2) / step_ms * step_ms;
        if rounded > self.max_time_ms {
            rounded = self.max_time_ms / step_ms * step_ms;
        }
        self.timer.remaining_ms = rounded;
        rounded != before
    }

    /// Mark the task as done by the user. Stops the countdown where it is.
    ///
    /// Like [`pause`](Self::pause), a running timer whose deadline already
    /// passed expires instead and the expiry event is returned; completing
    /// again afterwards marks the expired run done.
    pub fn complete(&mut self, now_ms: u64) -> Option<Event> {
        if !self.timer.has_started() || self.timer.task_complete {
            return None;
        }
        if self.timer.run_state == RunState::Running {
            if let Some(expired) = self.tick(now_ms) {
                return Some(expired);
            }
            self.timer.run_state = RunState::Paused;
        }
        self.timer.task_complete = true;
        tracing::info!(name = %self.timer.name, remaining_ms = self.timer.remaining_ms, "task completed");
        Some(Event::TaskCompleted {
            name: self.timer.name.clone(),
            remaining_ms: self.timer.remaining_ms,
            at: timestamp(now_ms),
        })
    }

    /// Edit name/description. Only allowed before the first start.
    pub fn rename(&mut self, name: &str, description: &str, now_ms: u64) -> Option<Event> {
        if self.timer.has_started() {
            return None;
        }
        self.timer.name = if name.trim().is_empty() {
            default_name()
        } else {
            truncate_name(name)
        };
        if !description.trim().is_empty() {
            self.timer.description = description.to_string();
        }
        Some(Event::TimerRenamed {
            name: self.timer.name.clone(),
            description: self.timer.description.clone(),
            at: timestamp(now_ms),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_pristine(&self) -> bool {
        self.timer.run_state == RunState::Idle
            && !self.timer.has_started()
            && !self.timer.task_complete
            && self.timer.remaining_ms == 0
    }

    fn arm(&mut self, duration_ms: u64, now_ms: u64) -> Option<Event> {
        if self.timer.run_state != RunState::Idle {
            return None;
        }
        let duration_ms = duration_ms.min(self.max_time_ms);
        if duration_ms == 0 {
            return None;
        }
        self.timer.started_at_ms = now_ms;
        self.timer.armed_duration_ms = duration_ms;
        self.timer.total_duration_ms = duration_ms;
        self.timer.remaining_ms = duration_ms;
        self.timer.run_state = RunState::Running;
        self.timer.task_complete = false;
        self.timer.archived = false;
        tracing::info!(name = %self.timer.name, duration_ms, "timer started");
        Some(Event::TimerStarted {
            name: self.timer.name.clone(),
            duration_ms,
            at: timestamp(now_ms),
        })
    }
}

fn truncate_name(name: &str) -> String {
    name.trim().chars().take(MAX_NAME_CHARS).collect()
}

/// Format milliseconds as `HH:MM:SS`, flooring partial seconds.
pub fn format_hms(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX: u64 = 12 * 60 * 60 * 1000;
    const T0: u64 = 1_700_000_000_000;

    #[test]
    fn start_pause_resume() {
        let mut engine = CountdownEngine::new(MAX);
        assert_eq!(engine.run_state(), RunState::Idle);

        assert!(engine.start(60, "Focus", T0).is_some());
        assert_eq!(engine.run_state(), RunState::Running);

        assert!(engine.pause(T0 + 10_000).is_some());
        assert_eq!(engine.run_state(), RunState::Paused);
        assert_eq!(engine.remaining_ms(), 50_000);

        assert!(engine.resume(T0 + 99_000).is_some());
        assert_eq!(engine.run_state(), RunState::Running);
        assert_eq!(engine.timer().armed_duration_ms, 50_000);
        assert_eq!(engine.total_ms(), 60_000);
    }

    #[test]
    fn start_then_tick_keeps_full_duration() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(90, "", T0);
        assert!(engine.tick(T0).is_none());
        assert_eq!(engine.remaining_ms(), 90_000);
        assert_eq!(engine.timer().name, DEFAULT_TIMER_NAME);
    }

    #[test]
    fn start_requires_idle_and_positive_duration() {
        let mut engine = CountdownEngine::new(MAX);
        assert!(engine.start(0, "x", T0).is_none());
        assert!(engine.start_armed(T0).is_none());
        engine.start(10, "x", T0);
        assert!(engine.start(10, "y", T0).is_none());
        assert_eq!(engine.timer().name, "x");
    }

    #[test]
    fn paused_time_does_not_count() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(60, "x", T0);
        engine.pause(T0 + 20_000);
        // A long pause followed by ticks must not move the countdown.
        assert!(engine.tick(T0 + 3_600_000).is_none());
        assert_eq!(engine.remaining_ms(), 40_000);
        engine.resume(T0 + 3_600_000);
        engine.tick(T0 + 3_610_000);
        assert_eq!(engine.remaining_ms(), 30_000);
    }

    #[test]
    fn pause_then_immediate_resume_keeps_ratio() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(100, "x", T0);
        engine.tick(T0 + 25_000);
        let before = engine.elapsed_ratio();
        engine.pause(T0 + 25_000);
        engine.resume(T0 + 25_000);
        engine.tick(T0 + 25_000);
        assert_eq!(engine.remaining_ms(), 75_000);
        assert!((engine.elapsed_ratio() - before).abs() < f64::EPSILON);
        assert!((before - 0.25).abs() < 1e-9);
    }

    #[test]
    fn expires_after_full_duration() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(1500, "Deep work", T0);
        let event = engine.tick(T0 + 1_500_000);
        assert!(matches!(event, Some(Event::TimerExpired { .. })));
        assert_eq!(engine.run_state(), RunState::Expired);
        assert_eq!(engine.remaining_ms(), 0);
        // Expiry is reported once.
        assert!(engine.tick(T0 + 2_000_000).is_none());
    }

    #[test]
    fn pause_past_deadline_reports_expiry() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(5, "x", T0);
        let event = engine.pause(T0 + 6_000);
        assert!(matches!(event, Some(Event::TimerExpired { .. })));
        assert_eq!(engine.run_state(), RunState::Expired);
        assert!(engine.resume(T0 + 7_000).is_none());
    }

    #[test]
    fn clock_going_backwards_does_not_add_time() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(10, "x", T0);
        engine.tick(T0 - 5_000);
        assert_eq!(engine.remaining_ms(), 10_000);
    }

    #[test]
    fn reset_clears_run_but_keeps_name() {
        let mut engine = CountdownEngine::new(MAX);
        engine.rename("Write report", "Q3 numbers", T0);
        engine.start(60, "", T0);
        engine.complete(T0 + 1_000);
        engine.reset(T0 + 2_000);
        let timer = engine.timer();
        assert_eq!(timer.run_state, RunState::Idle);
        assert_eq!(timer.remaining_ms, 0);
        assert_eq!(timer.total_duration_ms, 0);
        assert_eq!(timer.started_at_ms, 0);
        assert!(!timer.task_complete);
        assert_eq!(timer.name, "Write report");
        assert_eq!(timer.description, "Q3 numbers");
    }

    #[test]
    fn reset_of_untouched_timer_is_a_no_op() {
        let mut engine = CountdownEngine::new(MAX);
        assert!(engine.reset(T0).is_none());
        engine.adjust_remaining(30_000);
        assert!(matches!(engine.reset(T0), Some(Event::TimerReset { .. })));
        assert_eq!(engine.remaining_ms(), 0);
        assert!(engine.reset(T0).is_none());
    }

    #[test]
    fn complete_past_deadline_reports_expiry_first() {
        let mut engine = CountdownEngine::new(MAX);
        engine.start(60, "x", T0);
        let event = engine.complete(T0 + 120_000);
        assert!(matches!(event, Some(Event::TimerExpired { .. })));
        assert_eq!(engine.run_state(), RunState::Expired);
        assert!(!engine.timer().task_complete);

        let event = engine.complete(T0 + 121_000);
        assert!(matches!(event, Some(Event::TaskCompleted { remaining_ms: 0, .. })));
        assert_eq!(engine.run_state(), RunState::Expired);
    }

    #[test]
    fn adjust_only_while_idle() {
        let mut engine = CountdownEngine::new(MAX);
        assert!(engine.adjust_remaining(30_000));
        engine.start_armed(T0);
        assert!(!engine.adjust_remaining(30_000));
        assert_eq!(engine.remaining_ms(), 30_000);
    }

    #[test]
    fn adjust_saturates_at_bounds() {
        let mut engine = CountdownEngine::new(MAX);
        engine.adjust_remaining(-5_000);
        assert_eq!(engine.remaining_ms(), 0);
        engine.adjust_remaining(i64::MAX);
        assert_eq!(engine.remaining_ms(), MAX);
        engine.adjust_remaining(i64::MIN);
        assert_eq!(engine.remaining_ms(), 0);
    }

    #[test]
    fn quantize_rounds_to_nearest_step() {
        let mut engine = CountdownEngine::new(MAX);
        engine.adjust_remaining(127_000);
        engine.quantize(15_000);
        assert_eq!(engine.remaining_ms(), 120_000);
        engine.adjust_remaining(7_500);
        engine.quantize(15_000);
        assert_eq!(engine.remaining_ms(), 135_000);
        assert!(!engine.quantize(0));
    }

    #[test]
    fn complete_freezes_and_blocks_resume() {
        let mut engine = CountdownEngine::new(MAX);
        assert!(engine.complete(T0).is_none());
        engine.start(60, "x", T0);
        let event = engine.complete(T0 + 15_000);
        assert!(matches!(event, Some(Event::TaskCompleted { remaining_ms: 45_000, .. })));
        assert!(engine.timer().task_complete);
        assert_eq!(engine.run_state(), RunState::Paused);
        assert!(engine.resume(T0 + 20_000).is_none());
        assert!(engine.complete(T0 + 20_000).is_none());
    }

    #[test]
    fn rename_only_before_start() {
        let mut engine = CountdownEngine::new(MAX);
        engine.rename("   ", "", T0);
        assert_eq!(engine.timer().name, DEFAULT_TIMER_NAME);
        engine.rename("A very long timer name indeed", "", T0);
        assert_eq!(engine.timer().name.chars().count(), 20);
        engine.start(10, "", T0);
        assert!(engine.rename("Other", "", T0).is_none());
    }

    #[test]
    fn from_timer_restores_invariants() {
        let timer = Timer {
            name: String::new(),
            remaining_ms: MAX * 3,
            run_state: RunState::Running,
            ..Timer::default()
        };
        let engine = CountdownEngine::from_timer(timer, MAX);
        assert_eq!(engine.remaining_ms(), MAX);
        assert_eq!(engine.run_state(), RunState::Idle);
        assert_eq!(engine.timer().name, DEFAULT_TIMER_NAME);
    }

    #[test]
    fn snapshot_formats_display() {
        let mut engine = CountdownEngine::new(MAX);
        engine.adjust_remaining(3_723_999);
        let snap = engine.snapshot();
        assert_eq!(snap.display, "01:02:03");
        assert_eq!(snap.run_state, RunState::Idle);
        assert_eq!(snap.elapsed_ratio, 0.0);
    }

    #[test]
    fn timer_json_tolerates_missing_fields() {
        let timer: Timer = serde_json::from_str(r#"{"remaining_ms": 15000}"#).unwrap();
        assert_eq!(timer.remaining_ms, 15_000);
        assert_eq!(timer.name, DEFAULT_TIMER_NAME);
        assert_eq!(timer.run_state, RunState::Idle);
    }

    proptest! {
        #[test]
        fn remaining_stays_within_bounds(deltas in proptest::collection::vec(any::<i64>(), 1..32)) {
            let mut engine = CountdownEngine::new(MAX);
            for delta in deltas {
                engine.adjust_remaining(delta);
                prop_assert!(engine.remaining_ms() <= MAX);
            }
        }

        #[test]
        fn quantize_is_idempotent(start in 0u64..=MAX, step in prop_oneof![Just(15_000u64), Just(30_000u64)]) {
            let mut engine = CountdownEngine::new(MAX);
            engine.adjust_remaining(start as i64);
            engine.quantize(step);
            let once = engine.remaining_ms();
            prop_assert_eq!(once % step, 0);
            prop_assert!(!engine.quantize(step));
            prop_assert_eq!(engine.remaining_ms(), once);
        }

        #[test]
        fn tick_matches_wall_clock(secs in 1u64..43_200, advance in 0u64..50_000_000) {
            let mut engine = CountdownEngine::new(MAX);
            engine.start(secs, "p", T0);
            engine.tick(T0 + advance);
            prop_assert_eq!(engine.remaining_ms(), (secs * 1000).saturating_sub(advance));
        }
    }
}
