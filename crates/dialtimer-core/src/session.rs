//! One timer, one dial, one particle field, ticked together.
//!
//! The host calls [`Session::frame`] once per displayed frame. Inside a frame
//! the order is fixed: the engine recomputes remaining time, queued pointer
//! events go through the dial mapper, then the particle field moves with the
//! run-state it just saw. Nothing here blocks or spawns; countdown accuracy
//! comes entirely from timestamp differencing in the engine.

use std::collections::VecDeque;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::dial::{Dial, DialMapper, DialSnapshot};
use crate::events::{timestamp, Event};
use crate::particles::{FieldInput, FieldSnapshot, ParticleField};
use crate::storage::{ArchivedTimer, Config};
use crate::timer::{Clock, CountdownEngine, RunState, Timer, TimerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    /// Gesture interrupted, e.g. the window lost focus.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
    /// Host timestamp of the event, ms.
    pub at_ms: u64,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f64, y: f64, at_ms: u64) -> Self {
        Self { kind, x, y, at_ms }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub at_ms: u64,
    pub timer: TimerSnapshot,
    pub dial: DialSnapshot,
    pub field: FieldSnapshot,
}

pub struct Session<C: Clock> {
    clock: C,
    step_ms: u64,
    engine: CountdownEngine,
    dial: Dial,
    mapper: DialMapper,
    field: ParticleField,
    pending: VecDeque<PointerEvent>,
    outbox: Vec<Event>,
}

impl<C: Clock> Session<C> {
    pub fn new(config: &Config, clock: C) -> Self {
        Self::restore(config, clock, None)
    }

    /// Start from a saved timer, if any, and tick it right away so a timer
    /// that ran out while nobody was watching comes back expired.
    pub fn restore(config: &Config, clock: C, saved: Option<Timer>) -> Self {
        let engine = match saved {
            Some(timer) => CountdownEngine::from_timer(timer, config.max_time_ms()),
            None => CountdownEngine::new(config.max_time_ms()),
        };
        let dial = Dial::new(
            DVec2::new(config.dial.center_x, config.dial.center_y),
            config.dial.inner_radius,
            config.dial.outer_radius,
        );
        let field = ParticleField::new(dial.annulus(), config.particles.clone());
        let mut session = Self {
            clock,
            step_ms: config.quantize_step_ms(),
            engine,
            dial,
            mapper: DialMapper::new(config.mapper_tuning()),
            field,
            pending: VecDeque::new(),
            outbox: Vec::new(),
        };
        let now = session.clock.now_ms();
        if let Some(event) = session.engine.tick(now) {
            session.outbox.push(event);
        }
        session
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &CountdownEngine {
        &self.engine
    }

    pub fn timer(&self) -> &Timer {
        self.engine.timer()
    }

    pub fn dial(&self) -> &Dial {
        &self.dial
    }

    pub fn mapper(&self) -> &DialMapper {
        &self.mapper
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Hand pending events to the host, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Queue a pointer event for the next frame.
    pub fn push_pointer(&mut self, event: PointerEvent) {
        self.pending.push_back(event);
    }

    /// The window lost (or regained) focus: any drag in progress ends now.
    pub fn focus_lost(&mut self) {
        self.pending.clear();
        let now = self.clock.now_ms();
        let event = self
            .mapper
            .cancel(&mut self.dial, &mut self.engine, self.step_ms, now);
        self.emit(event);
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, duration_secs: u64, name: &str) -> bool {
        let now = self.clock.now_ms();
        let event = self.engine.start(duration_secs, name, now);
        self.emit(event)
    }

    /// Start from the duration dialed in.
    pub fn start_armed(&mut self) -> bool {
        let now = self.clock.now_ms();
        let event = self.engine.start_armed(now);
        self.emit(event)
    }

    pub fn pause(&mut self) -> bool {
        let now = self.clock.now_ms();
        let event = self.engine.pause(now);
        self.emit(event)
    }

    pub fn resume(&mut self) -> bool {
        let now = self.clock.now_ms();
        let event = self.engine.resume(now);
        self.emit(event)
    }

    /// Archive the run if it needs it, then go back to idle.
    pub fn reset(&mut self) -> bool {
        let now = self.clock.now_ms();
        let expired = self.engine.tick(now);
        self.emit(expired);
        self.archive(now);
        let event = self.engine.reset(now);
        self.emit(event)
    }

    /// Mark the task done and archive it.
    pub fn complete(&mut self) -> bool {
        let now = self.clock.now_ms();
        // A deadline that passed since the last frame is reported first.
        let expired = self.engine.tick(now);
        self.emit(expired);
        let event = self.engine.complete(now);
        if !self.emit(event) {
            return false;
        }
        self.archive(now);
        true
    }

    pub fn rename(&mut self, name: &str, description: &str) -> bool {
        let now = self.clock.now_ms();
        let event = self.engine.rename(name, description, now);
        self.emit(event)
    }

    /// Move the dial and respawn the particles around it.
    pub fn resize(&mut self, center: DVec2) {
        self.dial.relayout(center);
        self.field.relayout(self.dial.annulus());
    }

    // ── Frame ────────────────────────────────────────────────────────

    pub fn frame(&mut self) -> Frame {
        let now = self.clock.now_ms();

        let expired = self.engine.tick(now);
        self.emit(expired);

        while let Some(pointer) = self.pending.pop_front() {
            self.route_pointer(pointer, now);
        }

        self.field.update(&FieldInput {
            run_state: self.engine.run_state(),
            pointer_speed: self.mapper.pointer_speed(),
            rotation: self.mapper.rotation(),
        });

        Frame {
            at_ms: now,
            timer: self.engine.snapshot(),
            dial: self.dial.snapshot(&self.engine, self.mapper.is_dragging()),
            field: self.field.snapshot(),
        }
    }

    /// Whether the dial currently accepts drags.
    pub fn dial_enabled(&self) -> bool {
        self.engine.run_state() == RunState::Idle
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn route_pointer(&mut self, pointer: PointerEvent, now: u64) {
        match pointer.kind {
            PointerKind::Down => {
                if !self.mapper.press(pointer.x, pointer.y, pointer.at_ms, &self.engine) {
                    tracing::trace!(state = ?self.engine.run_state(), "dial press ignored");
                }
            }
            PointerKind::Move => {
                self.mapper.drag(
                    pointer.x,
                    pointer.y,
                    pointer.at_ms,
                    &mut self.dial,
                    &mut self.engine,
                );
            }
            PointerKind::Up => {
                let event = self
                    .mapper
                    .release(&mut self.dial, &mut self.engine, self.step_ms, now);
                self.emit(event);
            }
            PointerKind::Cancel => {
                let event = self
                    .mapper
                    .cancel(&mut self.dial, &mut self.engine, self.step_ms, now);
                self.emit(event);
            }
        }
    }

    fn archive(&mut self, now: u64) {
        if !self.engine.needs_archive() {
            return;
        }
        self.engine.mark_archived();
        let entry = ArchivedTimer::new(self.engine.timer().clone(), timestamp(now));
        self.outbox.push(Event::TimerArchived { entry });
    }

    fn emit(&mut self, event: Option<Event>) -> bool {
        match event {
            Some(event) => {
                self.outbox.push(event);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;

    const T0: u64 = 1_700_000_000_000;

    fn config() -> Config {
        let mut config = Config::default();
        config.particles.count = 64;
        config.particles.seed = Some(3);
        config
    }

    #[test]
    fn frame_ticks_engine_before_particles() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        assert!(session.start(10, "Tea"));
        clock.advance(4_000);
        let frame = session.frame();
        assert_eq!(frame.timer.remaining_ms, 6_000);
        assert_eq!(frame.timer.run_state, RunState::Running);
        assert_eq!(frame.field.particles.len(), 64);
        assert_eq!(frame.at_ms, T0 + 4_000);
    }

    #[test]
    fn drag_through_frames_sets_quantized_duration() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        let (cx, cy) = (400.0, 385.0);
        session.push_pointer(PointerEvent::new(PointerKind::Down, cx + 200.0, cy, 0));
        session.push_pointer(PointerEvent::new(PointerKind::Move, cx + 190.0, cy + 40.0, 100));
        let frame = session.frame();
        assert!(frame.dial.dragging);
        assert!(frame.dial.visual_angle < 0.0);
        assert!(frame.timer.remaining_ms > 0);

        session.push_pointer(PointerEvent::new(PointerKind::Up, cx + 190.0, cy + 40.0, 150));
        let frame = session.frame();
        assert!(!frame.dial.dragging);
        assert_eq!(frame.dial.visual_angle, 0.0);
        assert_eq!(frame.timer.remaining_ms % 15_000, 0);
        let events = session.drain_events();
        assert!(matches!(events.as_slice(), [Event::DurationSet { .. }]));
    }

    #[test]
    fn drag_ignored_while_running() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.start(60, "x");
        session.push_pointer(PointerEvent::new(PointerKind::Down, 600.0, 385.0, 0));
        session.push_pointer(PointerEvent::new(PointerKind::Move, 590.0, 430.0, 10));
        session.push_pointer(PointerEvent::new(PointerKind::Up, 590.0, 430.0, 20));
        let frame = session.frame();
        assert_eq!(frame.timer.remaining_ms, 60_000);
        assert!(!session.dial_enabled());
    }

    #[test]
    fn reset_after_start_archives_once() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.start(60, "Write");
        clock.advance(5_000);
        session.reset();
        let events = session.drain_events();
        let archived: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::TimerArchived { entry } => Some(entry),
                _ => None,
            })
            .collect();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].timer.remaining_ms, 55_000);
        assert!(matches!(events.last(), Some(Event::TimerReset { .. })));

        // A fresh reset of an untouched timer archives nothing.
        session.reset();
        assert!(session
            .drain_events()
            .iter()
            .all(|e| !matches!(e, Event::TimerArchived { .. })));
    }

    #[test]
    fn complete_archives_and_reset_does_not_duplicate() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.start(60, "Write");
        assert!(session.complete());
        session.reset();
        let archived = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, Event::TimerArchived { .. }))
            .count();
        assert_eq!(archived, 1);
    }

    fn kinds(events: &[Event]) -> Vec<&'static str> {
        events.iter().map(Event::kind).collect()
    }

    #[test]
    fn reset_after_unseen_deadline_reports_expiry() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.start(60, "Oven");
        clock.advance(120_000);
        assert!(session.reset());
        let events = session.drain_events();
        assert_eq!(
            kinds(&events),
            ["timer_started", "timer_expired", "timer_archived", "timer_reset"]
        );
        match &events[2] {
            Event::TimerArchived { entry } => {
                assert_eq!(entry.timer.run_state, RunState::Expired);
                assert_eq!(entry.timer.remaining_ms, 0);
            }
            other => panic!("expected archive, got {other:?}"),
        }
    }

    #[test]
    fn complete_after_unseen_deadline_reports_expiry() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.start(60, "Oven");
        clock.advance(120_000);
        assert!(session.complete());
        assert_eq!(
            kinds(&session.drain_events()),
            ["timer_started", "timer_expired", "task_completed", "timer_archived"]
        );
        assert_eq!(session.engine().run_state(), RunState::Expired);
        assert!(session.timer().task_complete);
    }

    #[test]
    fn reset_of_untouched_timer_emits_nothing() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        assert!(!session.reset());
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn restore_of_overdue_timer_lands_expired() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.start(1500, "Deep work");
        let saved = session.timer().clone();

        let later = ManualClock::new(T0 + 1_500_000);
        let mut restored = Session::restore(&config(), &later, Some(saved));
        assert_eq!(restored.engine().run_state(), RunState::Expired);
        assert_eq!(restored.engine().remaining_ms(), 0);
        assert!(matches!(
            restored.drain_events().as_slice(),
            [Event::TimerExpired { .. }]
        ));
    }

    #[test]
    fn focus_loss_ends_drag() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.push_pointer(PointerEvent::new(PointerKind::Down, 600.0, 385.0, 0));
        session.push_pointer(PointerEvent::new(PointerKind::Move, 590.0, 430.0, 30));
        session.frame();
        assert!(session.mapper().is_dragging());
        session.focus_lost();
        assert!(!session.mapper().is_dragging());
        assert_eq!(session.timer().remaining_ms % 15_000, 0);
    }

    #[test]
    fn resize_moves_field_with_dial() {
        let clock = ManualClock::new(T0);
        let mut session = Session::new(&config(), &clock);
        session.resize(DVec2::new(900.0, 500.0));
        let ring = session.field().annulus();
        assert_eq!(ring.center, DVec2::new(900.0, 500.0));
        for p in session.field().particles() {
            let d = p.position.distance(ring.center);
            assert!(d >= ring.inner - 1e-9 && d <= ring.outer + 1e-9);
        }
    }
}
