//! Pointer drag to duration mapping.
//!
//! A drag nudges the dial-set duration by an amount proportional to pointer
//! speed, in the direction the pointer is turning around the dial center.
//! The raw angle comparison is kept as-is: a drag across the ±PI line (the
//! left horizontal) flips direction for that one move event.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::Dial;
use crate::events::{timestamp, Event};
use crate::timer::{CountdownEngine, RunState};

/// Direction of the last qualifying move, as seen on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// Adds time.
    Clockwise,
    /// Removes time.
    CounterClockwise,
    #[default]
    Still,
}

impl Rotation {
    /// +1 adds time, -1 removes it.
    pub fn sign(self) -> f64 {
        match self {
            Rotation::Clockwise => 1.0,
            Rotation::CounterClockwise => -1.0,
            Rotation::Still => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapperTuning {
    /// Milliseconds of adjustment per px/ms of pointer speed.
    pub ms_per_speed: f64,
    /// Upper bound of a single move's adjustment.
    pub max_adjust_ms: f64,
}

impl Default for MapperTuning {
    fn default() -> Self {
        Self {
            ms_per_speed: 60_000.0,
            max_adjust_ms: 120_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragAnchor {
    position: DVec2,
    at_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DialMapper {
    tuning: MapperTuning,
    drag: Option<DragAnchor>,
    /// px/ms of the last move, 0 outside a drag.
    pointer_speed: f64,
    rotation: Rotation,
}

impl DialMapper {
    pub fn new(tuning: MapperTuning) -> Self {
        Self {
            tuning,
            ..Self::default()
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_speed(&self) -> f64 {
        self.pointer_speed
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Begin a drag. Ignored unless the timer is idle.
    pub fn press(&mut self, x: f64, y: f64, at_ms: u64, engine: &CountdownEngine) -> bool {
        if engine.run_state() != RunState::Idle {
            return false;
        }
        self.drag = Some(DragAnchor {
            position: DVec2::new(x, y),
            at_ms,
        });
        self.pointer_speed = 0.0;
        self.rotation = Rotation::Still;
        true
    }

    /// Apply one move event. Returns the signed change actually applied to
    /// the remaining time, in ms; less than requested at either bound.
    pub fn drag(
        &mut self,
        x: f64,
        y: f64,
        at_ms: u64,
        dial: &mut Dial,
        engine: &mut CountdownEngine,
    ) -> i64 {
        let Some(anchor) = self.drag else {
            return 0;
        };
        if engine.run_state() != RunState::Idle {
            return 0;
        }

        let position = DVec2::new(x, y);
        let current_angle = dial.pointer_angle(x, y);
        let speed = pointer_speed(
            position.distance(anchor.position),
            at_ms.saturating_sub(anchor.at_ms),
        );
        let adjustment = (speed * self.tuning.ms_per_speed)
            .clamp(0.0, self.tuning.max_adjust_ms)
            .round() as i64;

        self.rotation = if current_angle < dial.visual_angle {
            Rotation::Clockwise
        } else if current_angle > dial.visual_angle {
            Rotation::CounterClockwise
        } else {
            Rotation::Still
        };
        let requested = match self.rotation {
            Rotation::Clockwise => adjustment,
            Rotation::CounterClockwise => -adjustment,
            Rotation::Still => 0,
        };
        let before = engine.remaining_ms();
        if requested != 0 {
            engine.adjust_remaining(requested);
        }

        dial.visual_angle = current_angle;
        self.pointer_speed = speed;
        self.drag = Some(DragAnchor { position, at_ms });
        engine.remaining_ms() as i64 - before as i64
    }

    /// End the drag: snap the duration to `step_ms` and park the dial.
    pub fn release(
        &mut self,
        dial: &mut Dial,
        engine: &mut CountdownEngine,
        step_ms: u64,
        now_ms: u64,
    ) -> Option<Event> {
        self.drag.take()?;
        dial.visual_angle = 0.0;
        self.pointer_speed = 0.0;
        self.rotation = Rotation::Still;
        if engine.run_state() != RunState::Idle {
            return None;
        }
        engine.quantize(step_ms);
        tracing::debug!(remaining_ms = engine.remaining_ms(), "dial released");
        Some(Event::DurationSet {
            remaining_ms: engine.remaining_ms(),
            at: timestamp(now_ms),
        })
    }

    /// Abort the drag after focus loss. Settles exactly like a release so the
    /// duration is never left off-step.
    pub fn cancel(
        &mut self,
        dial: &mut Dial,
        engine: &mut CountdownEngine,
        step_ms: u64,
        now_ms: u64,
    ) -> Option<Event> {
        if self.drag.is_some() {
            tracing::debug!("drag cancelled");
        }
        self.release(dial, engine, step_ms, now_ms)
    }
}

/// px/ms, or 0 when the interval is empty or the result is not finite.
fn pointer_speed(distance: f64, elapsed_ms: u64) -> f64 {
    if elapsed_ms == 0 {
        return 0.0;
    }
    let speed = distance / elapsed_ms as f64;
    if speed.is_finite() {
        speed
    } else {
        0.0
    }
}
