//! The rotary dial: geometry, render descriptor and drag mapping.
//!
//! The dial owns no timer state. It only carries its layout and the transient
//! visual angle of an in-progress drag.

mod mapper;

use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::timer::CountdownEngine;

pub use mapper::{DialMapper, MapperTuning, Rotation};

/// Ring between the dial's inner and outer radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annulus {
    pub center: DVec2,
    pub inner: f64,
    pub outer: f64,
}

impl Annulus {
    pub fn contains(&self, point: DVec2) -> bool {
        let distance = point.distance(self.center);
        distance >= self.inner && distance <= self.outer
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dial {
    pub center: DVec2,
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Pointer angle of the running drag, radians. 0 between drags.
    pub visual_angle: f64,
}

/// Progress arcs drawn inside the dial while a countdown is on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DialFill {
    /// Sweep of the current minute, 0 .. TAU.
    pub minute_angle: f64,
    /// Sweep of what is left of the whole run, 0 .. TAU.
    pub total_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialSnapshot {
    pub center_x: f64,
    pub center_y: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub visual_angle: f64,
    pub dragging: bool,
    pub fill: Option<DialFill>,
}

impl Dial {
    pub fn new(center: DVec2, inner_radius: f64, outer_radius: f64) -> Self {
        // Tolerate swapped radii from configuration.
        let (inner_radius, outer_radius) = if inner_radius <= outer_radius {
            (inner_radius, outer_radius)
        } else {
            (outer_radius, inner_radius)
        };
        Self {
            center,
            inner_radius,
            outer_radius,
            visual_angle: 0.0,
        }
    }

    pub fn annulus(&self) -> Annulus {
        Annulus {
            center: self.center,
            inner: self.inner_radius,
            outer: self.outer_radius,
        }
    }

    /// Move the dial after the host recomputed its layout.
    pub fn relayout(&mut self, center: DVec2) {
        self.center = center;
    }

    /// Screen-space pointer angle around the center.
    ///
    /// Negated because screen y grows downwards.
    pub fn pointer_angle(&self, x: f64, y: f64) -> f64 {
        -(y - self.center.y).atan2(x - self.center.x)
    }

    pub fn snapshot(&self, engine: &CountdownEngine, dragging: bool) -> DialSnapshot {
        DialSnapshot {
            center_x: self.center.x,
            center_y: self.center.y,
            inner_radius: self.inner_radius,
            outer_radius: self.outer_radius,
            visual_angle: self.visual_angle,
            dragging,
            fill: if dragging { None } else { fill_for(engine) },
        }
    }
}

fn fill_for(engine: &CountdownEngine) -> Option<DialFill> {
    let timer = engine.timer();
    if !timer.has_started() || timer.total_duration_ms == 0 {
        return None;
    }
    let minute = (timer.remaining_ms % 60_000) as f64 / 60_000.0;
    let total = timer.remaining_ms as f64 / timer.total_duration_ms as f64;
    Some(DialFill {
        minute_angle: minute * TAU,
        total_angle: total.min(1.0) * TAU,
    })
}
