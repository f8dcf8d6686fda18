//! A single particle and its containment rule.

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dial::Annulus;

/// Straight RGBA, 0-255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Pale cyan of the dial strokes.
pub const BASE_COLOR: Rgba = Rgba::new(189, 255, 252, 255);

/// Which wall of the annulus a particle hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Inner,
    Outer,
}

/// Ranges that color and size are drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub alpha: (u8, u8),
    pub size: (f64, f64),
}

impl Appearance {
    fn roll(&self, rng: &mut impl Rng) -> (Rgba, f64) {
        let (a_lo, a_hi) = ordered(self.alpha.0, self.alpha.1);
        let (s_lo, s_hi) = ordered(self.size.0, self.size.1);
        let color = Rgba {
            a: rng.gen_range(a_lo..=a_hi),
            ..BASE_COLOR
        };
        (color, rng.gen_range(s_lo..=s_hi))
    }
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: DVec2,
    pub velocity: DVec2,
    pub color: Rgba,
    pub size: f64,
}

impl Particle {
    /// Spawn uniformly in the annulus: random angle, radius uniform between
    /// the two walls, velocity in `[-1, 1]` per axis.
    pub fn spawn(annulus: &Annulus, appearance: &Appearance, rng: &mut impl Rng) -> Self {
        let (inner, outer) = ordered(annulus.inner, annulus.outer);
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let radius = rng.gen_range(inner..=outer);
        let velocity = DVec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        let (color, size) = appearance.roll(rng);
        Self {
            position: annulus.center + DVec2::from_angle(angle) * radius,
            velocity,
            color,
            size,
        }
    }

    /// Keep the particle inside the annulus.
    ///
    /// A particle past either wall is projected radially back onto it and its
    /// velocity is mirrored about the wall normal.
    pub fn contain(&mut self, annulus: &Annulus) -> Option<Contact> {
        let offset = self.position - annulus.center;
        let distance = offset.length();
        let (radius, contact) = if distance < annulus.inner {
            (annulus.inner, Contact::Inner)
        } else if distance > annulus.outer {
            (annulus.outer, Contact::Outer)
        } else {
            return None;
        };
        let normal = if distance > 0.0 && distance.is_finite() {
            offset / distance
        } else {
            DVec2::X
        };
        self.position = annulus.center + normal * radius;
        self.velocity -= 2.0 * self.velocity.dot(normal) * normal;
        Some(contact)
    }

    /// The same particle with a freshly rolled color and size.
    ///
    /// Outer-wall hits flash from the brighter half of the alpha range.
    pub fn pulsed(&self, contact: Contact, appearance: &Appearance, rng: &mut impl Rng) -> Self {
        let (lo, hi) = ordered(appearance.alpha.0, appearance.alpha.1);
        let floor = match contact {
            Contact::Inner => lo,
            Contact::Outer => lo + (hi - lo) / 2,
        };
        let (s_lo, s_hi) = ordered(appearance.size.0, appearance.size.1);
        Self {
            color: Rgba {
                a: rng.gen_range(floor..=hi),
                ..BASE_COLOR
            },
            size: rng.gen_range(s_lo..=s_hi),
            ..self.clone()
        }
    }
}
