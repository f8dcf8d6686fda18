//! The particle field: N independent agents confined to the dial's annulus.
//!
//! Each frame a particle jitters, picks up a random impulse proportional to
//! the pointer speed, is damped and speed-limited, moves, bounces off the
//! annulus walls, and finally feels a tangential flow whose direction tells
//! the viewer whether the countdown is running.

use std::f64::consts::TAU;

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use super::particle::{Appearance, Particle, Rgba};
use crate::dial::{Annulus, Rotation};
use crate::timer::RunState;

/// Simulation tuning, loaded from the `[particles]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default = "default_count")]
    pub count: usize,
    /// Random-walk step per frame.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// Impulse per unit of pointer speed (px/ms).
    #[serde(default = "default_impulse_scale")]
    pub impulse_scale: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,
    /// Tangential push while running. Positive is counter-clockwise on screen.
    #[serde(default = "default_running_flow")]
    pub running_flow: f64,
    /// Tangential push otherwise.
    #[serde(default = "default_idle_flow")]
    pub idle_flow: f64,
    /// Extra tangential push per px/ms while the dial is being turned.
    #[serde(default = "default_drag_swirl")]
    pub drag_swirl: f64,
    #[serde(default = "default_true")]
    pub pulse_on_contact: bool,
    #[serde(default = "default_size_min")]
    pub size_min: f64,
    #[serde(default = "default_size_max")]
    pub size_max: f64,
    #[serde(default = "default_alpha_min")]
    pub alpha_min: u8,
    #[serde(default = "default_alpha_max")]
    pub alpha_max: u8,
    /// Background swirl rotation per frame, radians. Four times faster while running.
    #[serde(default = "default_swirl_speed")]
    pub swirl_speed: f64,
    /// Fixed RNG seed; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_count() -> usize {
    2500
}
fn default_jitter() -> f64 {
    0.01
}
fn default_impulse_scale() -> f64 {
    0.5
}
fn default_damping() -> f64 {
    0.98
}
fn default_max_speed() -> f64 {
    5.0
}
fn default_min_speed() -> f64 {
    0.4
}
fn default_running_flow() -> f64 {
    0.05
}
fn default_idle_flow() -> f64 {
    -0.01
}
fn default_drag_swirl() -> f64 {
    0.02
}
fn default_true() -> bool {
    true
}
fn default_size_min() -> f64 {
    4.0
}
fn default_size_max() -> f64 {
    6.0
}
fn default_alpha_min() -> u8 {
    50
}
fn default_alpha_max() -> u8 {
    255
}
fn default_swirl_speed() -> f64 {
    0.0003
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            jitter: default_jitter(),
            impulse_scale: default_impulse_scale(),
            damping: default_damping(),
            max_speed: default_max_speed(),
            min_speed: default_min_speed(),
            running_flow: default_running_flow(),
            idle_flow: default_idle_flow(),
            drag_swirl: default_drag_swirl(),
            pulse_on_contact: true,
            size_min: default_size_min(),
            size_max: default_size_max(),
            alpha_min: default_alpha_min(),
            alpha_max: default_alpha_max(),
            swirl_speed: default_swirl_speed(),
            seed: None,
        }
    }
}

impl FieldConfig {
    fn appearance(&self) -> Appearance {
        Appearance {
            alpha: (self.alpha_min, self.alpha_max),
            size: (self.size_min, self.size_max),
        }
    }
}

/// What the field reads from the rest of the session each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldInput {
    pub run_state: RunState,
    /// Latest pointer speed from the dial, px/ms.
    pub pointer_speed: f64,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub x: f64,
    pub y: f64,
    pub color: Rgba,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Rotation of the background swirl, 0 .. TAU.
    pub swirl_angle: f64,
    /// Wall hits during the last update.
    pub contacts: usize,
    pub particles: Vec<ParticleSnapshot>,
}

pub struct ParticleField {
    particles: Vec<Particle>,
    annulus: Annulus,
    config: FieldConfig,
    rng: Mcg128Xsl64,
    swirl_angle: f64,
    contacts: usize,
}

impl ParticleField {
    pub fn new(annulus: Annulus, config: FieldConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let mut field = Self {
            particles: Vec::new(),
            annulus,
            config,
            rng,
            swirl_angle: 0.0,
            contacts: 0,
        };
        field.populate();
        field
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn annulus(&self) -> Annulus {
        self.annulus
    }

    pub fn swirl_angle(&self) -> f64 {
        self.swirl_angle
    }

    /// Throw every particle away and respawn in the new ring.
    pub fn relayout(&mut self, annulus: Annulus) {
        self.annulus = annulus;
        self.populate();
    }

    pub fn update(&mut self, input: &FieldInput) {
        let speed = if input.pointer_speed.is_finite() {
            input.pointer_speed.max(0.0)
        } else {
            0.0
        };
        let running = input.run_state == RunState::Running;
        let flow = if running {
            self.config.running_flow
        } else {
            self.config.idle_flow
        };
        // Turning the dial clockwise drags the field clockwise.
        let flow = flow - input.rotation.sign() * speed * self.config.drag_swirl;
        let appearance = self.config.appearance();

        let mut contacts = 0;
        for particle in &mut self.particles {
            let walk = random_unit(&mut self.rng) * self.config.jitter;
            particle.position += walk;

            let impulse = random_unit(&mut self.rng) * (speed * self.config.impulse_scale);
            particle.velocity += impulse;
            particle.velocity *= self.config.damping;
            particle.velocity = particle.velocity.clamp_length_max(self.config.max_speed);
            if particle.velocity.length() < self.config.min_speed {
                let heading = particle
                    .velocity
                    .try_normalize()
                    .unwrap_or_else(|| random_unit(&mut self.rng));
                particle.velocity = heading * self.config.min_speed;
            }

            particle.position += particle.velocity;

            if let Some(contact) = particle.contain(&self.annulus) {
                contacts += 1;
                if self.config.pulse_on_contact {
                    *particle = particle.pulsed(contact, &appearance, &mut self.rng);
                }
            }

            let radial = particle.position - self.annulus.center;
            // (y, -x) is counter-clockwise with screen y pointing down.
            if let Some(tangent) = DVec2::new(radial.y, -radial.x).try_normalize() {
                particle.velocity += tangent * flow;
            }
        }
        self.contacts = contacts;

        let swirl = if running {
            self.config.swirl_speed * 4.0
        } else {
            self.config.swirl_speed
        };
        self.swirl_angle = (self.swirl_angle + swirl).rem_euclid(TAU);
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            swirl_angle: self.swirl_angle,
            contacts: self.contacts,
            particles: self
                .particles
                .iter()
                .map(|p| ParticleSnapshot {
                    x: p.position.x,
                    y: p.position.y,
                    color: p.color,
                    size: p.size,
                })
                .collect(),
        }
    }

    fn populate(&mut self) {
        let appearance = self.config.appearance();
        let annulus = self.annulus;
        let rng = &mut self.rng;
        self.particles = (0..self.config.count)
            .map(|_| Particle::spawn(&annulus, &appearance, &mut *rng))
            .collect();
        tracing::debug!(count = self.particles.len(), "particle field populated");
    }
}

fn random_unit(rng: &mut impl Rng) -> DVec2 {
    DVec2::from_angle(rng.gen_range(0.0..TAU))
}
