//! Ambient particle field around the dial.

mod field;
mod particle;

pub use field::{FieldConfig, FieldInput, FieldSnapshot, ParticleField, ParticleSnapshot};
pub use particle::{Appearance, Contact, Particle, Rgba, BASE_COLOR};
