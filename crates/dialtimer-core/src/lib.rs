//! # Dialtimer Core Library
//!
//! Core logic for a countdown timer driven by a rotary dial and decorated by
//! an ambient particle field. Rendering, input plumbing and window layout are
//! the host's business; this crate only computes state and hands back
//! immutable per-frame descriptors.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: A wall-clock-based state machine. Remaining time is
//!   always recomputed from the start timestamp, never accumulated per frame
//! - **Dial**: Maps pointer drags to signed duration adjustments, quantized on
//!   release
//! - **Particles**: A bounded random-walk simulation confined to the dial's
//!   annulus whose drift reflects the timer's run-state
//! - **Session**: Owns one of each and runs them in a fixed order per frame
//! - **Storage**: Key-value persistence (SQLite or in-memory) and TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Timer state machine
//! - [`DialMapper`]: Pointer drag to duration mapping
//! - [`ParticleField`]: Annulus-confined particle simulation
//! - [`Session`]: Per-frame driver
//! - [`TimerStore`]: Save-on-transition persistence

pub mod dial;
pub mod error;
pub mod events;
pub mod particles;
pub mod session;
pub mod storage;
pub mod timer;

pub use dial::{Annulus, Dial, DialFill, DialMapper, DialSnapshot, Rotation};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use particles::{FieldConfig, FieldInput, FieldSnapshot, Particle, ParticleField, Rgba};
pub use session::{Frame, PointerEvent, PointerKind, Session};
pub use storage::{ArchivedTimer, Config, Database, KeyValueStore, MemoryStore, TimerStore};
pub use timer::{Clock, CountdownEngine, ManualClock, RunState, SystemClock, Timer, TimerSnapshot};
