mod clock;
mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{format_hms, CountdownEngine, RunState, Timer, TimerSnapshot, DEFAULT_TIMER_NAME};
