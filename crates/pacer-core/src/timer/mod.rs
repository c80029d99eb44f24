pub mod clock;
mod engine;
mod schedule;

pub use clock::{ClockDriver, ClockSource, ManualClock, MonotonicClock, PauseRecord, SystemClock};
pub use engine::{PhasedTimer, TimerSnapshot, TimerState};
pub use schedule::{PhaseKind, PhaseSpec, Schedule};
