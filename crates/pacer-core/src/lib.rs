//! # Pacer Core Library
//!
//! Core logic for Pacer, a guided-exercise timer: breathing patterns and
//! short structured thinking drills built from timed phases. Every
//! operation is reachable from the standalone `pacer` CLI.
//!
//! ## Architecture
//!
//! - **Timer**: a clock-agnostic phased state machine. Callers pass the
//!   current clock reading to every command and call `tick()` as often
//!   as their display needs
//! - **Session**: binds a timer to a [`ClockSource`] and fans events out
//!   to [`TimerObserver`]s
//! - **Presentation**: pure mapping from a [`TimerSnapshot`] to labels,
//!   progress fractions and easing
//! - **Storage**: SQLite session history plus a key-value table, and TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`PhasedTimer`]: core timer state machine
//! - [`TimerSession`]: timer + clock + observers
//! - [`ExerciseCatalog`]: built-in and user-defined exercises
//! - [`Database`]: session and statistics persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod exercise;
pub mod observer;
pub mod presentation;
pub mod session;
pub mod storage;
pub mod timer;
pub mod worksheet;

pub use error::{ConfigError, CoreError, ScheduleError, StorageError, TransitionError};
pub use events::{Event, PhaseRef};
pub use exercise::{Exercise, ExerciseCatalog};
pub use observer::{EventLog, TimerObserver};
pub use presentation::{BreathVisual, Easing, PhaseView};
pub use session::TimerSession;
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
pub use timer::{
    ClockSource, ManualClock, MonotonicClock, PhaseKind, PhaseSpec, PhasedTimer, Schedule,
    SystemClock, TimerSnapshot, TimerState,
};
pub use worksheet::{Worksheet, WorksheetAutosave};
