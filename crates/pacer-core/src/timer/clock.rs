//! Clock sources and the pause-aware elapsed-time driver.
//!
//! A [`ClockSource`] reports "now" as a [`Duration`] since some fixed origin.
//! The [`ClockDriver`] turns a stream of such readings into active elapsed
//! time, excluding every paused interval. It never triggers phase
//! transitions itself; the engine calls it and decides.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Source of "now" readings.
pub trait ClockSource {
    /// Time since this source's origin.
    fn now(&self) -> Duration;

    /// Whether readings are immune to system clock adjustments.
    fn is_monotonic(&self) -> bool;
}

/// Monotonic clock backed by [`Instant`]. Readings are only meaningful
/// within the process that created it.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn is_monotonic(&self) -> bool {
        true
    }
}

/// Wall clock measured from the UNIX epoch.
///
/// Survives process restarts, which is why the persisted CLI timer uses it,
/// but it follows system clock changes. [`ClockDriver`] clamps backwards
/// jumps so elapsed time never decreases.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    fn is_monotonic(&self) -> bool {
        false
    }
}

/// Manually advanced clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(saturating_nanos(by), Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(saturating_nanos(to), Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn is_monotonic(&self) -> bool {
        true
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Marks when the current pause began. Discarded on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRecord {
    pub paused_at: Duration,
}

/// Converts clock readings into active (unpaused) elapsed time.
///
/// `elapsed = now - started_at - paused_total`, frozen while paused and
/// never decreasing. `anchor` holds `started_at + paused_total` so that a
/// source stepping backwards during a pause is re-anchored on resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockDriver {
    anchor: Option<Duration>,
    paused_total: Duration,
    pause: Option<PauseRecord>,
    last_elapsed: Duration,
}

impl ClockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now: Duration) {
        *self = Self {
            anchor: Some(now),
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }

    /// Active elapsed time as of `now`.
    pub fn elapsed(&mut self, now: Duration) -> Duration {
        let Some(anchor) = self.anchor else {
            return Duration::ZERO;
        };
        if self.pause.is_some() {
            return self.last_elapsed;
        }
        self.last_elapsed = self.last_elapsed.max(now.saturating_sub(anchor));
        self.last_elapsed
    }

    pub fn pause(&mut self, now: Duration) -> Result<(), TransitionError> {
        if self.anchor.is_none() {
            return Err(TransitionError::NotStarted);
        }
        if self.pause.is_some() {
            return Err(TransitionError::AlreadyPaused);
        }
        // Freeze the reading at the pause instant.
        self.elapsed(now);
        self.pause = Some(PauseRecord { paused_at: now });
        Ok(())
    }

    /// Ends the pause and returns how long it lasted.
    pub fn resume(&mut self, now: Duration) -> Result<Duration, TransitionError> {
        let record = self.pause.take().ok_or(TransitionError::NotPaused)?;
        let paused_for = now.saturating_sub(record.paused_at);
        self.paused_total += paused_for;
        self.anchor = Some(now.saturating_sub(self.last_elapsed));
        Ok(paused_for)
    }
}
