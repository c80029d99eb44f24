//! Phased timer engine.
//!
//! The engine is a clock-agnostic state machine. It does not use internal
//! threads or read a clock itself - every command takes the caller's `now`
//! reading and the caller decides how often to `tick()` (once a second for
//! a numeric countdown, once a frame for smooth animation).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           +-> Phase[0] -> Phase[1] -> ... -> Phase[n-1] -+-> Completed
//!                  ^                                       |
//!                  +------------- next cycle --------------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = PhasedTimer::new(schedule, 5)?;
//! timer.start(clock.now())?;
//! // In a loop:
//! for event in timer.tick(clock.now()) { /* notify */ }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::ClockDriver;
use super::schedule::{PhaseKind, PhaseSpec, Schedule};
use crate::error::{ScheduleError, TransitionError};
use crate::events::{Event, PhaseRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Read-only view of a timer at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub current_phase_index: usize,
    pub phase_name: String,
    pub phase_kind: PhaseKind,
    pub phase_duration_secs: u32,
    pub phase_elapsed_secs: f64,
    pub total_elapsed_secs: f64,
    pub is_running: bool,
    pub is_paused: bool,
    /// 1-based cycle in progress; 0 before the first start.
    pub cycle: u32,
    pub cycles: u32,
    /// Position within the whole planned run, skips included.
    pub schedule_position_secs: f64,
    pub planned_total_secs: u64,
}

impl TimerSnapshot {
    pub fn phase_remaining_secs(&self) -> f64 {
        (f64::from(self.phase_duration_secs) - self.phase_elapsed_secs).max(0.0)
    }
}

/// Multi-phase countdown timer.
///
/// Owns its schedule and all counters; serializable so a host can park a
/// running timer between processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SavedTimer")]
pub struct PhasedTimer {
    schedule: Schedule,
    cycles: u32,
    state: TimerState,
    phase_index: usize,
    cycle: u32,
    phase_elapsed: Duration,
    total_elapsed: Duration,
    #[serde(default)]
    driver: ClockDriver,
}

/// Wire form of [`PhasedTimer`], checked before it becomes one.
#[derive(Deserialize)]
struct SavedTimer {
    schedule: Schedule,
    cycles: u32,
    state: TimerState,
    phase_index: usize,
    cycle: u32,
    phase_elapsed: Duration,
    total_elapsed: Duration,
    #[serde(default)]
    driver: ClockDriver,
}

impl TryFrom<SavedTimer> for PhasedTimer {
    type Error = ScheduleError;

    fn try_from(saved: SavedTimer) -> Result<Self, Self::Error> {
        if saved.cycles == 0 {
            return Err(ScheduleError::ZeroCycles);
        }
        if saved.phase_index >= saved.schedule.len() || saved.cycle > saved.cycles {
            return Err(ScheduleError::PositionOutOfRange {
                phase_index: saved.phase_index,
                cycle: saved.cycle,
                phases: saved.schedule.len(),
                cycles: saved.cycles,
            });
        }
        Ok(Self {
            schedule: saved.schedule,
            cycles: saved.cycles,
            state: saved.state,
            phase_index: saved.phase_index,
            cycle: saved.cycle,
            phase_elapsed: saved.phase_elapsed,
            total_elapsed: saved.total_elapsed,
            driver: saved.driver,
        })
    }
}

impl PhasedTimer {
    /// Create an idle timer for `schedule`, repeated `cycles` times.
    pub fn new(schedule: Schedule, cycles: u32) -> Result<Self, ScheduleError> {
        if cycles == 0 {
            return Err(ScheduleError::ZeroCycles);
        }
        Ok(Self {
            schedule,
            cycles,
            state: TimerState::Idle,
            phase_index: 0,
            cycle: 0,
            phase_elapsed: Duration::ZERO,
            total_elapsed: Duration::ZERO,
            driver: ClockDriver::new(),
        })
    }

    /// Replace the schedule. Any session in progress is abandoned.
    pub fn configure(&mut self, schedule: Schedule, cycles: u32) -> Result<(), ScheduleError> {
        *self = Self::new(schedule, cycles)?;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn current_phase(&self) -> &PhaseSpec {
        // `phase_index` is only ever set from positions inside the schedule,
        // and deserialization rejects anything else.
        &self.schedule.phases()[self.phase_index]
    }

    pub fn phase_elapsed(&self) -> Duration {
        self.phase_elapsed
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    pub fn planned_total_secs(&self) -> u64 {
        self.schedule.total_duration_secs() * u64::from(self.cycles)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let phase = self.current_phase();
        let completed_cycles = u64::from(self.cycle.saturating_sub(1));
        let position = (completed_cycles * self.schedule.total_duration_secs()
            + self.schedule.cumulative_secs(self.phase_index)) as f64
            + self.phase_elapsed.as_secs_f64();
        TimerSnapshot {
            state: self.state,
            current_phase_index: self.phase_index,
            phase_name: phase.name.clone(),
            phase_kind: phase.kind,
            phase_duration_secs: phase.duration_secs,
            phase_elapsed_secs: self.phase_elapsed.as_secs_f64(),
            total_elapsed_secs: self.total_elapsed.as_secs_f64(),
            is_running: self.state == TimerState::Running,
            is_paused: self.state == TimerState::Paused,
            cycle: self.cycle,
            cycles: self.cycles,
            schedule_position_secs: position,
            planned_total_secs: self.planned_total_secs(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session. Also restarts a completed one.
    pub fn start(&mut self, now: Duration) -> Result<Vec<Event>, TransitionError> {
        match self.state {
            TimerState::Running | TimerState::Paused => Err(TransitionError::AlreadyRunning),
            TimerState::Idle | TimerState::Completed => {
                self.rewind();
                self.state = TimerState::Running;
                self.cycle = 1;
                self.driver.start(now);
                debug!(phase = %self.current_phase().name, cycles = self.cycles, "timer started");
                Ok(vec![Event::Started {
                    phase: PhaseRef::from(self.current_phase()),
                    cycles: self.cycles,
                    planned_total_secs: self.planned_total_secs(),
                }])
            }
        }
    }

    /// Freeze elapsed time. Transitions crossed before `now` are applied
    /// first, so the result may end in `Completed` instead of `Paused`.
    pub fn pause(&mut self, now: Duration) -> Result<Vec<Event>, TransitionError> {
        match self.state {
            TimerState::Running => {
                let mut events = self.tick(now);
                if self.state != TimerState::Running {
                    return Ok(events);
                }
                self.driver.pause(now)?;
                self.state = TimerState::Paused;
                events.push(Event::Paused {
                    phase_elapsed_secs: self.phase_elapsed.as_secs_f64(),
                    total_elapsed_secs: self.total_elapsed.as_secs_f64(),
                });
                Ok(events)
            }
            TimerState::Paused => Err(TransitionError::AlreadyPaused),
            TimerState::Idle => Err(TransitionError::NotStarted),
            TimerState::Completed => Err(TransitionError::AlreadyCompleted),
        }
    }

    pub fn resume(&mut self, now: Duration) -> Result<Vec<Event>, TransitionError> {
        match self.state {
            TimerState::Paused => {}
            TimerState::Completed => return Err(TransitionError::AlreadyCompleted),
            TimerState::Idle | TimerState::Running => return Err(TransitionError::NotPaused),
        }
        let paused_for = self.driver.resume(now)?;
        self.state = TimerState::Running;
        debug!(paused_secs = paused_for.as_secs_f64(), "timer resumed");
        Ok(vec![Event::Resumed {
            paused_secs: paused_for.as_secs_f64(),
            total_elapsed_secs: self.total_elapsed.as_secs_f64(),
        }])
    }

    /// Abandon the session and return to `Idle`.
    pub fn stop(&mut self) -> Result<Vec<Event>, TransitionError> {
        if self.state == TimerState::Idle {
            return Err(TransitionError::NotStarted);
        }
        let event = Event::Stopped {
            total_elapsed_secs: self.total_elapsed.as_secs_f64(),
            completed: self.state == TimerState::Completed,
        };
        self.rewind();
        debug!("timer stopped");
        Ok(vec![event])
    }

    /// End the current phase early.
    pub fn skip(&mut self, now: Duration) -> Result<Vec<Event>, TransitionError> {
        let mut events = match self.state {
            TimerState::Running => self.tick(now),
            TimerState::Paused => Vec::new(),
            TimerState::Idle => return Err(TransitionError::NotStarted),
            TimerState::Completed => return Err(TransitionError::AlreadyCompleted),
        };
        if matches!(self.state, TimerState::Running | TimerState::Paused) {
            self.phase_elapsed = self.current_phase().duration();
            events.extend(self.settle(true));
        }
        Ok(events)
    }

    /// Advance elapsed time to `now` and apply every transition it implies.
    ///
    /// Only meaningful while running; otherwise a no-op.
    pub fn tick(&mut self, now: Duration) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let elapsed = self.driver.elapsed(now);
        let delta = elapsed.saturating_sub(self.total_elapsed);
        self.total_elapsed = elapsed;
        self.phase_elapsed += delta;
        self.settle(false)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Consume `phase_elapsed` one boundary at a time, carrying the overshoot
    /// into the next phase, until it fits the current phase or the run ends.
    fn settle(&mut self, skipped: bool) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            let duration = self.current_phase().duration();
            if self.phase_elapsed < duration {
                break;
            }
            let overshoot = self.phase_elapsed - duration;
            let previous = PhaseRef::from(self.current_phase());
            let last_phase = self.phase_index + 1 == self.schedule.len();

            if last_phase {
                events.push(Event::CycleCompleted {
                    cycle: self.cycle,
                    cycles: self.cycles,
                });
                if self.cycle >= self.cycles {
                    self.phase_elapsed = duration;
                    self.total_elapsed = self.total_elapsed.saturating_sub(overshoot);
                    self.state = TimerState::Completed;
                    debug!(total_secs = self.total_elapsed.as_secs_f64(), "timer completed");
                    events.push(Event::Completed {
                        cycles: self.cycles,
                        total_elapsed_secs: self.total_elapsed.as_secs_f64(),
                    });
                    break;
                }
                self.cycle += 1;
                self.phase_index = 0;
            } else {
                self.phase_index += 1;
            }
            self.phase_elapsed = overshoot;

            let next = PhaseRef::from(self.current_phase());
            debug!(from = %previous.name, to = %next.name, cycle = self.cycle, skipped, "phase changed");
            events.push(Event::PhaseChanged {
                previous,
                next,
                cycle: self.cycle,
                total_elapsed_secs: self.total_elapsed.saturating_sub(overshoot).as_secs_f64(),
                skipped,
            });
            // A skip consumes only the boundary it forced.
            if skipped {
                break;
            }
        }
        events
    }

    fn rewind(&mut self) {
        self.state = TimerState::Idle;
        self.phase_index = 0;
        self.cycle = 0;
        self.phase_elapsed = Duration::ZERO;
        self.total_elapsed = Duration::ZERO;
        self.driver.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventLog;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn breathing(cycles: u32) -> PhasedTimer {
        let schedule = Schedule::new(vec![
            PhaseSpec::inhale(4),
            PhaseSpec::hold(2),
            PhaseSpec::exhale(6),
        ])
        .unwrap();
        PhasedTimer::new(schedule, cycles).unwrap()
    }

    fn abc() -> PhasedTimer {
        let schedule = Schedule::new(vec![
            PhaseSpec::new("A", 2),
            PhaseSpec::new("B", 3),
            PhaseSpec::new("C", 2),
        ])
        .unwrap();
        PhasedTimer::new(schedule, 1).unwrap()
    }

    fn record(events: Vec<Event>, into: &mut EventLog) {
        for e in &events {
            into.record(e);
        }
    }

    #[test]
    fn starts_idle_on_first_phase() {
        let timer = breathing(1);
        let snap = timer.snapshot();
        assert_eq!(snap.state, TimerState::Idle);
        assert_eq!(snap.current_phase_index, 0);
        assert_eq!(snap.cycle, 0);
        assert!(!snap.is_running && !snap.is_paused);
    }

    #[test]
    fn rejects_zero_cycles() {
        let schedule = Schedule::new(vec![PhaseSpec::new("A", 1)]).unwrap();
        assert_eq!(PhasedTimer::new(schedule, 0).unwrap_err(), ScheduleError::ZeroCycles);
    }

    #[test]
    fn advances_through_phases() {
        let mut timer = breathing(1);
        timer.start(secs(0.0)).unwrap();
        assert!(timer.tick(secs(3.9)).is_empty());
        let events = timer.tick(secs(4.0));
        assert_eq!(events.len(), 1);
        assert_eq!(timer.current_phase().name, "Hold");
        assert_eq!(timer.phase_elapsed(), Duration::ZERO);
    }

    #[test]
    fn completion_fires_once() {
        let mut timer = breathing(1);
        let mut seen = EventLog::new();
        timer.start(secs(0.0)).unwrap();
        for t in 1..=15 {
            record(timer.tick(secs(f64::from(t))), &mut seen);
        }
        assert_eq!(timer.state(), TimerState::Completed);
        assert_eq!(seen.count("completed"), 1);
        assert_eq!(seen.count("phase_changed"), 2);
        assert_eq!(timer.total_elapsed(), secs(12.0));
    }

    #[test]
    fn overshoot_walks_every_boundary() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        let events = timer.tick(secs(10.0));
        let names: Vec<(String, String)> = events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { previous, next, .. } => {
                    Some((previous.name.clone(), next.name.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![("A".into(), "B".into()), ("B".into(), "C".into())]
        );
        assert!(matches!(events.last(), Some(Event::Completed { .. })));
        // Clamped to the exact schedule length.
        assert_eq!(timer.total_elapsed(), secs(7.0));
    }

    #[test]
    fn overshoot_carries_remainder() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        timer.tick(secs(6.5));
        assert_eq!(timer.current_phase().name, "C");
        assert_eq!(timer.phase_elapsed(), secs(1.5));
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[test]
    fn wraps_into_next_cycle() {
        let mut timer = breathing(2);
        timer.start(secs(0.0)).unwrap();
        let events = timer.tick(secs(13.0));
        assert!(events.iter().any(|e| matches!(e, Event::CycleCompleted { cycle: 1, .. })));
        let snap = timer.snapshot();
        assert_eq!(snap.cycle, 2);
        assert_eq!(snap.current_phase_index, 0);
        assert!((snap.phase_elapsed_secs - 1.0).abs() < 1e-9);
        assert!((snap.schedule_position_secs - 13.0).abs() < 1e-9);

        let events = timer.tick(secs(24.0));
        assert!(matches!(events.last(), Some(Event::Completed { cycles: 2, .. })));
    }

    #[test]
    fn pause_excludes_paused_interval() {
        let mut timer = breathing(1);
        timer.start(secs(0.0)).unwrap();
        timer.tick(secs(2.0));
        timer.pause(secs(3.0)).unwrap();
        assert_eq!(timer.state(), TimerState::Paused);
        assert!(timer.tick(secs(100.0)).is_empty());
        timer.resume(secs(103.0)).unwrap();
        timer.tick(secs(104.0));
        assert_eq!(timer.total_elapsed(), secs(4.0));
        assert_eq!(timer.current_phase().name, "Hold");
    }

    #[test]
    fn pause_applies_pending_transitions() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        let events = timer.pause(secs(2.5)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::PhaseChanged { .. }));
        assert!(matches!(events[1], Event::Paused { .. }));
        assert_eq!(timer.current_phase().name, "B");
    }

    #[test]
    fn misuse_is_reported_and_ignored() {
        let mut timer = breathing(1);
        assert_eq!(timer.pause(secs(0.0)), Err(TransitionError::NotStarted));
        assert_eq!(timer.resume(secs(0.0)), Err(TransitionError::NotPaused));
        assert_eq!(timer.stop(), Err(TransitionError::NotStarted));
        timer.start(secs(0.0)).unwrap();
        assert_eq!(timer.start(secs(1.0)), Err(TransitionError::AlreadyRunning));
        assert_eq!(timer.resume(secs(1.0)), Err(TransitionError::NotPaused));
        timer.pause(secs(1.0)).unwrap();
        let before = timer.snapshot();
        assert_eq!(timer.pause(secs(2.0)), Err(TransitionError::AlreadyPaused));
        assert_eq!(timer.start(secs(2.0)), Err(TransitionError::AlreadyRunning));
        assert_eq!(timer.snapshot(), before);
    }

    #[test]
    fn restart_after_completion_resets_counters() {
        let mut timer = breathing(1);
        timer.start(secs(0.0)).unwrap();
        timer.tick(secs(12.0));
        assert_eq!(timer.state(), TimerState::Completed);
        timer.start(secs(50.0)).unwrap();
        let snap = timer.snapshot();
        assert_eq!(snap.current_phase_index, 0);
        assert_eq!(snap.phase_elapsed_secs, 0.0);
        assert_eq!(snap.total_elapsed_secs, 0.0);
        assert_eq!(snap.state, TimerState::Running);
        timer.tick(secs(51.0));
        assert_eq!(timer.total_elapsed(), secs(1.0));
    }

    #[test]
    fn stop_returns_to_idle() {
        let mut timer = breathing(1);
        timer.start(secs(0.0)).unwrap();
        timer.tick(secs(5.0));
        let events = timer.stop().unwrap();
        assert!(matches!(events[0], Event::Stopped { completed: false, .. }));
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.total_elapsed(), Duration::ZERO);
    }

    #[test]
    fn skip_moves_exactly_one_phase() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        let events = timer.skip(secs(0.5)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::PhaseChanged { skipped: true, next, .. } if next.name == "B"));
        assert_eq!(timer.phase_elapsed(), Duration::ZERO);

        // Time after the skip counts toward B only.
        timer.tick(secs(1.5));
        assert_eq!(timer.phase_elapsed(), secs(1.0));
        assert!((timer.snapshot().schedule_position_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn skip_while_paused_stays_paused() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        timer.pause(secs(1.0)).unwrap();
        timer.skip(secs(9.0)).unwrap();
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(timer.current_phase().name, "B");
    }

    #[test]
    fn skip_on_last_phase_completes() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        timer.skip(secs(0.0)).unwrap();
        timer.skip(secs(0.0)).unwrap();
        let events = timer.skip(secs(0.0)).unwrap();
        assert!(matches!(events.last(), Some(Event::Completed { .. })));
        assert_eq!(timer.skip(secs(0.0)), Err(TransitionError::AlreadyCompleted));
    }

    #[test]
    fn snapshot_is_idempotent() {
        let mut timer = breathing(3);
        timer.start(secs(0.0)).unwrap();
        timer.tick(secs(7.25));
        assert_eq!(timer.snapshot(), timer.snapshot());
    }

    #[test]
    fn serde_roundtrip_keeps_running_session() {
        let mut timer = breathing(1);
        timer.start(secs(100.0)).unwrap();
        timer.tick(secs(105.0));
        let json = serde_json::to_string(&timer).unwrap();
        let mut restored: PhasedTimer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.snapshot(), timer.snapshot());
        restored.tick(secs(106.0));
        assert_eq!(restored.current_phase().name, "Exhale");
    }

    #[test]
    fn deserialize_rejects_position_outside_schedule() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        let mut json = serde_json::to_value(&timer).unwrap();

        json["phase_index"] = serde_json::json!(5);
        let err = serde_json::from_value::<PhasedTimer>(json.clone()).unwrap_err();
        assert!(err.to_string().contains("outside a schedule of 3 phase(s)"), "{err}");

        json["phase_index"] = serde_json::json!(2);
        json["cycle"] = serde_json::json!(4);
        assert!(serde_json::from_value::<PhasedTimer>(json.clone()).is_err());

        json["cycle"] = serde_json::json!(1);
        json["cycles"] = serde_json::json!(0);
        assert!(serde_json::from_value::<PhasedTimer>(json.clone()).is_err());

        json["cycles"] = serde_json::json!(1);
        let restored: PhasedTimer = serde_json::from_value(json).unwrap();
        assert_eq!(restored.current_phase().name, "C");
    }

    #[test]
    fn commands_on_completed_timer_say_so() {
        let mut timer = abc();
        timer.start(secs(0.0)).unwrap();
        timer.tick(secs(7.0));
        assert_eq!(timer.state(), TimerState::Completed);
        let before = timer.snapshot();
        assert_eq!(timer.pause(secs(8.0)), Err(TransitionError::AlreadyCompleted));
        assert_eq!(timer.resume(secs(8.0)), Err(TransitionError::AlreadyCompleted));
        assert_eq!(timer.skip(secs(8.0)), Err(TransitionError::AlreadyCompleted));
        assert_eq!(timer.snapshot(), before);
        assert!(timer.stop().is_ok());
    }

    #[test]
    fn configure_resets_to_idle() {
        let mut timer = breathing(1);
        timer.start(secs(0.0)).unwrap();
        let schedule = Schedule::new(vec![PhaseSpec::new("Only", 10)]).unwrap();
        timer.configure(schedule, 2).unwrap();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.planned_total_secs(), 20);
    }
}
