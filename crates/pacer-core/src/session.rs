//! A [`PhasedTimer`] bound to a clock and a set of observers.
//!
//! The session reads the clock for every command, forwards each resulting
//! event to all observers, and turns misuse into a logged warning. It is
//! what a host loop drives; the bare timer stays clock-free and testable.

use tracing::{info, warn};

use crate::error::{ScheduleError, TransitionError};
use crate::events::Event;
use crate::observer::TimerObserver;
use crate::timer::{ClockSource, PhasedTimer, Schedule, TimerSnapshot, TimerState};

pub struct TimerSession<'a, C: ClockSource> {
    timer: PhasedTimer,
    clock: C,
    observers: Vec<Box<dyn TimerObserver + 'a>>,
}

impl<'a, C: ClockSource> TimerSession<'a, C> {
    pub fn new(timer: PhasedTimer, clock: C) -> Self {
        if !clock.is_monotonic() {
            info!("clock source is not monotonic; wall-clock changes may cause drift");
        }
        Self {
            timer,
            clock,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl TimerObserver + 'a) {
        self.observers.push(Box::new(observer));
    }

    pub fn configure(&mut self, schedule: Schedule, cycles: u32) -> Result<(), ScheduleError> {
        self.timer.configure(schedule, cycles)
    }

    pub fn timer(&self) -> &PhasedTimer {
        &self.timer
    }

    pub fn into_timer(self) -> PhasedTimer {
        self.timer
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.timer.snapshot()
    }

    pub fn start(&mut self) -> Result<Vec<Event>, TransitionError> {
        let now = self.clock.now();
        let result = self.timer.start(now);
        self.finish("start", result)
    }

    pub fn pause(&mut self) -> Result<Vec<Event>, TransitionError> {
        let now = self.clock.now();
        let result = self.timer.pause(now);
        self.finish("pause", result)
    }

    pub fn resume(&mut self) -> Result<Vec<Event>, TransitionError> {
        let now = self.clock.now();
        let result = self.timer.resume(now);
        self.finish("resume", result)
    }

    /// Pause when running, resume when paused.
    pub fn toggle_pause(&mut self) -> Result<Vec<Event>, TransitionError> {
        match self.timer.state() {
            TimerState::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    pub fn stop(&mut self) -> Result<Vec<Event>, TransitionError> {
        let result = self.timer.stop();
        self.finish("stop", result)
    }

    pub fn skip(&mut self) -> Result<Vec<Event>, TransitionError> {
        let now = self.clock.now();
        let result = self.timer.skip(now);
        self.finish("skip", result)
    }

    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let events = self.timer.tick(now);
        self.notify(&events);
        events
    }

    fn finish(
        &mut self,
        command: &str,
        result: Result<Vec<Event>, TransitionError>,
    ) -> Result<Vec<Event>, TransitionError> {
        match result {
            Ok(events) => {
                self.notify(&events);
                Ok(events)
            }
            Err(e) => {
                warn!(command, error = %e, "ignored timer command");
                Err(e)
            }
        }
    }

    fn notify(&mut self, events: &[Event]) {
        for event in events {
            for observer in self.observers.iter_mut() {
                event.dispatch(observer.as_mut());
            }
        }
    }
}
