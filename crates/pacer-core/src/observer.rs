//! Callback contract for hosts that react to timer events.

use crate::events::{Event, PhaseRef};

/// Notification hooks. Every method defaults to a no-op so implementors
/// only override what they care about.
pub trait TimerObserver {
    fn on_start(&mut self) {}
    fn on_pause(&mut self) {}
    fn on_resume(&mut self) {}
    fn on_stop(&mut self) {}
    fn on_phase_change(&mut self, _previous: &PhaseRef, _next: &PhaseRef) {}
    fn on_cycle_complete(&mut self, _cycle: u32) {}
    fn on_complete(&mut self) {}
}

/// Observer that keeps every event it sees. Handy for hosts that poll.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &Event) {
        self.events.push(event.clone());
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}
