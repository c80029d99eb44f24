use serde::{Deserialize, Serialize};

use crate::observer::TimerObserver;
use crate::timer::{PhaseKind, PhaseSpec};

/// Identifies a phase inside a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRef {
    pub index: usize,
    pub name: String,
    pub kind: PhaseKind,
}

impl From<&PhaseSpec> for PhaseRef {
    fn from(spec: &PhaseSpec) -> Self {
        Self {
            index: spec.ordinal,
            name: spec.name.clone(),
            kind: spec.kind,
        }
    }
}

/// Every state change of a timer produces an Event.
/// Hosts forward them to observers; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Started {
        phase: PhaseRef,
        cycles: u32,
        planned_total_secs: u64,
    },
    Paused {
        phase_elapsed_secs: f64,
        total_elapsed_secs: f64,
    },
    Resumed {
        paused_secs: f64,
        total_elapsed_secs: f64,
    },
    Stopped {
        total_elapsed_secs: f64,
        completed: bool,
    },
    PhaseChanged {
        previous: PhaseRef,
        next: PhaseRef,
        /// 1-based cycle the new phase belongs to.
        cycle: u32,
        total_elapsed_secs: f64,
        /// True when the user asked to move on early.
        skipped: bool,
    },
    CycleCompleted {
        cycle: u32,
        cycles: u32,
    },
    Completed {
        cycles: u32,
        total_elapsed_secs: f64,
    },
}

impl Event {
    /// Invoke the matching observer callback.
    pub fn dispatch(&self, observer: &mut dyn TimerObserver) {
        match self {
            Event::Started { .. } => observer.on_start(),
            Event::Paused { .. } => observer.on_pause(),
            Event::Resumed { .. } => observer.on_resume(),
            Event::Stopped { .. } => observer.on_stop(),
            Event::PhaseChanged { previous, next, .. } => observer.on_phase_change(previous, next),
            Event::CycleCompleted { cycle, .. } => observer.on_cycle_complete(*cycle),
            Event::Completed { .. } => observer.on_complete(),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Started { .. } => "started",
            Event::Paused { .. } => "paused",
            Event::Resumed { .. } => "resumed",
            Event::Stopped { .. } => "stopped",
            Event::PhaseChanged { .. } => "phase_changed",
            Event::CycleCompleted { .. } => "cycle_completed",
            Event::Completed { .. } => "completed",
        }
    }
}
