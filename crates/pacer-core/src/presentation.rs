//! Display values derived from a [`TimerSnapshot`].
//!
//! Everything here is a pure function of the snapshot: no hidden state, so
//! a view can be rebuilt at any instant without replaying history.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::timer::{PhaseKind, TimerSnapshot, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    InSine,
    OutSine,
    #[default]
    InOutSine,
}

impl Easing {
    /// Map `t` (clamped to 0..=1) onto the curve. Endpoints are fixed at 0 and 1.
    pub fn apply(self, t: f64) -> f64 {
        let t = clamp_unit(t);
        match self {
            Easing::Linear => t,
            Easing::InSine => 1.0 - ((t * PI) / 2.0).cos(),
            Easing::OutSine => ((t * PI) / 2.0).sin(),
            Easing::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
        }
    }
}

fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Fraction of a phase that has elapsed, in `0.0..=1.0`.
pub fn linear_progress(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 1.0;
    }
    clamp_unit(elapsed_secs / duration_secs)
}

/// `m:ss` with zero-padded seconds.
pub fn format_clock(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Countdown label. Rounds up so it never reads 0:00 while time remains.
pub fn format_remaining(secs: f64) -> String {
    format_clock(whole_secs(secs.ceil()))
}

/// Count-up label. Rounds down so a second is only shown once it has passed.
pub fn format_elapsed(secs: f64) -> String {
    format_clock(whole_secs(secs.floor()))
}

fn whole_secs(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    }
}

/// Everything a progress display needs for the current phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseView {
    pub phase_name: String,
    pub phase_kind: PhaseKind,
    /// Linear fraction for progress bars.
    pub fraction: f64,
    /// Eased fraction for animation.
    pub eased: f64,
    pub remaining_label: String,
    pub elapsed_label: String,
    pub total_elapsed_label: String,
    /// 0.0 .. 100.0 across the whole planned run.
    pub schedule_percent: f64,
    /// e.g. "2/5"; empty before the first start.
    pub cycle_label: String,
}

impl PhaseView {
    pub fn from_snapshot(snapshot: &TimerSnapshot, easing: Easing) -> Self {
        let duration = f64::from(snapshot.phase_duration_secs);
        let fraction = linear_progress(snapshot.phase_elapsed_secs, duration);
        Self {
            phase_name: snapshot.phase_name.clone(),
            phase_kind: snapshot.phase_kind,
            fraction,
            eased: easing.apply(fraction),
            remaining_label: format_remaining(snapshot.phase_remaining_secs()),
            elapsed_label: format_elapsed(snapshot.phase_elapsed_secs),
            total_elapsed_label: format_elapsed(snapshot.total_elapsed_secs),
            schedule_percent: schedule_percent(snapshot),
            cycle_label: if snapshot.cycle == 0 {
                String::new()
            } else {
                format!("{}/{}", snapshot.cycle, snapshot.cycles)
            },
        }
    }
}

/// 0.0 .. 100.0 progress across the entire planned run.
pub fn schedule_percent(snapshot: &TimerSnapshot) -> f64 {
    if snapshot.planned_total_secs == 0 {
        return 0.0;
    }
    (snapshot.schedule_position_secs / snapshot.planned_total_secs as f64 * 100.0).clamp(0.0, 100.0)
}

const REST_SCALE: f64 = 1.0;
const FULL_SCALE: f64 = 1.6;
const REST_OPACITY: f64 = 0.6;

/// Size and opacity of the breathing circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreathVisual {
    pub scale: f64,
    pub opacity: f64,
}

impl BreathVisual {
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        if !matches!(snapshot.state, TimerState::Running | TimerState::Paused) {
            return Self::rest();
        }
        let progress = linear_progress(
            snapshot.phase_elapsed_secs,
            f64::from(snapshot.phase_duration_secs),
        );
        match snapshot.phase_kind {
            PhaseKind::Inhale => {
                let p = Easing::InOutSine.apply(progress);
                Self {
                    scale: REST_SCALE + (FULL_SCALE - REST_SCALE) * p,
                    opacity: 0.5 + 0.3 * p,
                }
            }
            PhaseKind::Hold => Self {
                // Gentle float, one period per second.
                scale: FULL_SCALE + (snapshot.phase_elapsed_secs * PI * 2.0).sin() * 0.02,
                opacity: 0.8,
            },
            PhaseKind::Exhale => {
                let p = Easing::OutSine.apply(progress);
                Self {
                    scale: FULL_SCALE - (FULL_SCALE - REST_SCALE) * p,
                    opacity: 0.8 - 0.3 * p,
                }
            }
            PhaseKind::Step => Self::rest(),
        }
    }

    /// The circle for breathing phases; `None` for plain steps.
    pub fn for_breathing(snapshot: &TimerSnapshot) -> Option<Self> {
        match snapshot.phase_kind {
            PhaseKind::Step => None,
            _ => Some(Self::from_snapshot(snapshot)),
        }
    }

    fn rest() -> Self {
        Self {
            scale: REST_SCALE,
            opacity: REST_OPACITY,
        }
    }
}
