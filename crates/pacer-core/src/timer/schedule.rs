use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// What the user is asked to do during a phase.
///
/// Breathing kinds drive the expanding/contracting visual; everything
/// else is a plain timed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Inhale,
    Hold,
    Exhale,
    #[default]
    Step,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    /// Duration in whole seconds. Must be positive.
    pub duration_secs: u32,
    /// Position within the schedule, assigned by [`Schedule::new`].
    #[serde(default)]
    pub ordinal: usize,
    #[serde(default)]
    pub kind: PhaseKind,
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            ordinal: 0,
            kind: PhaseKind::Step,
        }
    }

    pub fn inhale(duration_secs: u32) -> Self {
        Self::new("Inhale", duration_secs).with_kind(PhaseKind::Inhale)
    }

    pub fn hold(duration_secs: u32) -> Self {
        Self::new("Hold", duration_secs).with_kind(PhaseKind::Hold)
    }

    pub fn exhale(duration_secs: u32) -> Self {
        Self::new("Exhale", duration_secs).with_kind(PhaseKind::Exhale)
    }

    pub fn with_kind(mut self, kind: PhaseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.duration_secs))
    }
}

/// Ordered, validated list of phases making up one cycle.
///
/// The only way to build one is [`Schedule::new`], so a `Schedule` is
/// never empty and never holds a zero-length phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    phases: Vec<PhaseSpec>,
}

impl Schedule {
    pub fn new(phases: Vec<PhaseSpec>) -> Result<Self, ScheduleError> {
        if phases.is_empty() {
            return Err(ScheduleError::Empty);
        }
        let mut phases = phases;
        for (ordinal, phase) in phases.iter_mut().enumerate() {
            phase.ordinal = ordinal;
            if phase.duration_secs == 0 {
                return Err(ScheduleError::NonPositiveDuration {
                    name: phase.name.clone(),
                    ordinal,
                });
            }
        }
        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    pub fn get(&self, index: usize) -> Option<&PhaseSpec> {
        self.phases.get(index)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Seconds in one traversal of the schedule.
    pub fn total_duration_secs(&self) -> u64 {
        self.phases.iter().map(|p| u64::from(p.duration_secs)).sum()
    }

    /// Cumulative seconds up to (but not including) `index`.
    pub fn cumulative_secs(&self, index: usize) -> u64 {
        self.phases
            .iter()
            .take(index)
            .map(|p| u64::from(p.duration_secs))
            .sum()
    }
}

// Deserialization re-runs validation so a hand-edited file cannot smuggle
// in an empty schedule.
impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            phases: Vec<PhaseSpec>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Schedule::new(raw.phases).map_err(serde::de::Error::custom)
    }
}
