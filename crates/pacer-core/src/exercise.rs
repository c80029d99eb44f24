//! Guided exercises: a titled schedule with a cycle count and the
//! worksheet prompts answered along the way.

use serde::Serialize;

use crate::error::{ConfigError, CoreError, ScheduleError};
use crate::storage::{Config, ExerciseConfig};
use crate::timer::{PhaseKind, PhaseSpec, PhasedTimer, Schedule};

#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    pub description: String,
    pub schedule: Schedule,
    pub cycles: u32,
    pub prompts: Vec<String>,
}

impl Exercise {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        phases: Vec<PhaseSpec>,
        cycles: u32,
    ) -> Result<Self, ScheduleError> {
        if cycles == 0 {
            return Err(ScheduleError::ZeroCycles);
        }
        Ok(Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            schedule: Schedule::new(phases)?,
            cycles,
            prompts: Vec::new(),
        })
    }

    fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn with_prompts(mut self, prompts: &[&str]) -> Self {
        self.prompts = prompts.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Same exercise with a different repeat count.
    pub fn with_cycles(mut self, cycles: u32) -> Result<Self, ScheduleError> {
        if cycles == 0 {
            return Err(ScheduleError::ZeroCycles);
        }
        self.cycles = cycles;
        Ok(self)
    }

    pub fn planned_secs(&self) -> u64 {
        self.schedule.total_duration_secs() * u64::from(self.cycles)
    }

    /// A fresh idle timer for this exercise.
    pub fn timer(&self) -> Result<PhasedTimer, ScheduleError> {
        PhasedTimer::new(self.schedule.clone(), self.cycles)
    }
}

impl TryFrom<&ExerciseConfig> for Exercise {
    type Error = ScheduleError;

    fn try_from(cfg: &ExerciseConfig) -> Result<Self, Self::Error> {
        let mut exercise = Exercise::new(&cfg.id, &cfg.title, cfg.phases.clone(), cfg.cycles)?;
        exercise.description = cfg.description.clone();
        exercise.prompts = cfg.prompts.clone();
        Ok(exercise)
    }
}

fn step(name: &str, secs: u32) -> PhaseSpec {
    PhaseSpec::new(name, secs)
}

/// Built-in exercises.
///
/// # Errors
/// Fails only if a hard-coded schedule is invalid.
pub fn presets() -> Result<Vec<Exercise>, ScheduleError> {
    let breathing = Exercise::new(
        "breathing-reset",
        "60-Second Breathing Reset",
        vec![
            PhaseSpec::new("Breathe In", 4).with_kind(PhaseKind::Inhale),
            PhaseSpec::new("Hold", 2).with_kind(PhaseKind::Hold),
            PhaseSpec::new("Breathe Out", 6).with_kind(PhaseKind::Exhale),
        ],
        5,
    )?
    .described("4s inhale, 2s hold, 6s exhale, five rounds.");

    let box_breathing = Exercise::new(
        "box-breathing",
        "Box Breathing",
        vec![
            PhaseSpec::new("Breathe In", 4).with_kind(PhaseKind::Inhale),
            PhaseSpec::new("Hold", 4).with_kind(PhaseKind::Hold),
            PhaseSpec::new("Breathe Out", 4).with_kind(PhaseKind::Exhale),
            PhaseSpec::new("Hold", 4).with_kind(PhaseKind::Hold),
        ],
        4,
    )?
    .described("Four equal sides of four seconds each.");

    let triage = Exercise::new(
        "decision-triage",
        "Decision Triage",
        vec![
            step("Clarify Purpose", 120),
            step("Zoom Out/In", 180),
            step("Constraint Box", 180),
            step("Risk Pass", 180),
            step("Commit", 240),
        ],
        1,
    )?
    .described("15-minute crisis resolution protocol.")
    .with_prompts(&[
        "purpose",
        "zoom_out",
        "zoom_in",
        "option1",
        "option2",
        "option3",
        "risk1",
        "guardrail1",
        "risk2",
        "guardrail2",
        "chosen_option",
        "first_step",
        "success_metric",
    ]);

    let sprint = Exercise::new(
        "reframing-sprint",
        "Reframing Sprint",
        vec![
            step("Bridge → Purpose", 120),
            step("Tool #1: What Else?", 180),
            step("Tool #2: 3 Perspectives", 180),
            step("Tool #3: Constraint Box", 120),
            step("Pick & Plan", 120),
        ],
        1,
    )?
    .described("12-minute sprint through three reframing tools.")
    .with_prompts(&[
        "bridge",
        "purpose",
        "what_else",
        "user_hat",
        "skeptic_hat",
        "builder_hat",
        "constraint_box",
        "chosen_option",
        "success_metric",
        "first_step",
    ]);

    let mut reset = Vec::new();
    for _ in 0..5 {
        reset.push(PhaseSpec::inhale(4));
        reset.push(PhaseSpec::hold(1));
        reset.push(PhaseSpec::exhale(4));
    }
    reset.push(step("Label the Emotion", 20));
    reset.push(step("Reconnect to Purpose", 20));
    reset.push(step("Choose Next Action", 20));
    let regulation = Exercise::new("regulation-reset", "90-Second Regulation Reset", reset, 1)?
        .described("Five slow breaths, then label, purpose and next action.")
        .with_prompts(&["emotion_label", "purpose", "next_action"]);

    Ok(vec![breathing, box_breathing, triage, sprint, regulation])
}

/// Presets plus user-defined exercises. A user exercise with a preset's id
/// replaces the preset.
#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
}

impl ExerciseCatalog {
    pub fn builtin() -> Result<Self, ScheduleError> {
        Ok(Self {
            exercises: presets()?,
        })
    }

    /// # Errors
    /// Returns an error naming the first user exercise whose schedule is invalid.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        let mut catalog = Self::builtin()?;
        for cfg in &config.exercises {
            let exercise = Exercise::try_from(cfg).map_err(|e| {
                CoreError::Config(ConfigError::InvalidValue {
                    key: format!("exercises.{}", cfg.id),
                    message: e.to_string(),
                })
            })?;
            catalog.insert(exercise);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, exercise: Exercise) {
        match self.exercises.iter_mut().find(|e| e.id == exercise.id) {
            Some(existing) => *existing = exercise,
            None => self.exercises.push(exercise),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Exercise, CoreError> {
        self.get(id)
            .ok_or_else(|| CoreError::UnknownExercise(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}
