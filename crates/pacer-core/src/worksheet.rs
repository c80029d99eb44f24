//! Worksheet answers collected while an exercise runs.
//!
//! A worksheet is stored as JSON under `worksheet:<exercise id>` in any
//! [`KeyValueStore`]. [`WorksheetAutosave`] keeps the stored copy's progress
//! fields current as the timer moves through phases.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, StorageError};
use crate::events::PhaseRef;
use crate::observer::TimerObserver;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub exercise: String,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    /// Index of the last phase reached.
    #[serde(default)]
    pub last_phase: Option<usize>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn storage_key(exercise: &str) -> String {
    format!("worksheet:{exercise}")
}

impl Worksheet {
    pub fn new(exercise: impl Into<String>) -> Self {
        Self {
            exercise: exercise.into(),
            ..Self::default()
        }
    }

    /// Stored worksheet for `exercise`, or an empty one.
    pub fn load(store: &impl KeyValueStore, exercise: &str) -> Result<Self, CoreError> {
        match store.get(&storage_key(exercise))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Self::new(exercise)),
        }
    }

    pub fn save(&mut self, store: &impl KeyValueStore) -> Result<(), CoreError> {
        self.updated_at = Some(Utc::now());
        let raw = serde_json::to_string(self)?;
        store.set(&storage_key(&self.exercise), &raw)?;
        Ok(())
    }

    pub fn clear(store: &impl KeyValueStore, exercise: &str) -> Result<(), StorageError> {
        store.remove(&storage_key(exercise))
    }

    /// Set an answer. Blank values remove it.
    pub fn answer(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.answers.remove(field);
        } else {
            self.answers.insert(field.to_string(), value.to_string());
        }
    }

    /// Percentage of `prompts` that have an answer.
    pub fn completion_pct(&self, prompts: &[String]) -> u8 {
        if prompts.is_empty() {
            return if self.completed { 100 } else { 0 };
        }
        let answered = prompts
            .iter()
            .filter(|p| self.answers.contains_key(p.as_str()))
            .count();
        ((answered * 100) / prompts.len()) as u8
    }
}

/// Observer that records phase progress into the stored worksheet.
///
/// Each save re-reads the stored copy so answers written elsewhere are
/// never overwritten.
pub struct WorksheetAutosave<S: KeyValueStore> {
    store: S,
    exercise: String,
}

impl<S: KeyValueStore> WorksheetAutosave<S> {
    pub fn new(store: S, exercise: impl Into<String>) -> Self {
        Self {
            store,
            exercise: exercise.into(),
        }
    }

    fn persist(&self, update: impl FnOnce(&mut Worksheet)) {
        let result = Worksheet::load(&self.store, &self.exercise).and_then(|mut sheet| {
            update(&mut sheet);
            sheet.save(&self.store)
        });
        match result {
            Ok(()) => debug!(exercise = %self.exercise, "worksheet autosaved"),
            Err(e) => warn!(exercise = %self.exercise, error = %e, "worksheet autosave failed"),
        }
    }
}

impl<S: KeyValueStore> TimerObserver for WorksheetAutosave<S> {
    fn on_start(&mut self) {
        self.persist(|sheet| {
            sheet.completed = false;
            sheet.last_phase = Some(0);
        });
    }

    fn on_phase_change(&mut self, _previous: &PhaseRef, next: &PhaseRef) {
        let index = next.index;
        self.persist(|sheet| {
            sheet.last_phase = Some(sheet.last_phase.map_or(index, |p| p.max(index)));
        });
    }

    fn on_complete(&mut self) {
        self.persist(|sheet| sheet.completed = true);
    }
}
