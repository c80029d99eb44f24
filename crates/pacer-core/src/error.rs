//! Core error types for pacer-core.
//!
//! This module defines the error hierarchy using thiserror. Schedule
//! errors are fatal to `configure()`; transition errors are recoverable
//! misuse reports that leave the timer untouched.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pacer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Schedule validation errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Timer misuse
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unknown exercise id
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised by `configure()` when a schedule cannot be run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// No phases at all
    #[error("schedule must contain at least one phase")]
    Empty,

    /// A phase with a zero duration
    #[error("phase '{name}' (#{ordinal}) must have a positive duration")]
    NonPositiveDuration { name: String, ordinal: usize },

    /// Repeat count of zero
    #[error("cycle count must be at least 1")]
    ZeroCycles,

    /// A restored timer points outside its own schedule
    #[error("saved position (phase {phase_index}, cycle {cycle}) is outside a schedule of {phases} phase(s) x {cycles} cycle(s)")]
    PositionOutOfRange {
        phase_index: usize,
        cycle: u32,
        phases: usize,
        cycles: u32,
    },
}

/// Attempted command that does not apply to the current timer state.
///
/// These never change timer state; callers log and carry on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("timer is already running")]
    AlreadyRunning,

    #[error("timer is already paused")]
    AlreadyPaused,

    #[error("timer is not paused")]
    NotPaused,

    #[error("timer has not been started")]
    NotStarted,

    #[error("timer has already completed")]
    AlreadyCompleted,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be created
    #[error("Failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
