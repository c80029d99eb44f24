mod config;
pub mod database;
mod kv;

pub use config::{ClockKind, Config, ExerciseConfig, RunConfig};
pub use database::{Database, NewSession, SessionRecord, Stats};
pub use kv::{KeyValueStore, MemoryStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `PACER_DATA_DIR` wins when set. Otherwise `~/.config/pacer[-dev]/`,
/// with the `-dev` suffix selected by `PACER_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("PACER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PACER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pacer-dev")
            } else {
                base_dir.join("pacer")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| StorageError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
