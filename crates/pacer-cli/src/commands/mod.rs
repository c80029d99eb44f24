pub mod config;
pub mod exercise;
pub mod run;
pub mod stats;
pub mod timer;
pub mod worksheet;

use pacer_core::{Config, ExerciseCatalog};

/// User config and the exercise catalog it extends.
pub(crate) fn load_catalog() -> Result<(Config, ExerciseCatalog), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = ExerciseCatalog::from_config(&config)?;
    Ok((config, catalog))
}
