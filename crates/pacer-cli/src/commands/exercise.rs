use clap::Subcommand;
use pacer_core::presentation::format_clock;

use super::load_catalog;

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// List built-in and custom exercises
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show phases of one exercise
    Show {
        /// Exercise id (e.g. "breathing-reset")
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ExerciseAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, catalog) = load_catalog()?;

    match action {
        ExerciseAction::List { json } => {
            if json {
                let all: Vec<_> = catalog.iter().collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
                return Ok(());
            }
            for exercise in catalog.iter() {
                println!(
                    "{:<20} {:>6}  {}",
                    exercise.id,
                    format_clock(exercise.planned_secs()),
                    exercise.title
                );
            }
        }
        ExerciseAction::Show { id, json } => {
            let exercise = catalog.require(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(exercise)?);
                return Ok(());
            }
            println!("{} ({})", exercise.title, exercise.id);
            if !exercise.description.is_empty() {
                println!("{}", exercise.description);
            }
            println!(
                "{} phase(s) x {} cycle(s), {} total",
                exercise.schedule.len(),
                exercise.cycles,
                format_clock(exercise.planned_secs())
            );
            for phase in exercise.schedule.phases() {
                println!(
                    "  {:>2}. {:<28} {:>6}",
                    phase.ordinal + 1,
                    phase.name,
                    format_clock(u64::from(phase.duration_secs))
                );
            }
            if !exercise.prompts.is_empty() {
                println!("worksheet fields: {}", exercise.prompts.join(", "));
            }
        }
    }
    Ok(())
}
