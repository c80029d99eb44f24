use clap::Subcommand;
use pacer_core::storage::Database;
use pacer_core::Worksheet;
use tracing::warn;

use super::load_catalog;

#[derive(Subcommand)]
pub enum WorksheetAction {
    /// Record an answer (an empty value removes it)
    Set {
        /// Exercise id
        exercise: String,
        /// Worksheet field (see `pacer exercise show <id>`)
        field: String,
        /// Answer text
        value: String,
    },
    /// Show answers and progress
    Show {
        /// Exercise id
        exercise: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the stored worksheet
    Clear {
        /// Exercise id
        exercise: String,
    },
}

pub fn run(action: WorksheetAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, catalog) = load_catalog()?;
    let db = Database::open()?;

    match action {
        WorksheetAction::Set {
            exercise,
            field,
            value,
        } => {
            let known = catalog.require(&exercise)?;
            if !known.prompts.iter().any(|p| p == &field) {
                warn!(exercise = %exercise, field = %field, "field is not one of the exercise prompts");
            }
            let mut sheet = Worksheet::load(&db, &exercise)?;
            sheet.answer(&field, &value);
            sheet.save(&db)?;
            println!("{}% complete", sheet.completion_pct(&known.prompts));
        }
        WorksheetAction::Show { exercise, json } => {
            let known = catalog.require(&exercise)?;
            let sheet = Worksheet::load(&db, &exercise)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sheet)?);
                return Ok(());
            }
            println!(
                "{} - {}% complete{}",
                known.title,
                sheet.completion_pct(&known.prompts),
                if sheet.completed { ", exercise finished" } else { "" }
            );
            for prompt in &known.prompts {
                let answer = sheet.answers.get(prompt).map(String::as_str).unwrap_or("");
                println!("  {prompt:<16} {answer}");
            }
            for (field, answer) in sheet.answers.iter().filter(|(k, _)| !known.prompts.contains(*k)) {
                println!("  {field:<16} {answer}");
            }
        }
        WorksheetAction::Clear { exercise } => {
            catalog.require(&exercise)?;
            Worksheet::clear(&db, &exercise)?;
            println!("worksheet cleared");
        }
    }
    Ok(())
}
