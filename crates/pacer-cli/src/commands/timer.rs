use chrono::{DateTime, Utc};
use clap::Subcommand;
use pacer_core::storage::{Database, NewSession};
use pacer_core::{
    Event, KeyValueStore, PhasedTimer, SystemClock, TimerSession, TimerSnapshot, TimerState,
    TransitionError, WorksheetAutosave,
};
use serde::{Deserialize, Serialize};

use super::load_catalog;

const TIMER_KEY: &str = "timer";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start an exercise timer in the background
    Start {
        /// Exercise id
        id: String,
        /// Override the number of cycles
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Pause the running timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Move on to the next phase now
    Skip,
    /// Stop the timer and record the session
    Stop,
    /// Print current timer state as JSON
    Status,
}

/// A timer parked in the kv table between CLI invocations.
#[derive(Serialize, Deserialize)]
struct ParkedTimer {
    exercise_id: String,
    title: String,
    planned_secs: u64,
    started_at: DateTime<Utc>,
    /// Set once the completed session has been written to history.
    #[serde(default)]
    recorded: bool,
    timer: PhasedTimer,
}

#[derive(Serialize)]
struct Report<'a> {
    exercise_id: &'a str,
    events: &'a [Event],
    snapshot: TimerSnapshot,
}

fn load_parked(db: &Database) -> Result<Option<ParkedTimer>, Box<dyn std::error::Error>> {
    let Some(json) = db.get(TIMER_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str(&json) {
        Ok(parked) => Ok(Some(parked)),
        Err(e) => {
            db.remove(TIMER_KEY)?;
            Err(format!("stored timer was unreadable and has been discarded: {e}").into())
        }
    }
}

fn save_parked(db: &Database, parked: &ParkedTimer) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(parked)?;
    db.set(TIMER_KEY, &json)?;
    Ok(())
}

fn require_parked(db: &Database) -> Result<ParkedTimer, Box<dyn std::error::Error>> {
    load_parked(db)?.ok_or_else(|| "no timer; start one with `pacer timer start <id>`".into())
}

fn record(db: &Database, parked: &mut ParkedTimer) -> Result<(), Box<dyn std::error::Error>> {
    if parked.recorded || parked.timer.state() == TimerState::Idle {
        return Ok(());
    }
    db.record_session(&NewSession {
        exercise_id: &parked.exercise_id,
        title: &parked.title,
        completed: parked.timer.state() == TimerState::Completed,
        planned_secs: parked.planned_secs,
        elapsed_secs: parked.timer.total_elapsed().as_secs_f64(),
        started_at: parked.started_at,
        finished_at: Utc::now(),
    })?;
    parked.recorded = true;
    Ok(())
}

fn print_report(parked: &ParkedTimer, events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
    let report = Report {
        exercise_id: &parked.exercise_id,
        events,
        snapshot: parked.timer.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Apply one command to the parked timer with worksheet autosave attached.
///
/// Events from catching up are returned even when the command is refused.
fn apply(
    db: &Database,
    parked: &mut ParkedTimer,
    command: impl FnOnce(&mut TimerSession<'_, SystemClock>) -> Result<Vec<Event>, TransitionError>,
) -> (Vec<Event>, Option<TransitionError>) {
    let mut session = TimerSession::new(parked.timer.clone(), SystemClock);
    session.subscribe(WorksheetAutosave::new(db, parked.exercise_id.clone()));
    // Catch up on anything that happened while no process was watching.
    let mut events = session.tick();
    let result = command(&mut session);
    parked.timer = session.into_timer();
    match result {
        Ok(more) => {
            events.extend(more);
            (events, None)
        }
        Err(refused) => (events, Some(refused)),
    }
}

/// Bring the parked timer up to now, recording the session if it finished.
fn catch_up(
    db: &Database,
    parked: &mut ParkedTimer,
) -> Result<Vec<Event>, Box<dyn std::error::Error>> {
    let (events, _) = apply(db, parked, |_| Ok(Vec::new()));
    if parked.timer.state() == TimerState::Completed {
        record(db, parked)?;
    }
    Ok(events)
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TimerAction::Start { id, cycles } => {
            if let Some(mut existing) = load_parked(&db)? {
                catch_up(&db, &mut existing)?;
                save_parked(&db, &existing)?;
                if matches!(existing.timer.state(), TimerState::Running | TimerState::Paused) {
                    return Err(format!(
                        "timer for '{}' is still active; stop it first",
                        existing.exercise_id
                    )
                    .into());
                }
            }
            let (_, catalog) = load_catalog()?;
            let mut exercise = catalog.require(&id)?.clone();
            if let Some(cycles) = cycles {
                exercise = exercise.with_cycles(cycles)?;
            }
            let mut parked = ParkedTimer {
                exercise_id: exercise.id.clone(),
                title: exercise.title.clone(),
                planned_secs: exercise.planned_secs(),
                started_at: Utc::now(),
                recorded: false,
                timer: exercise.timer()?,
            };
            let (events, refused) = apply(&db, &mut parked, |s| s.start());
            if let Some(refused) = refused {
                return Err(refused.into());
            }
            save_parked(&db, &parked)?;
            print_report(&parked, &events)?;
        }
        TimerAction::Pause | TimerAction::Resume | TimerAction::Skip | TimerAction::Status => {
            let mut parked = require_parked(&db)?;
            let (events, refused) = apply(&db, &mut parked, |s| match action {
                TimerAction::Pause => s.pause(),
                TimerAction::Resume => s.resume(),
                TimerAction::Skip => s.skip(),
                _ => Ok(Vec::new()),
            });
            if parked.timer.state() == TimerState::Completed {
                record(&db, &mut parked)?;
            }
            save_parked(&db, &parked)?;
            // The report goes out even for a refused command so catch-up
            // events such as `completed` are never lost.
            print_report(&parked, &events)?;
            if let Some(refused) = refused {
                return Err(refused.into());
            }
        }
        TimerAction::Stop => {
            let mut parked = require_parked(&db)?;
            // Record before stopping; stop rewinds the elapsed counters.
            let mut events = catch_up(&db, &mut parked)?;
            record(&db, &mut parked)?;
            let (stopped, refused) = apply(&db, &mut parked, |s| s.stop());
            events.extend(stopped);
            db.remove(TIMER_KEY)?;
            print_report(&parked, &events)?;
            if let Some(refused) = refused {
                return Err(refused.into());
            }
        }
    }
    Ok(())
}
