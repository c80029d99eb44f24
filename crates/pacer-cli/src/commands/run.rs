use std::io::Write;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use pacer_core::presentation::{format_clock, format_elapsed};
use pacer_core::storage::{ClockKind, Database, NewSession, RunConfig};
use pacer_core::{
    BreathVisual, ClockSource, Event, Exercise, MonotonicClock, PhaseView, SystemClock,
    TimerSession, TimerState, WorksheetAutosave,
};

use super::load_catalog;

const BAR_WIDTH: usize = 24;

#[derive(Args)]
pub struct RunArgs {
    /// Exercise id (see `pacer exercise list`)
    pub id: String,
    /// Override the number of cycles
    #[arg(long)]
    pub cycles: Option<u32>,
    /// Seconds of "get ready" countdown [default: config run.lead_in_secs]
    #[arg(long)]
    pub lead_in: Option<u32>,
    /// Print events as JSON lines instead of a progress line
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, catalog) = load_catalog()?;
    let mut exercise = catalog.require(&args.id)?.clone();
    if let Some(cycles) = args.cycles {
        exercise = exercise.with_cycles(cycles)?;
    }
    let db = Database::open()?;

    lead_in(args.lead_in.unwrap_or(config.run.lead_in_secs), args.json)?;

    let started_at = Utc::now();
    let elapsed_secs = match config.run.clock {
        ClockKind::Monotonic => {
            drive(&exercise, &config.run, &db, MonotonicClock::new(), args.json)?
        }
        ClockKind::System => drive(&exercise, &config.run, &db, SystemClock, args.json)?,
    };

    db.record_session(&NewSession {
        exercise_id: &exercise.id,
        title: &exercise.title,
        completed: true,
        planned_secs: exercise.planned_secs(),
        elapsed_secs,
        started_at,
        finished_at: Utc::now(),
    })?;

    if !args.json {
        println!("done: {} in {}", exercise.title, format_elapsed(elapsed_secs));
    }
    Ok(())
}

fn lead_in(secs: u32, json: bool) -> std::io::Result<()> {
    if json || secs == 0 {
        return Ok(());
    }
    let mut out = std::io::stdout();
    for remaining in (1..=secs).rev() {
        write!(out, "\rstarting in {remaining}...")?;
        out.flush()?;
        thread::sleep(Duration::from_secs(1));
    }
    writeln!(out, "\r{:<20}", "")?;
    Ok(())
}

/// Run the exercise to completion and return the elapsed seconds.
fn drive<C: ClockSource>(
    exercise: &Exercise,
    settings: &RunConfig,
    db: &Database,
    clock: C,
    json: bool,
) -> Result<f64, Box<dyn std::error::Error>> {
    let period = Duration::from_secs_f64(1.0 / f64::from(settings.tick_hz.max(1)));
    let mut session = TimerSession::new(exercise.timer()?, clock);
    session.subscribe(WorksheetAutosave::new(db, exercise.id.clone()));

    if !json {
        println!("{}", exercise.title);
    }
    let events = session.start()?;
    report(&events, json)?;

    while session.state() != TimerState::Completed {
        thread::sleep(period);
        let events = session.tick();
        report(&events, json)?;
        if !json && session.state() == TimerState::Running {
            let snapshot = session.snapshot();
            let view = PhaseView::from_snapshot(&snapshot, settings.easing);
            render(&view, BreathVisual::for_breathing(&snapshot))?;
        }
    }

    Ok(session.timer().total_elapsed().as_secs_f64())
}

fn report(events: &[Event], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
            continue;
        }
        match event {
            Event::Started { phase, cycles, planned_total_secs } => {
                println!(
                    "{} cycle(s), {} total\n-> {} (cycle 1)",
                    cycles,
                    format_clock(*planned_total_secs),
                    phase.name
                );
            }
            Event::PhaseChanged { next, cycle, .. } => {
                println!("\n-> {} (cycle {})", next.name, cycle);
            }
            Event::Completed { .. } => println!(),
            _ => {}
        }
    }
    Ok(())
}

fn render(view: &PhaseView, breath: Option<BreathVisual>) -> std::io::Result<()> {
    let filled = ((view.eased * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    // Circle scale for breathing phases, blank for steps so the line keeps its width.
    let circle = match breath {
        Some(b) => format!("  o x{:.2}", b.scale),
        None => " ".repeat(9),
    };
    let mut out = std::io::stdout();
    write!(
        out,
        "\r[{}] {:<26} [{}{}] {} left, {:>3.0}%{}",
        view.cycle_label,
        view.phase_name,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        view.remaining_label,
        view.schedule_percent,
        circle,
    )?;
    out.flush()
}
