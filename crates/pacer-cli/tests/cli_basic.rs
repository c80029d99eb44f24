//! Basic CLI E2E tests.
//!
//! Each test drives the built `pacer` binary against its own temporary
//! data directory.

use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use pacer_core::storage::Database;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pacer"))
        .args(args)
        .env("PACER_DATA_DIR", data_dir)
        .env("PACER_LOG", "error")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn parse_json(out: &str) -> serde_json::Value {
    serde_json::from_str(out).expect("Failed to parse JSON output")
}

/// A two-second custom exercise with no lead-in, for runs that finish fast.
fn write_quick_config(data_dir: &Path) {
    std::fs::write(
        data_dir.join("config.toml"),
        r#"
[[exercises]]
id = "quick"
title = "Quick"
prompts = ["feeling"]

[[exercises.phases]]
name = "In"
duration_secs = 1
kind = "inhale"

[[exercises.phases]]
name = "Out"
duration_secs = 1
kind = "exhale"

[run]
tick_hz = 20
lead_in_secs = 0
"#,
    )
    .unwrap();
}

#[test]
fn test_exercise_list() {
    let dir = TempDir::new().unwrap();
    let out = run_ok(dir.path(), &["exercise", "list"]);
    assert!(out.contains("breathing-reset"));
    assert!(out.contains("decision-triage"));
    assert!(out.contains("15:00"));
}

#[test]
fn test_exercise_list_json_includes_custom() {
    let dir = TempDir::new().unwrap();
    write_quick_config(dir.path());
    let out = run_ok(dir.path(), &["exercise", "list", "--json"]);
    let list = parse_json(&out);
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"quick"));
    assert!(ids.contains(&"box-breathing"));
}

#[test]
fn test_exercise_show() {
    let dir = TempDir::new().unwrap();
    let out = run_ok(dir.path(), &["exercise", "show", "box-breathing"]);
    assert!(out.contains("Box Breathing"));
    assert!(out.contains("4 phase(s) x 4 cycle(s), 1:04 total"));
}

#[test]
fn test_unknown_exercise_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["exercise", "show", "juggling"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: Unknown exercise: juggling"));
}

#[test]
fn test_run_records_session() {
    let dir = TempDir::new().unwrap();
    write_quick_config(dir.path());
    let out = run_ok(dir.path(), &["run", "quick", "--json"]);
    let events: Vec<serde_json::Value> = out.lines().map(parse_json).collect();
    assert_eq!(events.first().unwrap()["type"], "started");
    assert_eq!(events.last().unwrap()["type"], "completed");
    assert!(events.iter().any(|e| e["type"] == "phase_changed"));

    let stats = parse_json(&run_ok(dir.path(), &["stats", "all"]));
    assert_eq!(stats["total_sessions"], 1);
    assert_eq!(stats["completed_sessions"], 1);
    assert_eq!(stats["by_exercise"]["quick"], 1);

    let sheet = parse_json(&run_ok(dir.path(), &["worksheet", "show", "quick", "--json"]));
    assert_eq!(sheet["completed"], true);
}

#[test]
fn test_timer_lifecycle() {
    let dir = TempDir::new().unwrap();

    let started = parse_json(&run_ok(dir.path(), &["timer", "start", "decision-triage"]));
    assert_eq!(started["events"][0]["type"], "started");
    assert_eq!(started["snapshot"]["state"], "running");

    let (_, stderr, code) = run_cli(dir.path(), &["timer", "start", "box-breathing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("still active"));

    let paused = parse_json(&run_ok(dir.path(), &["timer", "pause"]));
    assert_eq!(paused["snapshot"]["state"], "paused");

    let (_, stderr, code) = run_cli(dir.path(), &["timer", "pause"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already paused"));

    let skipped = parse_json(&run_ok(dir.path(), &["timer", "skip"]));
    assert_eq!(skipped["events"][0]["type"], "phase_changed");
    assert_eq!(skipped["events"][0]["skipped"], true);
    assert_eq!(skipped["snapshot"]["current_phase_index"], 1);

    run_ok(dir.path(), &["timer", "resume"]);
    let status = parse_json(&run_ok(dir.path(), &["timer", "status"]));
    assert_eq!(status["snapshot"]["phase_name"], "Zoom Out/In");

    let stopped = parse_json(&run_ok(dir.path(), &["timer", "stop"]));
    assert_eq!(stopped["events"][0]["type"], "stopped");
    assert_eq!(stopped["events"][0]["completed"], false);

    let stats = parse_json(&run_ok(dir.path(), &["stats", "today"]));
    assert_eq!(stats["total_sessions"], 1);
    assert_eq!(stats["completed_sessions"], 0);

    let (_, stderr, code) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no timer"));
}

#[test]
fn test_timer_command_after_run_finished_reports_completion() {
    let dir = TempDir::new().unwrap();
    write_quick_config(dir.path());
    run_ok(dir.path(), &["timer", "start", "quick"]);
    thread::sleep(Duration::from_millis(2500));

    let (stdout, stderr, code) = run_cli(dir.path(), &["timer", "pause"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already completed"), "{stderr}");
    let report = parse_json(&stdout);
    let kinds: Vec<&str> = report["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"completed"), "{kinds:?}");
    assert_eq!(report["snapshot"]["state"], "completed");

    let stats = parse_json(&run_ok(dir.path(), &["stats", "all"]));
    assert_eq!(stats["completed_sessions"], 1);
}

#[test]
fn test_timer_restart_after_schedule_elapsed() {
    let dir = TempDir::new().unwrap();
    write_quick_config(dir.path());
    run_ok(dir.path(), &["timer", "start", "quick"]);
    thread::sleep(Duration::from_millis(2500));

    let restarted = parse_json(&run_ok(dir.path(), &["timer", "start", "quick"]));
    assert_eq!(restarted["snapshot"]["state"], "running");

    let stats = parse_json(&run_ok(dir.path(), &["stats", "all"]));
    assert_eq!(stats["total_sessions"], 1);
    assert_eq!(stats["completed_sessions"], 1);
}

#[test]
fn test_unreadable_timer_row_is_discarded() {
    let dir = TempDir::new().unwrap();
    write_quick_config(dir.path());
    run_ok(dir.path(), &["timer", "start", "quick"]);

    let db = Database::open_at(&dir.path().join("pacer.db")).unwrap();
    let stored = db.kv_get("timer").unwrap().unwrap();
    let mut row: serde_json::Value = serde_json::from_str(&stored).unwrap();
    row["timer"]["phase_index"] = serde_json::json!(5);
    db.kv_set("timer", &row.to_string()).unwrap();
    drop(db);

    let (_, stderr, code) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("discarded"), "{stderr}");

    let (_, stderr, code) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no timer"), "{stderr}");
}

#[test]
fn test_worksheet_set_show_clear() {
    let dir = TempDir::new().unwrap();
    let out = run_ok(
        dir.path(),
        &["worksheet", "set", "regulation-reset", "emotion_label", "frustrated"],
    );
    assert_eq!(out.trim(), "33% complete");

    let out = run_ok(dir.path(), &["worksheet", "show", "regulation-reset"]);
    assert!(out.contains("frustrated"));

    run_ok(dir.path(), &["worksheet", "clear", "regulation-reset"]);
    let sheet = parse_json(&run_ok(
        dir.path(),
        &["worksheet", "show", "regulation-reset", "--json"],
    ));
    assert!(sheet["answers"].as_object().unwrap().is_empty());
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "run.tick_hz"]).trim(), "4");
    run_ok(dir.path(), &["config", "set", "run.tick_hz", "10"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "run.tick_hz"]).trim(), "10");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "run.clock", "sundial"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "run.nope"]);
    assert_eq!(code, 1);

    run_ok(dir.path(), &["config", "reset"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "run.tick_hz"]).trim(), "4");

    let path = run_ok(dir.path(), &["config", "path"]);
    assert!(path.trim().ends_with("config.toml"));
}

#[test]
fn test_stats_empty() {
    let dir = TempDir::new().unwrap();
    let stats = parse_json(&run_ok(dir.path(), &["stats", "all"]));
    assert_eq!(stats["total_sessions"], 0);
    let recent = parse_json(&run_ok(dir.path(), &["stats", "recent"]));
    assert!(recent.as_array().unwrap().is_empty());
}
