//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Finished exercise sessions (completed or stopped early)
//! - Session statistics (daily and all-time)
//! - Key-value store for worksheets and the parked CLI timer

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::kv::KeyValueStore;
use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub exercise_id: String,
    pub title: String,
    pub completed: bool,
    pub planned_secs: u64,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A session about to be written; `id` is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub exercise_id: &'a str,
    pub title: &'a str,
    pub completed: bool,
    pub planned_secs: u64,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub total_practice_secs: f64,
    pub today_sessions: u64,
    pub today_practice_secs: f64,
    /// Completed sessions per exercise id.
    pub by_exercise: BTreeMap<String, u64>,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/pacer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("pacer.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                exercise_id  TEXT NOT NULL,
                title        TEXT NOT NULL DEFAULT '',
                completed    INTEGER NOT NULL,
                planned_secs INTEGER NOT NULL,
                elapsed_secs REAL NOT NULL,
                started_at   TEXT NOT NULL,
                finished_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_finished_at ON sessions(finished_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_exercise ON sessions(exercise_id);",
        )?;
        Ok(())
    }

    /// Record a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, session: &NewSession<'_>) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (exercise_id, title, completed, planned_secs, elapsed_secs, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.exercise_id,
                session.title,
                session.completed,
                session.planned_secs,
                session.elapsed_secs,
                session.started_at.to_rfc3339(),
                session.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, title, completed, planned_secs, elapsed_secs, started_at, finished_at
             FROM sessions
             ORDER BY finished_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, exercise_id, title, completed, planned_secs, elapsed_secs, started, finished) =
                row?;
            sessions.push(SessionRecord {
                id,
                exercise_id,
                title,
                completed,
                planned_secs,
                elapsed_secs,
                started_at: parse_timestamp(&started)?,
                finished_at: parse_timestamp(&finished)?,
            });
        }
        Ok(sessions)
    }

    pub fn stats_today(&self) -> Result<Stats, StorageError> {
        self.stats_since(Some(today_start()))
    }

    pub fn stats_all(&self) -> Result<Stats, StorageError> {
        self.stats_since(None)
    }

    fn stats_since(&self, since: Option<String>) -> Result<Stats, StorageError> {
        let since = since.unwrap_or_default();
        let mut stmt = self.conn.prepare(
            "SELECT exercise_id, completed, COUNT(*), COALESCE(SUM(elapsed_secs), 0)
             FROM sessions
             WHERE finished_at >= ?1
             GROUP BY exercise_id, completed",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (exercise_id, completed, count, secs) = row?;
            stats.total_sessions += count;
            stats.total_practice_secs += secs;
            if completed {
                stats.completed_sessions += count;
                *stats.by_exercise.entry(exercise_id).or_insert(0) += count;
            }
        }

        let (today_sessions, today_secs) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(elapsed_secs), 0)
             FROM sessions
             WHERE finished_at >= ?1",
            params![today_start()],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, f64>(1)?)),
        )?;
        stats.today_sessions = today_sessions;
        stats.today_practice_secs = today_secs;

        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.kv_set(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.kv_delete(key)?)
    }
}

fn today_start() -> String {
    format!("{}T00:00:00+00:00", Utc::now().format("%Y-%m-%d"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session<'a>(id: &'a str, completed: bool, elapsed: f64, at: DateTime<Utc>) -> NewSession<'a> {
        NewSession {
            exercise_id: id,
            title: "Breathing Reset",
            completed,
            planned_secs: 60,
            elapsed_secs: elapsed,
            started_at: at - Duration::seconds(elapsed as i64),
            finished_at: at,
        }
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_session(&session("breathing-reset", true, 60.0, now)).unwrap();
        db.record_session(&session("breathing-reset", false, 12.5, now)).unwrap();
        db.record_session(&session("decision-triage", true, 900.0, now)).unwrap();

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.completed_sessions, 2);
        assert_eq!(stats.total_practice_secs, 972.5);
        assert_eq!(stats.by_exercise.get("breathing-reset"), Some(&1));
        assert_eq!(stats.today_sessions, 3);
    }

    #[test]
    fn today_excludes_older_sessions() {
        let db = Database::open_memory().unwrap();
        let old = Utc::now() - Duration::days(3);
        db.record_session(&session("breathing-reset", true, 60.0, old)).unwrap();
        db.record_session(&session("breathing-reset", true, 60.0, Utc::now())).unwrap();

        let today = db.stats_today().unwrap();
        assert_eq!(today.total_sessions, 1);
        assert_eq!(db.stats_all().unwrap().total_sessions, 2);
    }

    #[test]
    fn recent_sessions_newest_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_session(&session("a", true, 1.0, now - Duration::minutes(5))).unwrap();
        db.record_session(&session("b", false, 2.0, now)).unwrap();
        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].exercise_id, "b");
        assert!(!recent[0].completed);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        KeyValueStore::remove(&db, "test").unwrap();
        assert!(KeyValueStore::get(&db, "test").unwrap().is_none());
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacer.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
