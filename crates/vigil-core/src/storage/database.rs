//! SQLite-based day and history storage.
//!
//! Provides persistent storage for:
//! - The current and past day records
//! - The submitted-day history log
//! - Key-value scheduler state (streak, lock, activity anchors)

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{DayStore, MetaState};
use crate::day::{DayRecord, FeedbackTier, HistoryItem, TaskCategory, TaskProgress};
use crate::error::StorageError;

const META_KEY: &str = "scheduler_meta";

/// SQLite database for day records and history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/vigil/vigil.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = super::data_dir()?.join("vigil.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS days (
                    date            TEXT PRIMARY KEY,
                    submitted       INTEGER NOT NULL,
                    score           INTEGER NOT NULL,
                    multiplier      REAL NOT NULL,
                    penalty_points  INTEGER NOT NULL,
                    missed_checks   INTEGER NOT NULL,
                    orgasm_recorded INTEGER NOT NULL,
                    orgasm_proof_id TEXT,
                    feedback        TEXT,
                    progress        TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS history (
                    date           TEXT PRIMARY KEY,
                    score          INTEGER NOT NULL,
                    feedback       TEXT NOT NULL,
                    punishment     TEXT,
                    proof_ids      TEXT NOT NULL,
                    missed_checks  INTEGER NOT NULL,
                    multiplier     REAL NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_history_date ON history(date);",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))
    }

    fn malformed(date: NaiveDate, message: impl Into<String>) -> StorageError {
        StorageError::MalformedRecord {
            date: date.to_string(),
            message: message.into(),
        }
    }
}

impl DayStore for Database {
    fn load_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT submitted, score, multiplier, penalty_points, missed_checks,
                        orgasm_recorded, orgasm_proof_id, feedback, progress
                 FROM days WHERE date = ?1",
                params![date.to_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            submitted,
            score,
            multiplier,
            penalty_points,
            missed_checks,
            orgasm_recorded,
            orgasm_proof_id,
            feedback,
            progress_json,
        )) = row
        else {
            return Ok(None);
        };

        let progress: BTreeMap<TaskCategory, TaskProgress> =
            serde_json::from_str(&progress_json)
                .map_err(|e| Self::malformed(date, format!("progress: {e}")))?;
        let feedback = match feedback {
            Some(text) => Some(
                FeedbackTier::parse(&text)
                    .ok_or_else(|| Self::malformed(date, format!("feedback: {text}")))?,
            ),
            None => None,
        };

        Ok(Some(DayRecord {
            date,
            submitted: submitted != 0,
            score: score.clamp(0, 100) as u32,
            multiplier: multiplier.max(1.0),
            penalty_points: penalty_points.max(0) as u32,
            missed_checks: missed_checks.max(0) as u32,
            progress,
            orgasm_recorded: orgasm_recorded != 0,
            orgasm_proof_id,
            feedback,
        }))
    }

    fn save_day(&mut self, day: &DayRecord) -> Result<(), StorageError> {
        let progress = serde_json::to_string(&day.progress)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO days
                (date, submitted, score, multiplier, penalty_points, missed_checks,
                 orgasm_recorded, orgasm_proof_id, feedback, progress)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                day.date.to_string(),
                day.submitted as i64,
                day.score as i64,
                day.multiplier,
                day.penalty_points as i64,
                day.missed_checks as i64,
                day.orgasm_recorded as i64,
                day.orgasm_proof_id,
                day.feedback.map(FeedbackTier::as_str),
                progress,
            ],
        )?;
        Ok(())
    }

    fn append_history(&mut self, item: &HistoryItem) -> Result<(), StorageError> {
        let proof_ids = serde_json::to_string(&item.proof_ids)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO history
                (date, score, feedback, punishment, proof_ids, missed_checks, multiplier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.date.to_string(),
                item.score as i64,
                item.feedback.as_str(),
                item.punishment,
                proof_ids,
                item.missed_checks as i64,
                item.multiplier,
            ],
        )?;
        Ok(())
    }

    fn history(&self) -> Result<Vec<HistoryItem>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, score, feedback, punishment, proof_ids, missed_checks, multiplier
             FROM history ORDER BY date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, f64>(6)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (date, score, feedback, punishment, proof_ids, missed_checks, multiplier) =
                row?;
            let date: NaiveDate = date
                .parse()
                .map_err(|_| StorageError::QueryFailed(format!("bad history date: {date}")))?;
            let feedback = FeedbackTier::parse(&feedback)
                .ok_or_else(|| Self::malformed(date, format!("feedback: {feedback}")))?;
            let proof_ids: Vec<String> = serde_json::from_str(&proof_ids)
                .map_err(|e| Self::malformed(date, format!("proof_ids: {e}")))?;
            items.push(HistoryItem {
                date,
                score: score.clamp(0, 100) as u32,
                feedback,
                punishment,
                proof_ids,
                missed_checks: missed_checks.max(0) as u32,
                multiplier: multiplier.max(1.0),
            });
        }
        Ok(items)
    }

    fn load_meta(&self) -> Result<Option<MetaState>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![META_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match value {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::QueryFailed(format!("meta: {e}"))),
            None => Ok(None),
        }
    }

    fn save_meta(&mut self, meta: &MetaState) -> Result<(), StorageError> {
        let json = serde_json::to_string(meta)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![META_KEY, json],
        )?;
        Ok(())
    }
}
