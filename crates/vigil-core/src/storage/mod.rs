mod config;
pub mod database;

pub use config::{
    BreathingSection, Config, EnforcementSection, LoyaltySection, ReviewSection,
};
pub use database::Database;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::day::{DayRecord, HistoryItem};
use crate::error::StorageError;

/// Returns `~/.config/vigil[-dev]/` based on VIGIL_ENV.
///
/// Set VIGIL_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("VIGIL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("vigil-dev")
    } else {
        base_dir.join("vigil")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Scheduler state that survives restarts alongside day records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaState {
    pub streak: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub last_loyalty_trigger: Option<DateTime<Utc>>,
    /// Date of the record that was current when state was last saved.
    /// Lets a restart detect an overnight gap and run the rollover path.
    pub current_date: Option<NaiveDate>,
}

/// Day persistence collaborator consumed by the scheduler.
///
/// Failures are recoverable: the scheduler's in-memory state remains
/// authoritative and a later retry may succeed.
pub trait DayStore {
    fn load_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, StorageError>;

    fn save_day(&mut self, day: &DayRecord) -> Result<(), StorageError>;

    fn append_history(&mut self, item: &HistoryItem) -> Result<(), StorageError>;

    /// History ordered by date, most recent first.
    fn history(&self) -> Result<Vec<HistoryItem>, StorageError>;

    fn load_meta(&self) -> Result<Option<MetaState>, StorageError>;

    fn save_meta(&mut self, meta: &MetaState) -> Result<(), StorageError>;
}

impl<T: DayStore + ?Sized> DayStore for &mut T {
    fn load_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, StorageError> {
        (**self).load_day(date)
    }

    fn save_day(&mut self, day: &DayRecord) -> Result<(), StorageError> {
        (**self).save_day(day)
    }

    fn append_history(&mut self, item: &HistoryItem) -> Result<(), StorageError> {
        (**self).append_history(item)
    }

    fn history(&self) -> Result<Vec<HistoryItem>, StorageError> {
        (**self).history()
    }

    fn load_meta(&self) -> Result<Option<MetaState>, StorageError> {
        (**self).load_meta()
    }

    fn save_meta(&mut self, meta: &MetaState) -> Result<(), StorageError> {
        (**self).save_meta(meta)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    days: HashMap<NaiveDate, DayRecord>,
    history: Vec<HistoryItem>,
    meta: Option<MetaState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DayStore for MemoryStore {
    fn load_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, StorageError> {
        Ok(self.days.get(&date).cloned())
    }

    fn save_day(&mut self, day: &DayRecord) -> Result<(), StorageError> {
        self.days.insert(day.date, day.clone());
        Ok(())
    }

    fn append_history(&mut self, item: &HistoryItem) -> Result<(), StorageError> {
        self.history.push(item.clone());
        Ok(())
    }

    fn history(&self) -> Result<Vec<HistoryItem>, StorageError> {
        let mut items = self.history.clone();
        items.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(items)
    }

    fn load_meta(&self) -> Result<Option<MetaState>, StorageError> {
        Ok(self.meta.clone())
    }

    fn save_meta(&mut self, meta: &MetaState) -> Result<(), StorageError> {
        self.meta = Some(meta.clone());
        Ok(())
    }
}
