//! # Vigil Core Library
//!
//! This library provides the core logic for Vigil: a breathing-compliance
//! monitor and daily enforcement scheduler. It is CLI-first -- every
//! operation is available through the standalone binary, with any GUI
//! expected to be a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Breathing Classifier**: turns time-domain sample frames into a
//!   breathing/silence classification and an estimated breath rate
//! - **Enforcement Scheduler**: a wall-clock state machine the host
//!   drives with `observe()` (per audio poll) and `tick()` (coarse),
//!   covering breath-holds, loyalty checks, day rollover, and scoring
//! - **Storage**: SQLite day/history records and TOML configuration
//! - **Events**: every observable state change is an [`Event`]; hosts
//!   decide how alerts are rendered
//!
//! ## Key Components
//!
//! - [`BreathingClassifier`]: per-frame classification with subscribers
//! - [`EnforcementScheduler`]: the enforcement state machine
//! - [`Database`]: day record and history persistence
//! - [`Config`]: application configuration management

pub mod audio;
pub mod day;
pub mod enforcement;
pub mod error;
pub mod events;
pub mod report;
pub mod rng;
pub mod storage;

pub use audio::{
    BreathingClassifier, BreathingMetrics, BreathingMode, CaptureSource, SampleFrame,
};
pub use day::{DayRecord, DayVerdict, FeedbackTier, HistoryItem, TaskCategory, TaskProgress};
pub use enforcement::{
    escalation_level, EnforcementScheduler, LoyaltyCheck, SchedulerConfig,
};
pub use error::{CaptureError, ConfigError, CoreError, StorageError};
pub use events::{Event, Notifier};
pub use storage::{Config, Database, DayStore, MemoryStore};
