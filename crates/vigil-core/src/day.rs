//! Daily record types: task categories, progress, history.
//!
//! A `DayRecord` is the unit of daily progress. Exactly one record is
//! "current" at a time; it is mutated by task updates and penalties until
//! submission, after which it is immutable and archived as a `HistoryItem`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The five scored task categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Morning ritual: done/not-done, requires a proof photo.
    MorningRitual,
    /// Wear session, measured in seconds. Half-target earns partial credit.
    WearSession,
    /// Audio session, measured in seconds.
    AudioSession,
    /// Affirmation repetitions. Overshoot earns a capped bonus.
    AffirmationCount,
    /// Evening ritual repetitions. Carries the liar penalty.
    EveningRitual,
}

impl TaskCategory {
    pub fn all() -> [TaskCategory; 5] {
        [
            TaskCategory::MorningRitual,
            TaskCategory::WearSession,
            TaskCategory::AudioSession,
            TaskCategory::AffirmationCount,
            TaskCategory::EveningRitual,
        ]
    }

    /// Point weight contributed when the scaled target is met.
    pub fn points(self) -> u32 {
        match self {
            TaskCategory::MorningRitual => 25,
            TaskCategory::WearSession => 20,
            TaskCategory::AudioSession => 10,
            TaskCategory::AffirmationCount => 20,
            TaskCategory::EveningRitual => 25,
        }
    }

    /// Base target before multiplier scaling.
    pub fn base_target(self) -> u32 {
        match self {
            TaskCategory::MorningRitual => 1,
            TaskCategory::WearSession => 36_000,
            TaskCategory::AudioSession => 1_800,
            TaskCategory::AffirmationCount => 50,
            TaskCategory::EveningRitual => 100,
        }
    }

    /// Target scaled by the day multiplier.
    ///
    /// The morning ritual is a yes/no item and never scales.
    pub fn scaled_target(self, multiplier: f64) -> u32 {
        match self {
            TaskCategory::MorningRitual => 1,
            _ => (self.base_target() as f64 * multiplier).ceil() as u32,
        }
    }

    /// Whether meeting this category requires an attached proof id.
    pub fn requires_proof(self) -> bool {
        matches!(self, TaskCategory::MorningRitual)
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskCategory::MorningRitual => "Morning ritual",
            TaskCategory::WearSession => "Wear session",
            TaskCategory::AudioSession => "Audio session",
            TaskCategory::AffirmationCount => "Affirmations",
            TaskCategory::EveningRitual => "Evening ritual",
        }
    }
}

/// Recorded progress against one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Seconds, repetitions, or 0/1 for yes/no categories.
    pub value: u32,
    /// Proof attachment, if any.
    #[serde(default)]
    pub proof_id: Option<String>,
}

/// Feedback banding derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTier {
    /// Score >= 90
    High,
    /// Score >= 70
    Medium,
    /// Score < 70
    Low,
}

impl FeedbackTier {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            FeedbackTier::High
        } else if score >= 70 {
            FeedbackTier::Medium
        } else {
            FeedbackTier::Low
        }
    }

    /// Lock hours assigned by tier alone.
    pub fn lock_hours(self) -> u32 {
        match self {
            FeedbackTier::High => 0,
            FeedbackTier::Medium => 24,
            FeedbackTier::Low => 48,
        }
    }

    /// Next-day multiplier assigned by tier alone.
    pub fn next_multiplier(self) -> f64 {
        match self {
            FeedbackTier::High => 1.0,
            FeedbackTier::Medium => 1.2,
            FeedbackTier::Low => 1.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackTier::High => "high",
            FeedbackTier::Medium => "medium",
            FeedbackTier::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(FeedbackTier::High),
            "medium" => Some(FeedbackTier::Medium),
            "low" => Some(FeedbackTier::Low),
            _ => None,
        }
    }
}

/// The current day's task and penalty state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub submitted: bool,
    /// Final score, set at submission. 0 until then.
    pub score: u32,
    /// Target multiplier carried forward from prior failures. Always >= 1.
    pub multiplier: f64,
    /// Accumulated penalty points, subtracted at scoring time.
    pub penalty_points: u32,
    /// Loyalty checks missed today. Monotonic within the day.
    pub missed_checks: u32,
    pub progress: BTreeMap<TaskCategory, TaskProgress>,
    /// Orgasm recorded for the evening ritual.
    #[serde(default)]
    pub orgasm_recorded: bool,
    #[serde(default)]
    pub orgasm_proof_id: Option<String>,
    #[serde(default)]
    pub feedback: Option<FeedbackTier>,
}

impl DayRecord {
    /// Fresh record for `date` carrying the given multiplier (floored at 1).
    pub fn new(date: NaiveDate, multiplier: f64) -> Self {
        let progress = TaskCategory::all()
            .into_iter()
            .map(|cat| (cat, TaskProgress::default()))
            .collect();
        Self {
            date,
            submitted: false,
            score: 0,
            multiplier: multiplier.max(1.0),
            penalty_points: 0,
            missed_checks: 0,
            progress,
            orgasm_recorded: false,
            orgasm_proof_id: None,
            feedback: None,
        }
    }

    pub fn progress_for(&self, category: TaskCategory) -> TaskProgress {
        self.progress.get(&category).cloned().unwrap_or_default()
    }

    /// Whether the scaled target for `category` is met.
    pub fn target_met(&self, category: TaskCategory) -> bool {
        self.progress_for(category).value >= category.scaled_target(self.multiplier)
    }

    /// Every proof id attached to the record, in category order.
    pub fn proof_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .progress
            .values()
            .filter_map(|p| p.proof_id.clone())
            .collect();
        if let Some(id) = &self.orgasm_proof_id {
            ids.push(id.clone());
        }
        ids
    }
}

/// Immutable snapshot of a submitted day plus its computed outcome.
/// Appended to history most-recent-first; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub date: NaiveDate,
    pub score: u32,
    pub feedback: FeedbackTier,
    pub punishment: Option<String>,
    pub proof_ids: Vec<String>,
    pub missed_checks: u32,
    pub multiplier: f64,
}

/// Result of submitting a day. Returned unchanged by repeat submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayVerdict {
    pub score: u32,
    pub feedback: FeedbackTier,
    /// Hard-fail flag: score below 50 or a liar penalty fired.
    pub penalty: bool,
    pub punishment: Option<String>,
    pub orgasm_lock_until: DateTime<Utc>,
    pub next_day_multiplier: f64,
    /// Escalation level 0-4 at submission time.
    pub escalation: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_floored_at_one() {
        let day = DayRecord::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 0.5);
        assert_eq!(day.multiplier, 1.0);
    }

    #[test]
    fn scaled_targets_follow_multiplier() {
        assert_eq!(TaskCategory::WearSession.scaled_target(2.0), 72_000);
        assert_eq!(TaskCategory::AffirmationCount.scaled_target(1.5), 75);
        // Yes/no category never scales.
        assert_eq!(TaskCategory::MorningRitual.scaled_target(2.5), 1);
    }

    #[test]
    fn target_met_uses_scaled_target() {
        let mut day = DayRecord::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 2.0);
        day.progress.insert(
            TaskCategory::AudioSession,
            TaskProgress {
                value: 1_800,
                proof_id: None,
            },
        );
        assert!(!day.target_met(TaskCategory::AudioSession));
        day.progress.insert(
            TaskCategory::AudioSession,
            TaskProgress {
                value: 3_600,
                proof_id: None,
            },
        );
        assert!(day.target_met(TaskCategory::AudioSession));
    }

    #[test]
    fn feedback_tier_banding() {
        assert_eq!(FeedbackTier::from_score(100), FeedbackTier::High);
        assert_eq!(FeedbackTier::from_score(90), FeedbackTier::High);
        assert_eq!(FeedbackTier::from_score(89), FeedbackTier::Medium);
        assert_eq!(FeedbackTier::from_score(70), FeedbackTier::Medium);
        assert_eq!(FeedbackTier::from_score(69), FeedbackTier::Low);
    }

    #[test]
    fn proof_ids_collects_all_attachments() {
        let mut day = DayRecord::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 1.0);
        day.progress.insert(
            TaskCategory::MorningRitual,
            TaskProgress {
                value: 1,
                proof_id: Some("morning-1".into()),
            },
        );
        day.orgasm_proof_id = Some("evening-1".into());
        let ids = day.proof_ids();
        assert_eq!(ids, vec!["morning-1".to_string(), "evening-1".to_string()]);
    }
}
