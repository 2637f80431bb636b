use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::day::FeedbackTier;

/// Every observable state change in the system produces an Event.
/// The host polls for events and decides how each alert is rendered --
/// overlay, speech, system notification. The core never knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Continuous silence passed the warning threshold.
    BreathWarning {
        silent_for_ms: u64,
        at: DateTime<Utc>,
    },
    /// Silence continued past the warning; penalty points applied.
    BreathPenalty {
        points: u32,
        total_penalty_points: u32,
        at: DateTime<Utc>,
    },
    /// Breathing resumed while a warning overlay was active.
    BreathHoldCleared {
        at: DateTime<Utc>,
    },
    /// Capture became unavailable; breath-hold enforcement is suspended.
    MonitoringDegraded {
        reason: String,
        at: DateTime<Utc>,
    },
    /// Capture recovered; breath-hold enforcement resumed.
    MonitoringRestored {
        at: DateTime<Utc>,
    },
    /// A loyalty check was triggered and proof is due by the deadline.
    LoyaltyCheckRequired {
        check_id: Uuid,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// The deadline passed without proof; remedial proof is now mandatory.
    LoyaltyCheckFailed {
        check_id: Uuid,
        missed_today: u32,
        at: DateTime<Utc>,
    },
    LoyaltyProofAccepted {
        check_id: Uuid,
        proof_id: String,
        at: DateTime<Utc>,
    },
    /// The authoritative day advanced to a new calendar date.
    DayRollover {
        date: NaiveDate,
        multiplier: f64,
        streak: u32,
        at: DateTime<Utc>,
    },
    /// Weekly review verdict: trailing average fell below the threshold.
    WeeklyReview {
        average: u32,
        multiplier: f64,
        at: DateTime<Utc>,
    },
    /// The weekly report is due and the day is still unsubmitted.
    ReportDue {
        at: DateTime<Utc>,
    },
    /// Resumed after a long absence with an unsubmitted day.
    AbsencePenalty {
        hours_away: i64,
        points: u32,
        at: DateTime<Utc>,
    },
    DaySubmitted {
        date: NaiveDate,
        score: u32,
        feedback: FeedbackTier,
        at: DateTime<Utc>,
    },
}

/// Alert sink consumed by the core's hosts.
///
/// Whether an event becomes an overlay, spoken phrase, or push
/// notification is entirely up to the implementation.
pub trait Notifier {
    fn notify(&mut self, event: &Event);
}

/// Notifier that discards everything. Useful in tests and batch tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _event: &Event) {}
}
