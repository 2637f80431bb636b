mod breath_hold;
mod escalation;
mod loyalty;
mod scheduler;
pub mod scoring;

pub use breath_hold::{BreathHoldMonitor, BreathHoldSignal, BreathHoldThresholds};
pub use escalation::escalation_level;
pub use loyalty::{LoyaltyCheck, LoyaltyConfig, LoyaltyFailure, LoyaltyMonitor};
pub use scheduler::{EnforcementScheduler, SchedulerConfig};
pub use scoring::{raw_score, score_day, ScoreOutcome};
