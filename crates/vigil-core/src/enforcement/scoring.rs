//! Daily scoring: category weights, penalties, tiers, derived punishments.
//!
//! `raw_score` is fully deterministic; `score_day` layers the two
//! randomized derivations (extra lock duration, punishment pick) on top,
//! drawing from a caller-provided generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::day::{DayRecord, FeedbackTier, TaskCategory};

/// Points removed per missed loyalty check.
const MISSED_CHECK_COST: i64 = 20;

/// Liar penalty: evening target claimed with an orgasm recorded but no proof.
const LIAR_PENALTY: i64 = 25;

/// Overshoot bonus cap for the affirmation count.
const AFFIRMATION_BONUS_CAP: i64 = 10;

/// Fixed punishment pool drawn from on sub-par submissions.
const PUNISHMENTS: [&str; 7] = [
    "Mirror review: twenty minutes listing today's failures aloud.",
    "Move through the home on your knees for the next two hours.",
    "Five minutes under a cold shower, counting each one out loud.",
    "Forty-five minutes kneeling in the corner without moving.",
    "Write the daily vow five hundred times by hand.",
    "Twelve hours of silence outside of required reports.",
    "One hour in full darkness with no devices.",
];

/// Directive forced whenever the hard-fail flag is set.
const HARD_FAIL_DIRECTIVE: &str =
    "Tomorrow's targets are doubled and home privileges are revoked.";

/// Deterministic part of the outcome plus randomized extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: u32,
    pub feedback: FeedbackTier,
    /// True when score < 50 or the liar penalty fired.
    pub penalty: bool,
    /// Tier-derived lock hours (0 / 24 / 48).
    pub orgasm_lock_hours: u32,
    /// Additional randomized 24-72 h lock when an orgasm was recorded.
    pub extra_lock_hours: u32,
    /// Scoring-path multiplier for tomorrow. Forced to 2.0 at >= 2 misses.
    pub next_day_multiplier: f64,
    pub punishment: Option<String>,
}

/// Deterministic score and liar flag for a day's record.
///
/// Clamped to [0, 100] -- clamping is invariant enforcement, not an error.
pub fn raw_score(day: &DayRecord) -> (u32, bool) {
    let mut score: i64 = 0;
    let mut liar = false;

    // Morning ritual: all-or-nothing, proof required.
    let morning = day.progress_for(TaskCategory::MorningRitual);
    if morning.value >= 1 && morning.proof_id.is_some() {
        score += TaskCategory::MorningRitual.points() as i64;
    }

    // Wear session: full points at target, half tier at half target.
    let wear_target = TaskCategory::WearSession.scaled_target(day.multiplier);
    let wear = day.progress_for(TaskCategory::WearSession).value;
    if wear >= wear_target {
        score += TaskCategory::WearSession.points() as i64;
    } else if wear >= wear_target / 2 {
        score += (TaskCategory::WearSession.points() / 2) as i64;
    }

    // Audio session: all-or-nothing.
    if day.target_met(TaskCategory::AudioSession) {
        score += TaskCategory::AudioSession.points() as i64;
    }

    // Affirmations: target points plus a capped overshoot bonus.
    let affirmation_target = TaskCategory::AffirmationCount.scaled_target(day.multiplier);
    let affirmations = day.progress_for(TaskCategory::AffirmationCount).value;
    if affirmations >= affirmation_target {
        score += TaskCategory::AffirmationCount.points() as i64;
        let extra = ((affirmations - affirmation_target) / 10) as i64;
        score += extra.min(AFFIRMATION_BONUS_CAP);
    }

    // Evening ritual: liar penalty when an orgasm is claimed without proof.
    if day.target_met(TaskCategory::EveningRitual) {
        if day.orgasm_recorded && day.orgasm_proof_id.is_none() {
            score -= LIAR_PENALTY;
            liar = true;
        } else {
            score += TaskCategory::EveningRitual.points() as i64;
        }
    }

    score -= MISSED_CHECK_COST * day.missed_checks as i64;
    score -= day.penalty_points as i64;

    (score.clamp(0, 100) as u32, liar)
}

/// Full scoring pass for a day at submission time.
pub fn score_day(day: &DayRecord, rng: &mut impl Rng) -> ScoreOutcome {
    let (score, liar) = raw_score(day);
    let feedback = FeedbackTier::from_score(score);
    let penalty = score < 50 || liar;

    let mut next_day_multiplier = feedback.next_multiplier();
    if day.missed_checks >= 2 {
        // Ignored checks override any weaker multiplier decision.
        next_day_multiplier = 2.0;
    }

    let extra_lock_hours = if day.orgasm_recorded {
        rng.gen_range(24..=72)
    } else {
        0
    };

    let punishment = if penalty {
        Some(HARD_FAIL_DIRECTIVE.to_string())
    } else if rng.gen_bool(0.3) {
        Some(PUNISHMENTS[rng.gen_range(0..PUNISHMENTS.len())].to_string())
    } else {
        None
    };

    ScoreOutcome {
        score,
        feedback,
        penalty,
        orgasm_lock_hours: feedback.lock_hours(),
        extra_lock_hours,
        next_day_multiplier,
        punishment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::TaskProgress;
    use crate::rng::seeded_rng;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn day(multiplier: f64) -> DayRecord {
        DayRecord::new(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), multiplier)
    }

    fn set(day: &mut DayRecord, category: TaskCategory, value: u32, proof: Option<&str>) {
        day.progress.insert(
            category,
            TaskProgress {
                value,
                proof_id: proof.map(str::to_string),
            },
        );
    }

    fn perfect_day(multiplier: f64) -> DayRecord {
        let mut d = day(multiplier);
        let m = multiplier;
        set(&mut d, TaskCategory::MorningRitual, 1, Some("m-photo"));
        set(&mut d, TaskCategory::WearSession, (36_000.0 * m).ceil() as u32, None);
        set(&mut d, TaskCategory::AudioSession, (1_800.0 * m).ceil() as u32, None);
        set(&mut d, TaskCategory::AffirmationCount, (50.0 * m).ceil() as u32, None);
        set(&mut d, TaskCategory::EveningRitual, (100.0 * m).ceil() as u32, None);
        d
    }

    #[test]
    fn perfect_day_scores_100_high_no_lock() {
        let d = perfect_day(1.0);
        let outcome = score_day(&d, &mut seeded_rng(Some(2)));
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.feedback, FeedbackTier::High);
        assert!(!outcome.penalty);
        assert_eq!(outcome.orgasm_lock_hours, 0);
        assert_eq!(outcome.extra_lock_hours, 0);
        assert_eq!(outcome.next_day_multiplier, 1.0);
    }

    #[test]
    fn one_missed_check_costs_twenty() {
        let mut d = perfect_day(1.0);
        d.missed_checks = 1;
        let outcome = score_day(&d, &mut seeded_rng(Some(2)));
        assert_eq!(outcome.score, 80);
        assert_eq!(outcome.feedback, FeedbackTier::Medium);
        assert_eq!(outcome.orgasm_lock_hours, 24);
        assert!(!outcome.penalty);
    }

    #[test]
    fn two_missed_checks_force_max_multiplier() {
        let mut d = perfect_day(1.0);
        d.missed_checks = 2;
        let outcome = score_day(&d, &mut seeded_rng(Some(2)));
        assert_eq!(outcome.score, 60);
        assert_eq!(outcome.next_day_multiplier, 2.0);
    }

    #[test]
    fn penalty_points_subtract_after_tasks() {
        let mut d = perfect_day(1.0);
        d.penalty_points = 10;
        let (score, _) = raw_score(&d);
        assert_eq!(score, 90);
    }

    #[test]
    fn wear_half_target_earns_half_points() {
        let mut d = day(1.0);
        set(&mut d, TaskCategory::WearSession, 18_000, None);
        let (score, _) = raw_score(&d);
        assert_eq!(score, 10);
    }

    #[test]
    fn affirmation_bonus_is_capped() {
        let mut d = day(1.0);
        // 250 over target -> raw bonus 25, capped at 10.
        set(&mut d, TaskCategory::AffirmationCount, 300, None);
        let (score, _) = raw_score(&d);
        assert_eq!(score, 20 + 10);
    }

    #[test]
    fn morning_without_proof_earns_nothing() {
        let mut d = day(1.0);
        set(&mut d, TaskCategory::MorningRitual, 1, None);
        let (score, _) = raw_score(&d);
        assert_eq!(score, 0);
    }

    #[test]
    fn liar_penalty_fires_without_orgasm_proof() {
        let mut d = perfect_day(1.0);
        d.orgasm_recorded = true;
        let (score, liar) = raw_score(&d);
        assert!(liar);
        // Evening flips from +25 to -25 against the otherwise-perfect 75.
        assert_eq!(score, 50);

        let outcome = score_day(&d, &mut seeded_rng(Some(2)));
        assert!(outcome.penalty);
        assert!(outcome.extra_lock_hours >= 24 && outcome.extra_lock_hours <= 72);
        assert_eq!(outcome.punishment.as_deref(), Some(HARD_FAIL_DIRECTIVE));
    }

    #[test]
    fn orgasm_with_proof_keeps_points_and_draws_extra_lock() {
        let mut d = perfect_day(1.0);
        d.orgasm_recorded = true;
        d.orgasm_proof_id = Some("e-photo".into());
        let outcome = score_day(&d, &mut seeded_rng(Some(2)));
        assert_eq!(outcome.score, 100);
        assert!((24..=72).contains(&outcome.extra_lock_hours));
    }

    #[test]
    fn low_tier_derivations() {
        let mut d = day(1.0);
        set(&mut d, TaskCategory::AudioSession, 1_800, None);
        let outcome = score_day(&d, &mut seeded_rng(Some(2)));
        assert_eq!(outcome.score, 10);
        assert_eq!(outcome.feedback, FeedbackTier::Low);
        assert!(outcome.penalty);
        assert_eq!(outcome.orgasm_lock_hours, 48);
        assert_eq!(outcome.next_day_multiplier, 1.5);
        assert_eq!(outcome.punishment.as_deref(), Some(HARD_FAIL_DIRECTIVE));
    }

    #[test]
    fn doubled_targets_require_doubled_effort() {
        // Yesterday's effort against a x2 day only earns the half tier
        // for wear and nothing for the rest of the scaled categories.
        let mut d = perfect_day(1.0);
        d.multiplier = 2.0;
        let (score, _) = raw_score(&d);
        assert_eq!(score, 25 + 10);
    }

    proptest! {
        #[test]
        fn score_is_always_clamped(
            wear in 0u32..200_000,
            audio in 0u32..10_000,
            affirmations in 0u32..2_000,
            evening in 0u32..2_000,
            morning_done in any::<bool>(),
            orgasm in any::<bool>(),
            missed in 0u32..10,
            penalty_points in 0u32..500,
            multiplier in 1.0f64..3.0,
        ) {
            let mut d = day(multiplier);
            set(&mut d, TaskCategory::MorningRitual, morning_done as u32, Some("p"));
            set(&mut d, TaskCategory::WearSession, wear, None);
            set(&mut d, TaskCategory::AudioSession, audio, None);
            set(&mut d, TaskCategory::AffirmationCount, affirmations, None);
            set(&mut d, TaskCategory::EveningRitual, evening, None);
            d.orgasm_recorded = orgasm;
            d.missed_checks = missed;
            d.penalty_points = penalty_points;

            let (score, _) = raw_score(&d);
            prop_assert!(score <= 100);
        }
    }
}
