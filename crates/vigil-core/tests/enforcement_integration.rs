//! End-to-end scenarios driving the classifier and scheduler together
//! through a simulated day.

use chrono::{DateTime, Duration, TimeZone, Utc};
use vigil_core::enforcement::{LoyaltyConfig, SchedulerConfig};
use vigil_core::{
    BreathingClassifier, BreathingMode, EnforcementScheduler, Event, FeedbackTier,
    MemoryStore, SampleFrame, TaskCategory,
};

fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

fn config(trigger_probability: f64) -> SchedulerConfig {
    SchedulerConfig {
        loyalty: LoyaltyConfig {
            trigger_probability,
            ..LoyaltyConfig::default()
        },
        rng_seed: Some(5),
        ..SchedulerConfig::default()
    }
}

fn scheduler(trigger_probability: f64) -> EnforcementScheduler<MemoryStore> {
    EnforcementScheduler::new(MemoryStore::new(), config(trigger_probability), monday_morning())
        .unwrap()
}

fn complete_all_tasks(s: &mut EnforcementScheduler<MemoryStore>) {
    let m = s.day().multiplier;
    s.update_task(TaskCategory::MorningRitual, 1);
    s.attach_proof(TaskCategory::MorningRitual, "photo-morning");
    s.update_task(TaskCategory::WearSession, (36_000.0 * m).ceil() as u32);
    s.update_task(TaskCategory::AudioSession, (1_800.0 * m).ceil() as u32);
    s.update_task(TaskCategory::AffirmationCount, (50.0 * m).ceil() as u32);
    s.update_task(TaskCategory::EveningRitual, (100.0 * m).ceil() as u32);
}

#[test]
fn perfect_quiet_day_scores_100() {
    // Multiplier 1, all minimum targets met, no loyalty check, no
    // breath-holds: score 100, tier high, no lock, multiplier stays 1.
    let mut s = scheduler(0.0);
    let mut now = monday_morning();

    // A quiet hour of ticks triggers nothing.
    for _ in 0..60 {
        let events = s.tick(now);
        assert!(events.is_empty(), "unexpected events: {events:?}");
        now += Duration::minutes(1);
    }

    complete_all_tasks(&mut s);
    let verdict = s.submit_day(now).unwrap();
    assert_eq!(verdict.score, 100);
    assert_eq!(verdict.feedback, FeedbackTier::High);
    assert!(!verdict.penalty);
    assert_eq!(verdict.next_day_multiplier, 1.0);
    assert_eq!(verdict.escalation, 0);
    // No lock: the lock expires the moment it is set.
    assert_eq!(verdict.orgasm_lock_until, now);
}

#[test]
fn one_missed_check_day_scores_80_with_24h_lock() {
    let mut s = scheduler(1.0);
    let mut now = monday_morning();

    // First tick triggers a check (probability forced to 1).
    let events = s.tick(now);
    let deadline = events
        .iter()
        .find_map(|e| match e {
            Event::LoyaltyCheckRequired { deadline, .. } => Some(*deadline),
            _ => None,
        })
        .expect("check triggered");

    // Ignore it past the deadline.
    now = deadline + Duration::minutes(1);
    let events = s.tick(now);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::LoyaltyCheckFailed { missed_today: 1, .. })));

    complete_all_tasks(&mut s);
    let verdict = s.submit_day(now).unwrap();
    assert_eq!(verdict.score, 80);
    assert_eq!(verdict.feedback, FeedbackTier::Medium);
    assert_eq!(verdict.orgasm_lock_until, now + Duration::hours(24));
}

#[test]
fn breath_hold_penalty_flows_into_final_score() {
    let mut s = scheduler(0.0);
    let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
    let start = monday_morning();

    // 30 seconds of silence at ~30 Hz: warning at 15 s, penalty at 25 s.
    let silent = SampleFrame::new(vec![0.0; 512]);
    let mut warnings = 0;
    let mut penalties = 0;
    for ms in (0..30_000).step_by(33) {
        let now = start + Duration::milliseconds(ms as i64);
        let metrics = classifier.process_frame(&silent, now);
        assert!(!metrics.is_breathing);
        for event in s.observe(&metrics, now) {
            match event {
                Event::BreathWarning { .. } => warnings += 1,
                Event::BreathPenalty { .. } => penalties += 1,
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
    assert_eq!(warnings, 1);
    assert_eq!(penalties, 1);
    assert_eq!(s.day().penalty_points, 10);

    complete_all_tasks(&mut s);
    let verdict = s.submit_day(start + Duration::hours(10)).unwrap();
    assert_eq!(verdict.score, 90);
}

#[test]
fn resumed_breathing_cancels_the_pending_penalty() {
    let mut s = scheduler(0.0);
    let mut classifier = BreathingClassifier::new(BreathingMode::SinglePerson);
    let start = monday_morning();

    let silent = SampleFrame::new(vec![0.0; 512]);
    let breathing = SampleFrame::new(vec![0.05; 512]);
    let mut saw_warning = false;
    let mut saw_cleared = false;
    for ms in (0..40_000).step_by(33) {
        let now = start + Duration::milliseconds(ms as i64);
        let frame = if ms >= 20_000 { &breathing } else { &silent };
        let metrics = classifier.process_frame(frame, now);
        for event in s.observe(&metrics, now) {
            match event {
                Event::BreathWarning { .. } => saw_warning = true,
                Event::BreathHoldCleared { .. } => saw_cleared = true,
                Event::BreathPenalty { .. } => panic!("penalty must be cancelled"),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
    assert!(saw_warning);
    assert!(saw_cleared);
    assert_eq!(s.day().penalty_points, 0);
}

#[test]
fn two_missed_checks_escalate_tomorrow_to_max() {
    let mut s = scheduler(1.0);
    let mut now = monday_morning();

    for expected_missed in 1..=2u32 {
        let events = s.tick(now);
        let deadline = events
            .iter()
            .find_map(|e| match e {
                Event::LoyaltyCheckRequired { deadline, .. } => Some(*deadline),
                _ => None,
            })
            .expect("check triggered");
        now = deadline + Duration::minutes(1);
        let events = s.tick(now);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::LoyaltyCheckFailed { missed_today, .. } if *missed_today == expected_missed
        )));
        // Wait out the cooldown before the next trigger.
        now += Duration::minutes(121);
    }

    complete_all_tasks(&mut s);
    let verdict = s.submit_day(now).unwrap();
    assert_eq!(verdict.score, 60);
    assert_eq!(verdict.next_day_multiplier, 2.0);

    // Tomorrow's record carries the forced multiplier (2.5 from the
    // rollover rules for two missed checks).
    let next_day = Utc.with_ymd_and_hms(2025, 3, 4, 0, 1, 0).unwrap();
    let events = s.tick(next_day);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::DayRollover { multiplier, .. } if *multiplier == 2.5)));
}

#[test]
fn submitted_day_survives_restart_and_stays_idempotent() {
    let mut store = MemoryStore::new();
    let now = monday_morning();
    let first = {
        let mut s =
            EnforcementScheduler::new(&mut store, config(0.0), now).unwrap();
        complete_all_tasks(&mut s);
        s.submit_day(now).unwrap()
    };

    let mut s = EnforcementScheduler::new(&mut store, config(0.0), now).unwrap();
    let second = s.submit_day(now + Duration::hours(2)).unwrap();
    assert_eq!(first.score, second.score);
    assert_eq!(first.feedback, second.feedback);
    assert_eq!(s.history().unwrap().len(), 1);
}
