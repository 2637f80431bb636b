//! Enforcement scheduler.
//!
//! The scheduler is a wall-clock-based state machine. It does not own
//! timers or threads -- the host calls `observe()` once per audio poll
//! and `tick()` on a coarse cadence (~60 s), passing a single wall-clock
//! snapshot per call so every branch reads a consistent time.
//!
//! ## Branches
//!
//! - Breath-hold: driven by `observe()` transitions, nested deadlines.
//! - Loyalty checks: Bernoulli trigger plus deadline monitor on `tick()`.
//! - Day rollover / weekly review / report due: date checks on `tick()`.
//!
//! Persistence is explicit: mutations keep in-memory state authoritative
//! and `persist()` (or submission) writes through to the `DayStore`.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use rand_pcg::Mcg128Xsl64;
use uuid::Uuid;

use super::breath_hold::{BreathHoldMonitor, BreathHoldSignal, BreathHoldThresholds};
use super::escalation::escalation_level;
use super::loyalty::{LoyaltyCheck, LoyaltyConfig, LoyaltyMonitor};
use super::scoring;
use crate::audio::BreathingMetrics;
use crate::day::{DayRecord, DayVerdict, HistoryItem, TaskCategory};
use crate::error::{Result, StorageError};
use crate::events::Event;
use crate::rng::seeded_rng;
use crate::storage::{DayStore, MetaState};

/// Tuning for every scheduler branch.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub loyalty: LoyaltyConfig,
    pub breath: BreathHoldThresholds,
    /// Weekly review day (default Sunday).
    pub review_weekday: Weekday,
    /// Trailing 7-day average below this triggers the review verdict.
    pub weekly_threshold: u32,
    /// Hour of the review day after which an unsubmitted day owes a report.
    pub report_due_hour: u32,
    /// Absence beyond this many hours with an unsubmitted day is penalized.
    pub absence_threshold_hours: i64,
    pub absence_penalty_points: u32,
    /// Fixed seed for randomized decisions; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            loyalty: LoyaltyConfig::default(),
            breath: BreathHoldThresholds::default(),
            review_weekday: Weekday::Sun,
            weekly_threshold: 75,
            report_due_hour: 21,
            absence_threshold_hours: 12,
            absence_penalty_points: 10,
            rng_seed: None,
        }
    }
}

/// Real-time enforcement state machine over one current day.
pub struct EnforcementScheduler<S: DayStore> {
    config: SchedulerConfig,
    store: S,
    day: DayRecord,
    verdict: Option<DayVerdict>,
    verdict_persisted: bool,
    loyalty: LoyaltyMonitor,
    breath: BreathHoldMonitor,
    streak: u32,
    lock_until: Option<DateTime<Utc>>,
    last_active: DateTime<Utc>,
    report_due_emitted: bool,
    capture_available: bool,
    /// Events produced by out-of-band mutations, drained by the next
    /// `tick()`/`observe()` call.
    pending: Vec<Event>,
    rng: Mcg128Xsl64,
}

impl<S: DayStore> EnforcementScheduler<S> {
    /// Restore scheduler state from the store, falling back to a fresh
    /// day when nothing (or something malformed) is persisted.
    pub fn new(store: S, config: SchedulerConfig, now: DateTime<Utc>) -> Result<Self> {
        let today = now.date_naive();
        let meta = store.load_meta()?.unwrap_or_default();
        let anchor_date = meta.current_date.unwrap_or(today);
        let day = match store.load_day(anchor_date) {
            Ok(Some(day)) => day,
            Ok(None) => DayRecord::new(anchor_date, 1.0),
            // Malformed persisted state never crashes the scheduler.
            Err(StorageError::MalformedRecord { .. }) => DayRecord::new(anchor_date, 1.0),
            Err(e) => return Err(e.into()),
        };

        let mut loyalty = LoyaltyMonitor::new(config.loyalty);
        loyalty.set_last_trigger(meta.last_loyalty_trigger);

        let rng = seeded_rng(config.rng_seed);
        let breath = BreathHoldMonitor::new(config.breath);

        let mut scheduler = Self {
            verdict: None,
            verdict_persisted: false,
            loyalty,
            breath,
            streak: meta.streak,
            lock_until: meta.lock_until,
            last_active: meta.last_active.unwrap_or(now),
            report_due_emitted: false,
            capture_available: true,
            pending: Vec::new(),
            rng,
            config,
            store,
            day,
        };

        if scheduler.day.submitted {
            scheduler.restore_verdict(now);
        }
        scheduler.apply_absence_penalty(now, meta.last_active);
        Ok(scheduler)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn day(&self) -> &DayRecord {
        &self.day
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn lock_until(&self) -> Option<DateTime<Utc>> {
        self.lock_until
    }

    pub fn loyalty_check(&self) -> Option<&LoyaltyCheck> {
        self.loyalty.check()
    }

    pub fn remedial_proof_pending(&self) -> bool {
        self.loyalty.remedial_pending()
    }

    pub fn verdict(&self) -> Option<&DayVerdict> {
        self.verdict.as_ref()
    }

    /// True while the microphone collaborator has reported itself down.
    pub fn monitoring_degraded(&self) -> bool {
        !self.capture_available
    }

    /// Escalation level for the day as it currently stands.
    /// Always derived, never stored.
    pub fn current_escalation(&self) -> u8 {
        let (score, _) = scoring::raw_score(&self.day);
        escalation_level(score, self.day.missed_checks)
    }

    pub fn history(&self) -> Result<Vec<HistoryItem>> {
        Ok(self.store.history()?)
    }

    // ── Breath-hold branch ───────────────────────────────────────────

    /// Feed one classifier snapshot. Call once per audio poll tick.
    pub fn observe(&mut self, metrics: &BreathingMetrics, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = std::mem::take(&mut self.pending);
        if !self.capture_available || self.day.submitted {
            return events;
        }
        if let Some(signal) = self.breath.observe(metrics.is_breathing, now) {
            self.apply_breath_signal(signal, now, &mut events);
        }
        // Deadlines are checked at poll cadence so the warning lands on
        // time rather than on the next coarse tick.
        if let Some(signal) = self.breath.tick(now) {
            self.apply_breath_signal(signal, now, &mut events);
        }
        events
    }

    /// Capture collaborator failed; breath-hold penalties fail open.
    pub fn mark_capture_lost(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        if !self.capture_available {
            return None;
        }
        self.capture_available = false;
        self.breath.suspend();
        Some(Event::MonitoringDegraded {
            reason: reason.into(),
            at: now,
        })
    }

    pub fn mark_capture_restored(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.capture_available {
            return None;
        }
        self.capture_available = true;
        self.breath.resume();
        Some(Event::MonitoringRestored { at: now })
    }

    fn apply_breath_signal(
        &mut self,
        signal: BreathHoldSignal,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        match signal {
            BreathHoldSignal::Warning { silent_for_ms } => {
                events.push(Event::BreathWarning { silent_for_ms, at: now });
            }
            BreathHoldSignal::Penalty => {
                let points = self.breath.penalty_points();
                self.day.penalty_points += points;
                events.push(Event::BreathPenalty {
                    points,
                    total_penalty_points: self.day.penalty_points,
                    at: now,
                });
            }
            BreathHoldSignal::Cleared => {
                events.push(Event::BreathHoldCleared { at: now });
            }
        }
    }

    // ── Coarse tick: loyalty, rollover, review ───────────────────────

    /// Advance the wall-clock branches. Call roughly once a minute; all
    /// checks read the single `now` snapshot.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = std::mem::take(&mut self.pending);
        let today = now.date_naive();

        if today != self.day.date {
            self.rollover(now, &mut events);
        }

        if !self.day.submitted {
            if let Some(check) = self.loyalty.maybe_trigger(now, false, &mut self.rng) {
                events.push(Event::LoyaltyCheckRequired {
                    check_id: check.id,
                    deadline: check.deadline,
                    at: now,
                });
            }
            if let Some(failure) = self.loyalty.poll_deadline(now) {
                self.day.missed_checks += 1;
                events.push(Event::LoyaltyCheckFailed {
                    check_id: failure.check_id,
                    missed_today: self.day.missed_checks,
                    at: now,
                });
            }
            if today.weekday() == self.config.review_weekday
                && now.hour() >= self.config.report_due_hour
                && !self.report_due_emitted
            {
                self.report_due_emitted = true;
                events.push(Event::ReportDue { at: now });
            }
            if let Some(signal) = self.breath.tick(now) {
                self.apply_breath_signal(signal, now, &mut events);
            }
        }

        self.last_active = now;
        events
    }

    fn rollover(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        let today = now.date_naive();
        let yesterday = self.day.clone();

        let mut multiplier = 1.0;
        if !yesterday.submitted || yesterday.score < 70 {
            multiplier = 2.0;
        }
        if yesterday.missed_checks >= 2 {
            multiplier = 2.5;
        }
        // The scoring path may have demanded a stronger multiplier than
        // the rollover rules; neither path weakens the other.
        if let Some(verdict) = &self.verdict {
            multiplier = f64::max(multiplier, verdict.next_day_multiplier);
        }

        if today.weekday() == self.config.review_weekday {
            let average = self.trailing_average(&yesterday);
            if average < self.config.weekly_threshold {
                multiplier = f64::max(multiplier, 1.5);
                events.push(Event::WeeklyReview {
                    average,
                    multiplier,
                    at: now,
                });
            }
        }

        if !(yesterday.submitted && yesterday.score >= 70) {
            self.streak = 0;
        }

        self.day = DayRecord::new(today, multiplier);
        self.verdict = None;
        self.verdict_persisted = false;
        self.loyalty.reset_for_new_day(now);
        self.report_due_emitted = false;

        events.push(Event::DayRollover {
            date: today,
            multiplier,
            streak: self.streak,
            at: now,
        });
    }

    /// Mean score over yesterday plus the six most recent history items.
    /// An unsubmitted yesterday counts as zero.
    fn trailing_average(&self, yesterday: &DayRecord) -> u32 {
        let history = self.store.history().unwrap_or_default();
        let mut scores: Vec<u32> = vec![yesterday.score];
        scores.extend(
            history
                .iter()
                .filter(|item| item.date != yesterday.date)
                .take(6)
                .map(|item| item.score),
        );
        let total: u32 = scores.iter().sum();
        (total as f64 / scores.len() as f64).round() as u32
    }

    // ── Task mutations ───────────────────────────────────────────────

    /// Record progress for a category. Silent no-op once submitted.
    pub fn update_task(&mut self, category: TaskCategory, value: u32) {
        if self.day.submitted {
            return;
        }
        self.day.progress.entry(category).or_default().value = value;
    }

    /// Attach a proof id to a category. Silent no-op once submitted.
    pub fn attach_proof(&mut self, category: TaskCategory, proof_id: &str) {
        if self.day.submitted {
            return;
        }
        self.day.progress.entry(category).or_default().proof_id = Some(proof_id.to_string());
    }

    /// Record (or retract) the day's orgasm event. Silent no-op once
    /// submitted.
    pub fn record_orgasm(&mut self, recorded: bool, proof_id: Option<&str>) {
        if self.day.submitted {
            return;
        }
        self.day.orgasm_recorded = recorded;
        self.day.orgasm_proof_id = proof_id.map(str::to_string);
    }

    // ── Loyalty proof ────────────────────────────────────────────────

    /// Submit proof for the active check. Returns false when no check is
    /// active or the deadline has already passed (the miss still applies).
    pub fn submit_loyalty_proof(
        &mut self,
        check_id: Uuid,
        proof_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let accepted = self.loyalty.submit_proof(check_id, proof_id, now);
        if accepted {
            self.pending.push(Event::LoyaltyProofAccepted {
                check_id,
                proof_id: proof_id.to_string(),
                at: now,
            });
        }
        accepted
    }

    /// Submit the mandatory proof demanded after a missed deadline.
    pub fn submit_remedial_proof(&mut self, proof_id: &str) -> bool {
        self.loyalty.submit_remedial_proof(proof_id)
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Finalize the day. Idempotent: repeat calls return the recorded
    /// verdict and never double-append history.
    pub fn submit_day(&mut self, now: DateTime<Utc>) -> Result<DayVerdict> {
        if let Some(verdict) = self.verdict.clone() {
            if !self.verdict_persisted {
                self.persist_submission(&verdict)?;
            }
            return Ok(verdict);
        }

        let outcome = scoring::score_day(&self.day, &mut self.rng);
        let escalation = escalation_level(outcome.score, self.day.missed_checks);

        let lock_hours = (outcome.orgasm_lock_hours + outcome.extra_lock_hours) as i64;
        let lock_base = self.lock_until.unwrap_or(now).max(now);
        let lock_until = lock_base + Duration::hours(lock_hours);
        self.lock_until = Some(lock_until);

        self.day.submitted = true;
        self.day.score = outcome.score;
        self.day.feedback = Some(outcome.feedback);

        self.streak = if outcome.score >= 70 { self.streak + 1 } else { 0 };

        let verdict = DayVerdict {
            score: outcome.score,
            feedback: outcome.feedback,
            penalty: outcome.penalty,
            punishment: outcome.punishment,
            orgasm_lock_until: lock_until,
            next_day_multiplier: outcome.next_day_multiplier,
            escalation,
        };
        self.verdict = Some(verdict.clone());
        self.pending.push(Event::DaySubmitted {
            date: self.day.date,
            score: verdict.score,
            feedback: verdict.feedback,
            at: now,
        });

        self.persist_submission(&verdict)?;
        Ok(verdict)
    }

    fn persist_submission(&mut self, verdict: &DayVerdict) -> Result<()> {
        self.store.save_day(&self.day)?;
        let mut proof_ids = self.day.proof_ids();
        if let Some(proof) = self.loyalty.check().and_then(|c| c.proof_id.clone()) {
            proof_ids.push(proof);
        }
        self.store.append_history(&HistoryItem {
            date: self.day.date,
            score: verdict.score,
            feedback: verdict.feedback,
            punishment: verdict.punishment.clone(),
            proof_ids,
            missed_checks: self.day.missed_checks,
            multiplier: self.day.multiplier,
        })?;
        self.save_meta()?;
        self.verdict_persisted = true;
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the current day and scheduler state through to the store.
    /// In-memory state stays authoritative if this fails; retry later.
    pub fn persist(&mut self) -> Result<()> {
        self.store.save_day(&self.day)?;
        self.save_meta()?;
        Ok(())
    }

    fn save_meta(&mut self) -> Result<()> {
        self.store.save_meta(&MetaState {
            streak: self.streak,
            lock_until: self.lock_until,
            last_active: Some(self.last_active),
            last_loyalty_trigger: self.loyalty.last_trigger(),
            current_date: Some(self.day.date),
        })?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Rebuild the recorded verdict for an already-submitted loaded day
    /// so repeat submissions stay idempotent across restarts.
    fn restore_verdict(&mut self, now: DateTime<Utc>) {
        let Some(feedback) = self.day.feedback else {
            return;
        };
        let punishment = self
            .store
            .history()
            .ok()
            .and_then(|items| items.into_iter().find(|i| i.date == self.day.date))
            .and_then(|i| i.punishment);
        let mut next_day_multiplier = feedback.next_multiplier();
        if self.day.missed_checks >= 2 {
            next_day_multiplier = 2.0;
        }
        self.verdict = Some(DayVerdict {
            score: self.day.score,
            feedback,
            penalty: self.day.score < 50,
            punishment,
            orgasm_lock_until: self.lock_until.unwrap_or(now),
            next_day_multiplier,
            escalation: escalation_level(self.day.score, self.day.missed_checks),
        });
        self.verdict_persisted = true;
    }

    fn apply_absence_penalty(&mut self, now: DateTime<Utc>, last_active: Option<DateTime<Utc>>) {
        let Some(last_active) = last_active else {
            return;
        };
        if self.day.submitted {
            return;
        }
        let hours_away = (now - last_active).num_hours();
        if hours_away > self.config.absence_threshold_hours {
            self.day.penalty_points += self.config.absence_penalty_points;
            self.pending.push(Event::AbsencePenalty {
                hours_away,
                points: self.config.absence_penalty_points,
                at: now,
            });
        }
    }
}
