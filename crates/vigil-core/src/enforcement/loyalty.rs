//! Loyalty checks: randomly-triggered, time-boxed proof demands.
//!
//! At most one check exists per day. Triggering is a memoryless Bernoulli
//! trial per tick, gated by an allowed hour window, a cooldown since the
//! last trigger, and the day not being submitted. A missed deadline fails
//! exactly once and leaves a mandatory remedial-proof requirement behind.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trigger and deadline tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// First hour (inclusive) of the allowed trigger window.
    pub window_start_hour: u32,
    /// Last hour (inclusive) of the allowed trigger window.
    pub window_end_hour: u32,
    /// Minimum time between triggers.
    pub cooldown_minutes: i64,
    /// Proof deadline measured from the trigger.
    pub deadline_minutes: i64,
    /// Bernoulli probability per eligible tick.
    pub trigger_probability: f64,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            window_start_hour: 8,
            window_end_hour: 23,
            cooldown_minutes: 120,
            deadline_minutes: 7,
            trigger_probability: 0.005,
        }
    }
}

/// One check's lifecycle. The deadline is immutable once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyCheck {
    pub id: Uuid,
    pub active: bool,
    pub completed: bool,
    pub deadline: DateTime<Utc>,
    pub proof_id: Option<String>,
}

/// Outcome of a deadline poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoyaltyFailure {
    pub check_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoyaltyMonitor {
    config: LoyaltyConfig,
    check: Option<LoyaltyCheck>,
    last_trigger: Option<DateTime<Utc>>,
    /// Set when a deadline was missed; cleared by remedial proof.
    remedial_pending: bool,
}

impl LoyaltyMonitor {
    pub fn new(config: LoyaltyConfig) -> Self {
        Self {
            config,
            check: None,
            last_trigger: None,
            remedial_pending: false,
        }
    }

    pub fn check(&self) -> Option<&LoyaltyCheck> {
        self.check.as_ref()
    }

    pub fn remedial_pending(&self) -> bool {
        self.remedial_pending
    }

    pub fn last_trigger(&self) -> Option<DateTime<Utc>> {
        self.last_trigger
    }

    /// Restore the trigger cooldown anchor from persisted state.
    pub fn set_last_trigger(&mut self, at: Option<DateTime<Utc>>) {
        self.last_trigger = at;
    }

    /// All gates that must pass before the Bernoulli trial runs.
    fn eligible(&self, now: DateTime<Utc>, day_submitted: bool) -> bool {
        if day_submitted {
            return false;
        }
        let hour = now.hour();
        if hour < self.config.window_start_hour || hour > self.config.window_end_hour {
            return false;
        }
        // A completed check stays "unconsumed" until the day rolls over;
        // a failed one frees the slot after the cooldown.
        if let Some(check) = &self.check {
            if check.active || check.completed {
                return false;
            }
        }
        match self.last_trigger {
            Some(last) => now - last > Duration::minutes(self.config.cooldown_minutes),
            None => true,
        }
    }

    /// Run one trigger trial. Returns the new check when it fires.
    pub fn maybe_trigger(
        &mut self,
        now: DateTime<Utc>,
        day_submitted: bool,
        rng: &mut impl Rng,
    ) -> Option<&LoyaltyCheck> {
        if !self.eligible(now, day_submitted) {
            return None;
        }
        if !rng.gen_bool(self.config.trigger_probability) {
            return None;
        }
        self.last_trigger = Some(now);
        self.check = Some(LoyaltyCheck {
            id: Uuid::new_v4(),
            active: true,
            completed: false,
            deadline: now + Duration::minutes(self.config.deadline_minutes),
            proof_id: None,
        });
        self.check.as_ref()
    }

    /// Fail an expired check. Fires at most once per check.
    pub fn poll_deadline(&mut self, now: DateTime<Utc>) -> Option<LoyaltyFailure> {
        let check = self.check.as_mut()?;
        if !check.active || check.completed || now <= check.deadline {
            return None;
        }
        check.active = false;
        self.remedial_pending = true;
        Some(LoyaltyFailure { check_id: check.id })
    }

    /// Accept proof for the active check. Rejected once the deadline has
    /// passed at evaluation time -- the miss path still applies.
    pub fn submit_proof(
        &mut self,
        check_id: Uuid,
        proof_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(check) = self.check.as_mut() else {
            return false;
        };
        if check.id != check_id || !check.active || now > check.deadline {
            return false;
        }
        check.active = false;
        check.completed = true;
        check.proof_id = Some(proof_id.to_string());
        // Completing a live check also settles an earlier remedial demand.
        self.remedial_pending = false;
        true
    }

    /// Accept the mandatory proof demanded after a missed deadline.
    pub fn submit_remedial_proof(&mut self, proof_id: &str) -> bool {
        if !self.remedial_pending {
            return false;
        }
        if let Some(check) = self.check.as_mut() {
            if check.proof_id.is_none() {
                check.proof_id = Some(proof_id.to_string());
            }
        }
        self.remedial_pending = false;
        true
    }

    /// Clear the day-scoped slot at rollover. The cooldown anchor resets
    /// so a fresh day cannot trigger instantly at midnight.
    pub fn reset_for_new_day(&mut self, now: DateTime<Utc>) {
        self.check = None;
        self.remedial_pending = false;
        self.last_trigger = Some(now);
    }
}
