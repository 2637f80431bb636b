//! Breath-hold monitor: nested warning/penalty deadlines over silence.
//!
//! A silence episode arms a warning deadline; if the warning fires, a
//! penalty deadline is armed behind it. Resumed breathing disarms both at
//! once -- the two deadlines live in a single state slot, so cancelling
//! the outer one can never leave the inner one pending. Re-entering
//! silence restarts the warning window from zero.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Delay constants for the two nested deadlines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreathHoldThresholds {
    /// Silence tolerated before the warning (default 15 s).
    pub warning_delay_ms: i64,
    /// Further silence tolerated before the penalty (default 10 s).
    pub penalty_delay_ms: i64,
    /// Penalty points applied when the second deadline fires.
    pub penalty_points: u32,
}

impl Default for BreathHoldThresholds {
    fn default() -> Self {
        Self {
            warning_delay_ms: 15_000,
            penalty_delay_ms: 10_000,
            penalty_points: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum HoldPhase {
    /// Waiting out the warning window.
    Counting,
    /// Warning fired; penalty deadline armed.
    Warned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HoldState {
    silent_since: DateTime<Utc>,
    phase: HoldPhase,
    deadline: DateTime<Utc>,
}

/// What a monitor transition asks the scheduler to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathHoldSignal {
    /// Warning deadline passed; carries silence duration so far.
    Warning { silent_for_ms: u64 },
    /// Penalty deadline passed; apply `penalty_points` once.
    Penalty,
    /// Breathing resumed while the warning overlay was up.
    Cleared,
}

/// Tracks one silence episode at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreathHoldMonitor {
    thresholds: BreathHoldThresholds,
    state: Option<HoldState>,
    /// True while capture is unavailable; the branch fails open.
    suspended: bool,
}

impl BreathHoldMonitor {
    pub fn new(thresholds: BreathHoldThresholds) -> Self {
        Self {
            thresholds,
            state: None,
            suspended: false,
        }
    }

    /// Feed one classification. Returns `Cleared` when breathing resumes
    /// past an active warning.
    pub fn observe(&mut self, is_breathing: bool, now: DateTime<Utc>) -> Option<BreathHoldSignal> {
        if self.suspended {
            return None;
        }
        if is_breathing {
            let cleared = self.state.take();
            return match cleared {
                Some(state) if state.phase == HoldPhase::Warned => {
                    Some(BreathHoldSignal::Cleared)
                }
                _ => None,
            };
        }
        if self.state.is_none() {
            self.state = Some(HoldState {
                silent_since: now,
                phase: HoldPhase::Counting,
                deadline: now + Duration::milliseconds(self.thresholds.warning_delay_ms),
            });
        }
        None
    }

    /// Advance deadlines. Call once per poll tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<BreathHoldSignal> {
        if self.suspended {
            return None;
        }
        let state = self.state.as_mut()?;
        if now < state.deadline {
            return None;
        }
        match state.phase {
            HoldPhase::Counting => {
                state.phase = HoldPhase::Warned;
                // Anchor the penalty window to the scheduled warning time,
                // not the (possibly late) tick that observed it.
                state.deadline =
                    state.deadline + Duration::milliseconds(self.thresholds.penalty_delay_ms);
                let silent_for_ms = (now - state.silent_since).num_milliseconds().max(0) as u64;
                Some(BreathHoldSignal::Warning { silent_for_ms })
            }
            HoldPhase::Warned => {
                self.state = None;
                Some(BreathHoldSignal::Penalty)
            }
        }
    }

    /// Fail open while capture is unavailable: drop any pending episode.
    pub fn suspend(&mut self) {
        self.suspended = true;
        self.state = None;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn penalty_points(&self) -> u32 {
        self.thresholds.penalty_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn monitor() -> BreathHoldMonitor {
        BreathHoldMonitor::new(BreathHoldThresholds::default())
    }

    /// Drive observe+tick at a fixed cadence, collecting signals.
    fn run_silence(
        monitor: &mut BreathHoldMonitor,
        breathing_at: impl Fn(i64) -> bool,
        until_ms: i64,
    ) -> Vec<(i64, BreathHoldSignal)> {
        let mut signals = Vec::new();
        let mut t = 0;
        while t <= until_ms {
            if let Some(s) = monitor.observe(breathing_at(t), at(t)) {
                signals.push((t, s));
            }
            if let Some(s) = monitor.tick(at(t)) {
                signals.push((t, s));
            }
            t += 100;
        }
        signals
    }

    #[test]
    fn warning_at_15s_penalty_at_25s() {
        let mut m = monitor();
        let signals = run_silence(&mut m, |_| false, 30_000);

        assert_eq!(signals.len(), 2);
        assert_eq!(
            signals[0],
            (
                15_000,
                BreathHoldSignal::Warning {
                    silent_for_ms: 15_000
                }
            )
        );
        assert_eq!(signals[1], (25_000, BreathHoldSignal::Penalty));
    }

    #[test]
    fn no_warning_before_15s() {
        let mut m = monitor();
        let signals = run_silence(&mut m, |_| false, 14_900);
        assert!(signals.is_empty());
    }

    #[test]
    fn breathing_at_20s_cancels_penalty_and_clears() {
        let mut m = monitor();
        let signals = run_silence(&mut m, |t| t >= 20_000, 40_000);

        assert_eq!(signals.len(), 2);
        assert!(matches!(signals[0], (15_000, BreathHoldSignal::Warning { .. })));
        assert_eq!(signals[1], (20_000, BreathHoldSignal::Cleared));
    }

    #[test]
    fn early_resume_emits_nothing() {
        let mut m = monitor();
        // Silence for 10 s, then breathing: no warning ever fired.
        let signals = run_silence(&mut m, |t| t >= 10_000, 40_000);
        assert!(signals.is_empty());
    }

    #[test]
    fn reentrant_silence_restarts_the_window() {
        let mut m = monitor();
        // Silent 0-10 s, breathing 10-12 s, silent again from 12 s.
        let breathing = |t: i64| (10_000..12_000).contains(&t);
        let signals = run_silence(&mut m, breathing, 28_000);

        // Warning fires 15 s after the *second* silence began (12 s + 15 s).
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].0, 27_000);
        assert!(matches!(signals[0].1, BreathHoldSignal::Warning { .. }));
    }

    #[test]
    fn suspension_drops_pending_episode() {
        let mut m = monitor();
        m.observe(false, at(0));
        m.suspend();
        // Way past both deadlines: nothing fires while suspended.
        assert!(m.tick(at(60_000)).is_none());
        m.resume();
        assert!(m.tick(at(61_000)).is_none()); // episode was dropped
    }
}
