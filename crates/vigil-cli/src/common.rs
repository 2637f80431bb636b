use chrono::{DateTime, Utc};
use vigil_core::storage::Database;
use vigil_core::{Config, EnforcementScheduler, Event, Notifier};

/// Wall-clock snapshot handed to the core.
///
/// The scheduler compares dates and hours directly on the value it is
/// given, so we hand it local wall time re-labelled as UTC: midnight and
/// the loyalty window then line up with the operator's clock.
pub fn wall_now() -> DateTime<Utc> {
    chrono::Local::now().naive_local().and_utc()
}

/// Open the database and restore the scheduler from persisted state.
///
/// Runs one enforcement tick before handing the scheduler back: day
/// rollover and expired-deadline handling are tick-driven, and without
/// this a one-shot command run after midnight would read and mutate the
/// prior date's record.
pub fn open_scheduler(
    config: &Config,
) -> Result<EnforcementScheduler<Database>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut scheduler = EnforcementScheduler::new(db, config.scheduler_config()?, wall_now())?;

    let events = scheduler.tick(wall_now());
    if !events.is_empty() {
        let mut notifier = ConsoleNotifier;
        for event in &events {
            notifier.notify(event);
        }
        if let Err(e) = scheduler.persist() {
            eprintln!("warning: persist failed: {e}");
        }
    }
    Ok(scheduler)
}

/// Renders events as terminal lines. The core never knows alerts are
/// printed rather than spoken or pushed.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, event: &Event) {
        match event {
            Event::BreathWarning { silent_for_ms, .. } => {
                println!("!! BREATHE -- silent for {}s", silent_for_ms / 1000);
            }
            Event::BreathPenalty {
                points,
                total_penalty_points,
                ..
            } => {
                println!("!! breath-hold penalty: +{points} ({total_penalty_points} total)");
            }
            Event::BreathHoldCleared { .. } => println!("breathing resumed"),
            Event::MonitoringDegraded { reason, .. } => {
                println!("monitoring degraded: {reason}");
            }
            Event::MonitoringRestored { .. } => println!("monitoring restored"),
            Event::LoyaltyCheckRequired { deadline, .. } => {
                println!("!! LOYALTY CHECK -- proof due by {deadline}");
            }
            Event::LoyaltyCheckFailed { missed_today, .. } => {
                println!(
                    "!! loyalty check failed ({missed_today} missed today); remedial proof required"
                );
            }
            Event::LoyaltyProofAccepted { .. } => println!("loyalty proof accepted"),
            Event::DayRollover {
                date, multiplier, ..
            } => {
                println!("new day {date}: multiplier x{multiplier}");
            }
            Event::WeeklyReview { average, .. } => {
                println!("!! weekly review: trailing average {average}, penalty week armed");
            }
            Event::ReportDue { .. } => println!("!! weekly report due before midnight"),
            Event::AbsencePenalty {
                hours_away, points, ..
            } => {
                println!("!! absence penalty: {hours_away}h away, +{points} points");
            }
            Event::DaySubmitted { date, score, .. } => {
                println!("day {date} submitted: score {score}");
            }
        }
    }
}
