use clap::Subcommand;
use serde_json::json;
use vigil_core::{Config, TaskCategory};

use crate::common::{open_scheduler, wall_now};

#[derive(Subcommand)]
pub enum DayAction {
    /// Show the current day status
    Status,
    /// Record progress for a task category
    Update {
        /// Category: morning-ritual, wear-session, audio-session,
        /// affirmation-count, evening-ritual
        category: String,
        /// Seconds, repetitions, or 1 for yes/no categories
        value: u32,
        /// Proof id to attach
        #[arg(long)]
        proof: Option<String>,
    },
    /// Record the day's orgasm event
    Orgasm {
        /// Proof id for the event
        #[arg(long)]
        proof: Option<String>,
        /// Retract a previously recorded event
        #[arg(long)]
        retract: bool,
    },
    /// Submit proof for the active loyalty check
    Proof {
        proof_id: String,
    },
    /// Submit the mandatory remedial proof after a missed check
    RemedialProof {
        proof_id: String,
    },
    /// Finalize and score the day
    Submit,
}

fn parse_category(name: &str) -> Result<TaskCategory, String> {
    match name {
        "morning-ritual" => Ok(TaskCategory::MorningRitual),
        "wear-session" => Ok(TaskCategory::WearSession),
        "audio-session" => Ok(TaskCategory::AudioSession),
        "affirmation-count" => Ok(TaskCategory::AffirmationCount),
        "evening-ritual" => Ok(TaskCategory::EveningRitual),
        other => Err(format!("unknown category: {other}")),
    }
}

pub fn run(action: DayAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut scheduler = open_scheduler(&config)?;
    let now = wall_now();

    match action {
        DayAction::Status => {
            let day = scheduler.day();
            let status = json!({
                "date": day.date,
                "submitted": day.submitted,
                "multiplier": day.multiplier,
                "penalty_points": day.penalty_points,
                "missed_checks": day.missed_checks,
                "progress": day.progress,
                "streak": scheduler.streak(),
                "escalation": scheduler.current_escalation(),
                "lock_until": scheduler.lock_until(),
                "loyalty_check": scheduler.loyalty_check(),
                "remedial_proof_pending": scheduler.remedial_proof_pending(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        DayAction::Update {
            category,
            value,
            proof,
        } => {
            let category = parse_category(&category)?;
            scheduler.update_task(category, value);
            if let Some(proof) = proof {
                scheduler.attach_proof(category, &proof);
            }
            scheduler.persist()?;
            println!("ok");
        }
        DayAction::Orgasm { proof, retract } => {
            scheduler.record_orgasm(!retract, proof.as_deref());
            scheduler.persist()?;
            println!("ok");
        }
        DayAction::Proof { proof_id } => {
            let Some(check) = scheduler.loyalty_check() else {
                eprintln!("no loyalty check on record");
                std::process::exit(1);
            };
            let check_id = check.id;
            if scheduler.submit_loyalty_proof(check_id, &proof_id, now) {
                scheduler.persist()?;
                println!("accepted");
            } else {
                eprintln!("rejected: check inactive or past deadline");
                std::process::exit(1);
            }
        }
        DayAction::RemedialProof { proof_id } => {
            if scheduler.submit_remedial_proof(&proof_id) {
                scheduler.persist()?;
                println!("accepted");
            } else {
                eprintln!("no remedial proof pending");
                std::process::exit(1);
            }
        }
        DayAction::Submit => {
            let verdict = scheduler.submit_day(now)?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }
    Ok(())
}
