use clap::Subcommand;
use vigil_core::Config;

use crate::common::open_scheduler;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List submitted days, most recent first
    List,
    /// Show one submitted day as JSON
    Show { date: String },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let scheduler = open_scheduler(&config)?;

    match action {
        HistoryAction::List => {
            let items = scheduler.history()?;
            if items.is_empty() {
                println!("no submitted days yet");
                return Ok(());
            }
            for item in items {
                let punishment = item.punishment.as_deref().unwrap_or("-");
                println!(
                    "{}  {:>3}  {:<6}  missed {}  x{:.1}  {}",
                    item.date,
                    item.score,
                    item.feedback.as_str(),
                    item.missed_checks,
                    item.multiplier,
                    punishment,
                );
            }
        }
        HistoryAction::Show { date } => {
            let date = date.parse()?;
            match scheduler
                .history()?
                .into_iter()
                .find(|item| item.date == date)
            {
                Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
                None => {
                    eprintln!("no history for {date}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
