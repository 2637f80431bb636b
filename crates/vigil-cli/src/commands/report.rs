use std::path::PathBuf;

use clap::Args;
use vigil_core::report::render_report;
use vigil_core::Config;

use crate::common::{open_scheduler, wall_now};

#[derive(Args)]
pub struct ReportArgs {
    /// Output file
    #[arg(long, default_value = "vigil-report.html")]
    pub output: PathBuf,
}

pub fn run(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let scheduler = open_scheduler(&config)?;
    let history = scheduler.history()?;

    let html = render_report(&history, scheduler.streak(), wall_now().date_naive());
    std::fs::write(&args.output, html)?;
    println!("report written to {}", args.output.display());
    Ok(())
}
