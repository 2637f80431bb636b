use clap::{Parser, Subcommand};

mod commands;
mod common;
#[cfg(feature = "mic")]
mod mic;

#[derive(Parser)]
#[command(name = "vigil-cli", version, about = "Vigil CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current day control
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Live microphone monitoring loop
    Monitor(commands::monitor::MonitorArgs),
    /// Submitted-day history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Export the HTML compliance report
    Report(commands::report::ReportArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Day { action } => commands::day::run(action),
        Commands::Monitor(args) => commands::monitor::run(args),
        Commands::History { action } => commands::history::run(action),
        Commands::Report(args) => commands::report::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
