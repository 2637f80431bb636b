#[cfg(feature = "mic")]
use std::time::{Duration, Instant};

use clap::Args;
#[cfg(feature = "mic")]
use vigil_core::{BreathingClassifier, BreathingMode, CaptureSource, Config, Notifier};

#[cfg(feature = "mic")]
use crate::common::{open_scheduler, wall_now, ConsoleNotifier};
#[cfg(feature = "mic")]
use crate::mic::MicSource;

/// Coarse enforcement tick cadence.
#[cfg(feature = "mic")]
const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Args)]
pub struct MonitorArgs {
    /// Input device name (system default when omitted)
    #[arg(long)]
    pub device: Option<String>,
    /// Breathing mode: single or two
    #[arg(long)]
    pub mode: Option<String>,
    /// Stop after this many seconds (runs until killed when omitted)
    #[arg(long)]
    pub duration_secs: Option<u64>,
    /// Print per-frame metrics
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(not(feature = "mic"))]
pub fn run(_args: MonitorArgs) -> Result<(), Box<dyn std::error::Error>> {
    Err("this build has no microphone support; rebuild with `--features mic`".into())
}

#[cfg(feature = "mic")]
pub fn run(args: MonitorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut scheduler = open_scheduler(&config)?;
    let mut notifier = ConsoleNotifier;

    let mode = match args.mode.as_deref() {
        None => config.breathing.mode,
        Some("single" | "single_person" | "1") => BreathingMode::SinglePerson,
        Some("two" | "two_person" | "2") => BreathingMode::TwoPerson,
        Some(other) => return Err(format!("unknown mode: {other}").into()),
    };
    let mut classifier = BreathingClassifier::new(mode);
    let poll_interval = Duration::from_millis(config.breathing.poll_interval_ms);

    let mut mic = MicSource::new(args.device);
    match mic.start() {
        Ok(()) => println!("listening ({mode:?}, poll {poll_interval:?})"),
        Err(e) => {
            if let Some(event) = scheduler.mark_capture_lost(e.to_string(), wall_now()) {
                notifier.notify(&event);
            }
        }
    }

    let started = Instant::now();
    let mut last_tick: Option<Instant> = None;

    loop {
        if let Some(limit) = args.duration_secs {
            if started.elapsed() >= Duration::from_secs(limit) {
                break;
            }
        }
        let now = wall_now();

        match mic.poll() {
            Ok(Some(frame)) => {
                if let Some(event) = scheduler.mark_capture_restored(now) {
                    notifier.notify(&event);
                }
                let metrics = classifier.process_frame(&frame, now);
                if args.verbose {
                    println!(
                        "volume {:.4}  breathing {}  bpm {}",
                        metrics.volume, metrics.is_breathing, metrics.bpm
                    );
                }
                for event in scheduler.observe(&metrics, now) {
                    notifier.notify(&event);
                }
            }
            Ok(None) => {}
            Err(e) => {
                if let Some(event) = scheduler.mark_capture_lost(e.to_string(), now) {
                    notifier.notify(&event);
                }
            }
        }

        let tick_due = last_tick
            .map(|t| t.elapsed() >= TICK_INTERVAL)
            .unwrap_or(true);
        if tick_due {
            for event in scheduler.tick(now) {
                notifier.notify(&event);
            }
            if let Err(e) = scheduler.persist() {
                eprintln!("warning: persist failed: {e}");
            }
            last_tick = Some(Instant::now());
        }

        std::thread::sleep(poll_interval);
    }

    mic.stop();
    scheduler.persist()?;
    Ok(())
}
