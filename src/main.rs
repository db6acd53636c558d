/* 3rd party libraries */
use clap::Parser;
use log::info;
use std::path::PathBuf;

/* Custom libraries */
use simulation::{RunReport, Simulation, Verdict};

/* Modules */
mod building;
mod config;
mod dispatcher;
mod elevator;
mod error;
mod passenger;
mod shared;
mod simulation;

/// Concurrent multi-elevator building simulator.
#[derive(Parser, Debug)]
#[clap(name = "liftsim", version, about)]
struct Args {
    /// Building, timing and journeys to simulate
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the settle window before the consistency check
    #[clap(long)]
    settle_ms: Option<u64>,

    /// Do not run the consistency check at the end
    #[clap(long)]
    skip_check: bool,

    /// Print the run report as JSON
    #[clap(long)]
    json: bool,
}

/* Main */
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Load the configuration
    let mut config = unwrap_or_exit!(config::load_config(&args.config));
    if let Some(settle_ms) = args.settle_ms {
        config.timing.settle_ms = settle_ms;
    }
    info!(
        "Loaded {} with {} journeys",
        config.building.name,
        config.journeys.len()
    );

    // Run it
    let report = unwrap_or_exit!(Simulation::new(config)
        .with_check(!args.skip_check)
        .run());

    if args.json {
        println!("{}", unwrap_or_exit!(serde_json::to_string_pretty(&report)));
    } else {
        print_summary(&report);
    }

    if let Verdict::Failed(_) = report.consistency {
        std::process::exit(1);
    }
}

fn print_summary(report: &RunReport) {
    println!("Building: {}", report.building);

    println!("Journeys:");
    for journey in report.journeys.iter() {
        let elevator = journey
            .elevator
            .map(|number| format!("E{}", number))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<12} {:>4} -> {:<4} by {:<4} waited {:>7} ms, rode {:>7} ms",
            journey.name,
            journey.origin,
            journey.destination,
            elevator,
            journey.waited_ms,
            journey.rode_ms
        );
    }
    for failure in report.failures.iter() {
        println!("  failed: {}", failure);
    }

    println!("Elevators:");
    for car in report.elevators.iter() {
        println!(
            "  E{:<3} {:<8} at {:<4} moves {:>4}, stops {:>3}, peak load {:>3}",
            car.number,
            format!("{:?}", car.kind),
            car.floor,
            car.stats.moves,
            car.stats.stops,
            car.stats.peak_load
        );
    }

    match &report.consistency {
        Verdict::Skipped => println!("Consistency: skipped"),
        Verdict::Passed => println!("Consistency: passed"),
        Verdict::Failed(reason) => println!("Consistency: FAILED ({})", reason),
    }
}
