//! Headless tower-defense runner.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session: line commands on stdin, JSON lines on stdout
//! cargo run -p td_headless -- run --scenario scenarios/meadow.ron
//!
//! # Scripted run that keeps ticking after the script ends
//! cargo run -p td_headless -- run --scenario scenarios/meadow.ron --auto-ticks 4000 < script.txt
//!
//! # Check a scenario file without running it
//! cargo run -p td_headless -- validate scenarios/meadow.ron
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG`.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use td_core::simulation::{MAX_TICK_RATE, TICK_RATE};
use td_headless::{load_simulation, HeadlessConfig, HeadlessRunner};

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless tower-defense runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario, reading commands from stdin
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Ticks per simulated second
        #[arg(
            long,
            default_value_t = TICK_RATE,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TICK_RATE))
        )]
        tick_rate: u32,

        /// Ticks to keep running once input ends (0 = stop at end of input)
        #[arg(long, default_value = "0")]
        auto_ticks: u64,
    },

    /// Parse a scenario and build its simulation
    Validate {
        /// Scenario file to check
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // stdout carries the protocol; logs go to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            tick_rate,
            auto_ticks,
        } => cmd_run(&scenario, tick_rate, auto_ticks),
        Commands::Validate { file } => cmd_validate(&file),
    }
}

/// Run a scenario interactively
fn cmd_run(path: &Path, tick_rate: u32, auto_ticks: u64) {
    let (data, sim) = match load_simulation(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let config = HeadlessConfig {
        tick_rate,
        auto_ticks,
    };
    let mut runner = HeadlessRunner::new(data.name, sim, config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = runner.run(stdin.lock(), stdout.lock()) {
        tracing::error!(error = %e, "I/O failure");
        std::process::exit(1);
    }
}

/// Validate a scenario file
fn cmd_validate(path: &Path) {
    match load_simulation(path) {
        Ok((data, sim)) => {
            println!("Scenario '{}' is valid", data.name);
            println!("  Map: {}x{}", data.map.cols, data.map.rows);
            println!("  Route: {} cells", sim.route_cells().len());
            println!("  Tower sites: {}", sim.tower_sites().len());
            println!("  Enemies: {}", data.enemies.len());
            println!("  Turrets: {}", data.turrets.len());
            println!("  Waves: {}", data.waves.len());
        }
        Err(e) => {
            eprintln!("Scenario {} is invalid: {e}", path.display());
            std::process::exit(1);
        }
    }
}
