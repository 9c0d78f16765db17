//! Headless Lane Siege runner.
//!
//! Plays matches without presentation. Results go to stdout as JSON,
//! logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Play one match with the rush script
//! cargo run -p siege_headless -- run --seed 7 --strategy rush
//!
//! # Keep a persistent profile between runs
//! cargo run -p siege_headless -- run --stats profile.ron
//!
//! # Run a batch of seeds in parallel
//! cargo run -p siege_headless -- batch --count 1000 --output results/
//!
//! # Validate a roster file
//! cargo run -p siege_headless -- validate --roster units.ron
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siege_core::config::MatchConfig;
use siege_core::data::UnitRoster;
use siege_core::stats::{PlayerStats, RonFileStore};
use siege_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{run_match, Profile, RunConfig},
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "siege_headless")]
#[command(about = "Headless Lane Siege runner for playtests, balance batches and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Unit roster RON file (defaults to the built-in roster)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Match tuning RON file (defaults to the built-in tuning)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match and print its result
    Run {
        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Built-in strategy: idle, rush or economy
        #[arg(short, long, default_value = "rush")]
        strategy: String,

        /// Strategy RON file, overrides --strategy
        #[arg(long)]
        strategy_file: Option<PathBuf>,

        /// Player profile RON file, read at start and written on victory
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Frame length in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u32,

        /// Print full metrics instead of just the result
        #[arg(long)]
        metrics: bool,
    },

    /// Run a batch of matches for balance testing
    Batch {
        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Built-in strategy: idle, rush or economy
        #[arg(short, long, default_value = "rush")]
        strategy: String,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Built-in strategy: idle, rush or economy
        #[arg(short, long, default_value = "economy")]
        strategy: String,
    },

    /// Load and validate roster and tuning files
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr; stdout carries results
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let outcome = load_inputs(&cli).and_then(|(roster, config)| match cli.command {
        Commands::Run {
            seed,
            strategy,
            strategy_file,
            stats,
            frame_ms,
            metrics,
        } => cmd_run(
            roster,
            config,
            seed,
            &strategy,
            strategy_file,
            stats,
            frame_ms,
            metrics,
        ),
        Commands::Batch {
            count,
            parallel,
            seed,
            strategy,
            output,
        } => cmd_batch(&roster, config, count, parallel, seed, &strategy, output),
        Commands::Verify {
            seed,
            runs,
            strategy,
        } => cmd_verify(&roster, seed, runs, &strategy),
        Commands::Validate => {
            eprintln!("OK: roster has {} units, tuning is valid", roster.len());
            Ok(())
        }
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

fn load_inputs(cli: &Cli) -> Result<(UnitRoster, MatchConfig), String> {
    let roster = match &cli.roster {
        Some(path) => UnitRoster::load(path).map_err(|e| e.to_string())?,
        None => UnitRoster::standard(),
    };
    let config = match &cli.config {
        Some(path) => MatchConfig::load(path).map_err(|e| e.to_string())?,
        None => MatchConfig::default(),
    };
    let problems = config.validate();
    if !problems.is_empty() {
        return Err(format!("Invalid match tuning: {}", problems.join("; ")));
    }
    Ok((roster, config))
}

fn load_strategy(name: &str, file: Option<PathBuf>) -> Result<Strategy, String> {
    match file {
        Some(path) => Strategy::load(path),
        None => Strategy::by_name(name),
    }
    .map_err(|e| e.to_string())
}

/// Play one match
fn cmd_run(
    roster: UnitRoster,
    config: MatchConfig,
    seed: u64,
    strategy: &str,
    strategy_file: Option<PathBuf>,
    stats: Option<PathBuf>,
    frame_ms: u32,
    metrics: bool,
) -> Result<(), String> {
    let strategy = load_strategy(strategy, strategy_file)?;
    tracing::info!(seed, strategy = %strategy.name, frame_ms, "Running match");

    let run = RunConfig {
        match_config: MatchConfig { seed, ..config },
        strategy,
        frame_ms: frame_ms.max(1),
        ..RunConfig::default()
    };
    let profile = match stats {
        Some(path) => Profile::Stored(Box::new(RonFileStore::new(path))),
        None => Profile::Detached(PlayerStats::default()),
    };

    let game = run_match(&run, roster, profile);
    let json = if metrics {
        serde_json::to_string_pretty(&game)
    } else {
        serde_json::to_string_pretty(&game.result)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Run batch of matches for balance testing
fn cmd_batch(
    roster: &UnitRoster,
    config: MatchConfig,
    count: u32,
    parallel: u32,
    seed: u64,
    strategy: &str,
    output: PathBuf,
) -> Result<(), String> {
    let strategy = Strategy::by_name(strategy).map_err(|e| e.to_string())?;

    let batch = BatchConfig {
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        strategy,
        match_config: config,
        ..BatchConfig::default()
    }
    .with_output(output);

    let results = run_batch(batch, roster, &PlayerStats::default());
    let results_path = results
        .save_to_output()
        .map_err(|e| format!("Failed to save results: {e}"))?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", summary.total_games);
    eprintln!(
        "Wins: {}  Losses: {}  Timeouts: {}",
        summary.wins, summary.losses, summary.timeouts
    );
    eprintln!("Win rate: {:.1}%", summary.win_rate * 100.0);
    eprintln!("Average stars: {:.2}", summary.avg_stars);
    eprintln!("Average duration: {:.1}s", summary.avg_duration_secs);
    eprintln!("Results: {}", results_path.display());

    let json = serde_json::to_string_pretty(summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Verify determinism by running same seed multiple times
fn cmd_verify(roster: &UnitRoster, seed: u64, runs: u32, strategy: &str) -> Result<(), String> {
    let strategy = Strategy::by_name(strategy).map_err(|e| e.to_string())?;
    tracing::info!(seed, runs, strategy = %strategy.name, "Verifying determinism");

    if verify_determinism(seed, runs, &strategy, roster) {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(())
    } else {
        Err("Non-determinism detected!".to_string())
    }
}
