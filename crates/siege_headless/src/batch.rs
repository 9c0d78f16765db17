//! Batch match runner for balance testing.
//!
//! Runs many seeds in parallel using rayon and aggregates the results.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use siege_core::config::MatchConfig;
use siege_core::data::UnitRoster;
use siege_core::stats::PlayerStats;

use crate::metrics::{BatchSummary, GameMetrics};
use crate::runner::{run_match, Profile, RunConfig, DEFAULT_FRAME_MS, DEFAULT_MAX_FRAMES};
use crate::strategies::Strategy;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run.
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default).
    pub parallel_games: u32,
    /// Seed of the first match; the rest count up from it.
    pub seed_start: u64,
    /// Scripted player used for every match.
    pub strategy: Strategy,
    /// Match tuning; its seed is replaced per match.
    pub match_config: MatchConfig,
    /// Frame length in milliseconds.
    pub frame_ms: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            strategy: Strategy::default(),
            match_config: MatchConfig::default(),
            frame_ms: DEFAULT_FRAME_MS,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// `game_count` matches of `strategy`.
    #[must_use]
    pub fn new(strategy: Strategy, game_count: u32) -> Self {
        Self {
            strategy,
            game_count,
            ..Self::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    fn run_config(&self, seed: u64) -> RunConfig {
        RunConfig {
            match_config: MatchConfig {
                seed,
                ..self.match_config.clone()
            },
            strategy: self.strategy.clone(),
            frame_ms: self.frame_ms,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

/// File name of the saved results inside the output directory.
pub const RESULTS_FILE: &str = "batch_results.json";

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual match metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Save results as [`RESULTS_FILE`] in the configured output directory.
    pub fn save_to_output(&self) -> std::io::Result<PathBuf> {
        let path = self.config.output_dir.join(RESULTS_FILE);
        self.save(&path)?;
        Ok(path)
    }

    /// Load results from JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run a batch of matches.
///
/// Every match starts from `stats`; rewards are not carried between
/// matches.
#[must_use]
pub fn run_batch(config: BatchConfig, roster: &UnitRoster, stats: &PlayerStats) -> BatchResults {
    let start = Instant::now();

    info!(
        games = config.game_count,
        strategy = %config.strategy.name,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let games: Vec<GameMetrics> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            run_match(
                &config.run_config(seed),
                roster.clone(),
                Profile::Detached(stats.clone()),
            )
        })
        .collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        wins = summary.wins,
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
    }
}

/// Verify determinism by running the same seed several times.
#[must_use]
pub fn verify_determinism(seed: u64, runs: u32, strategy: &Strategy, roster: &UnitRoster) -> bool {
    let config = RunConfig::new(seed, strategy.clone());
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            run_match(
                &config,
                roster.clone(),
                Profile::Detached(PlayerStats::default()),
            )
            .final_state_hash
        })
        .collect();

    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        tracing::warn!(seed, ?hashes, "Non-deterministic match");
    }
    deterministic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let config = BatchConfig::new(Strategy::rush(), 6).with_seed(100);
        let results = run_batch(config, &UnitRoster::standard(), &PlayerStats::default());

        assert_eq!(results.games.len(), 6);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103, 104, 105]);
        assert_eq!(results.summary.total_games, 6);
        assert_eq!(
            results.summary.wins + results.summary.losses + results.summary.timeouts,
            6
        );
    }

    #[test]
    fn test_verify_determinism_passes() {
        assert!(verify_determinism(
            4242,
            3,
            &Strategy::economy(),
            &UnitRoster::standard()
        ));
    }
}
