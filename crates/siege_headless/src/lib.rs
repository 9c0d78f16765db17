//! Headless match runner for scripted playtests and CI verification.
//!
//! This crate plays matches without any presentation attached:
//!
//! - **Scripted play**: a [`Strategy`] drives the player side
//! - **Balance batches**: many seeds in parallel, summarised as JSON
//! - **Determinism checks**: the same seed replayed several times
//!
//! # Example
//!
//! ```bash
//! # One match, result as JSON on stdout
//! cargo run -p siege_headless -- run --seed 7 --strategy rush
//!
//! # 500 seeds in parallel
//! cargo run -p siege_headless -- batch --count 500 --output results/
//!
//! # Verify determinism
//! cargo run -p siege_headless -- verify --seed 12345 --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod strategies;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, GameMetrics, MetricsHooks, TeamTally};
pub use runner::{run_match, Profile, RunConfig};
pub use strategies::{Decision, ScriptedPlayer, Strategy, StrategyError};
