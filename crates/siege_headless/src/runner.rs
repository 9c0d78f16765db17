//! Single-match runner.
//!
//! Plays one match to completion at a fixed frame length with a scripted
//! player, collecting [`GameMetrics`] on the way.

use serde::{Deserialize, Serialize};

use siege_core::config::MatchConfig;
use siege_core::data::UnitRoster;
use siege_core::simulation::{Match, MatchPhase};
use siege_core::stats::{PlayerStats, StatsStore};
use siege_core::team::Team;

use crate::metrics::{GameMetrics, MetricsHooks};
use crate::strategies::{Decision, ScriptedPlayer, Strategy};

/// Default frame length (about 60 frames per second).
pub const DEFAULT_FRAME_MS: u32 = 16;

/// Safety cap on frames; the match clock ends every match well before.
pub const DEFAULT_MAX_FRAMES: u64 = 50_000;

/// How to play one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Match tuning, including the seed.
    pub match_config: MatchConfig,
    /// Scripted player.
    pub strategy: Strategy,
    /// Frame length in milliseconds.
    pub frame_ms: u32,
    /// Frame cap.
    pub max_frames: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            strategy: Strategy::default(),
            frame_ms: DEFAULT_FRAME_MS,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl RunConfig {
    /// Default tuning with `seed` and `strategy`.
    #[must_use]
    pub fn new(seed: u64, strategy: Strategy) -> Self {
        Self {
            match_config: MatchConfig::with_seed(seed),
            strategy,
            ..Self::default()
        }
    }
}

/// Where the player profile comes from and goes to.
pub enum Profile {
    /// A profile held by the caller; never written anywhere.
    Detached(PlayerStats),
    /// A store that is read at start and written on victory.
    Stored(Box<dyn StatsStore + Send>),
}

/// Play one match to its end.
#[must_use]
pub fn run_match(config: &RunConfig, roster: UnitRoster, profile: Profile) -> GameMetrics {
    let hooks = MetricsHooks::new();
    let match_config = config.match_config.clone();
    let seed = match_config.seed;
    let mut game = match profile {
        Profile::Detached(stats) => Match::new(match_config, roster, stats),
        Profile::Stored(store) => Match::with_store(match_config, roster, BoxedStore(store)),
    }
    .with_hooks(hooks.clone());

    let mut player = ScriptedPlayer::new(config.strategy.clone());
    let mut upgrades = 0;
    let mut skipped = 0;
    let mut frames = 0;

    while game.phase() == MatchPhase::Running && frames < config.max_frames {
        match player.act(&mut game) {
            Decision::Upgraded => upgrades += 1,
            Decision::Skipped(_) => skipped += 1,
            Decision::Wait | Decision::Spawned(_) => {}
        }
        game.step(config.frame_ms);
        frames += 1;
    }

    let Some(result) = game.result().copied() else {
        tracing::warn!(seed, frames, "Match hit the frame cap without ending");
        return incomplete_metrics(&game, config, &hooks, upgrades, skipped);
    };

    tracing::debug!(
        seed,
        victory = result.victory,
        stars = result.stars,
        elapsed_secs = result.elapsed_secs,
        "Headless match finished"
    );

    GameMetrics {
        seed,
        strategy: config.strategy.name.clone(),
        result,
        duration_ms: game.state().elapsed_ms(),
        ticks: game.state().tick(),
        upgrades,
        skipped,
        player: hooks.tally(Team::Left),
        enemy: hooks.tally(Team::Right),
        final_state_hash: game.state_hash(),
    }
}

fn incomplete_metrics(
    game: &Match,
    config: &RunConfig,
    hooks: &MetricsHooks,
    upgrades: u32,
    skipped: u32,
) -> GameMetrics {
    let elapsed_secs = u32::try_from(game.elapsed_secs()).unwrap_or(u32::MAX);
    GameMetrics {
        seed: config.match_config.seed,
        strategy: config.strategy.name.clone(),
        result: siege_core::results::MatchResult::grade(
            false,
            siege_core::results::EndReason::TimeExpired,
            elapsed_secs,
            &config.match_config.reward_tiers,
        ),
        duration_ms: game.state().elapsed_ms(),
        ticks: game.state().tick(),
        upgrades,
        skipped,
        player: hooks.tally(Team::Left),
        enemy: hooks.tally(Team::Right),
        final_state_hash: game.state_hash(),
    }
}

/// Adapts a boxed store to the `impl StatsStore` the match expects.
struct BoxedStore(Box<dyn StatsStore + Send>);

impl StatsStore for BoxedStore {
    fn load(&self) -> PlayerStats {
        self.0.load()
    }

    fn save(&mut self, stats: &PlayerStats) -> siege_core::error::Result<()> {
        self.0.save(stats)
    }
}
