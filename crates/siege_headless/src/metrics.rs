//! Match metrics collection for balance analysis.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use siege_core::hooks::PresentationHooks;
use siege_core::results::{EndReason, MatchResult};
use siege_core::team::Team;
use siege_core::unit::{StateTransition, Unit, UnitId, UnitState};

/// Per-team counters gathered while a match runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTally {
    /// Units that entered the field.
    pub units_spawned: u32,
    /// Units that died.
    pub units_lost: u32,
    /// Damage this team's base took.
    pub base_damage_taken: u32,
}

/// Presentation hooks that only count.
#[derive(Debug, Clone, Default)]
pub struct MetricsHooks {
    inner: Arc<Mutex<TallyState>>,
}

#[derive(Debug, Default)]
struct TallyState {
    teams: BTreeMap<UnitId, Team>,
    left: TeamTally,
    right: TeamTally,
}

impl TallyState {
    fn tally_mut(&mut self, team: Team) -> &mut TeamTally {
        match team {
            Team::Left => &mut self.left,
            Team::Right => &mut self.right,
        }
    }
}

impl MetricsHooks {
    /// Fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for one team so far.
    #[must_use]
    pub fn tally(&self, team: Team) -> TeamTally {
        self.inner
            .lock()
            .map(|state| match team {
                Team::Left => state.left,
                Team::Right => state.right,
            })
            .unwrap_or_default()
    }

    fn with_state(&self, f: impl FnOnce(&mut TallyState)) {
        if let Ok(mut state) = self.inner.lock() {
            f(&mut state);
        }
    }
}

impl PresentationHooks for MetricsHooks {
    fn on_unit_spawned(&mut self, unit: &Unit) {
        self.with_state(|state| {
            state.teams.insert(unit.id(), unit.team());
            state.tally_mut(unit.team()).units_spawned += 1;
        });
    }

    fn on_unit_state_changed(&mut self, change: &StateTransition) {
        if change.to != UnitState::Dying {
            return;
        }
        self.with_state(|state| {
            if let Some(team) = state.teams.get(&change.unit).copied() {
                state.tally_mut(team).units_lost += 1;
            }
        });
    }

    fn on_base_damaged(&mut self, team: Team, damage: u32, _remaining: u32) {
        self.with_state(|state| state.tally_mut(team).base_damage_taken += damage);
    }
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Random seed used.
    pub seed: u64,
    /// Strategy name.
    pub strategy: String,
    /// Final result.
    pub result: MatchResult,
    /// Match time in milliseconds.
    pub duration_ms: u64,
    /// Simulation ticks run.
    pub ticks: u64,
    /// Economy upgrades bought.
    pub upgrades: u32,
    /// Build-order entries skipped as unproducible.
    pub skipped: u32,
    /// Player counters.
    pub player: TeamTally,
    /// Enemy counters.
    pub enemy: TeamTally,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total matches played.
    pub total_games: u32,
    /// Matches won.
    pub wins: u32,
    /// Matches lost to base destruction.
    pub losses: u32,
    /// Matches lost to the time limit.
    pub timeouts: u32,
    /// Win rate (0.0 to 1.0).
    pub win_rate: f64,
    /// Average stars over all matches.
    pub avg_stars: f64,
    /// Average match length in seconds.
    pub avg_duration_secs: f64,
    /// Shortest match in seconds.
    pub min_duration_secs: u32,
    /// Longest match in seconds.
    pub max_duration_secs: u32,
    /// Average units produced by the player.
    pub avg_units_produced: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let total = u32::try_from(games.len()).unwrap_or(u32::MAX);
        let mut summary = Self {
            total_games: total,
            min_duration_secs: u32::MAX,
            ..Self::default()
        };

        let mut stars = 0_u64;
        let mut duration = 0_u64;
        let mut produced = 0_u64;
        for game in games {
            let result = &game.result;
            match (result.victory, result.reason) {
                (true, _) => summary.wins += 1,
                (false, EndReason::TimeExpired) => summary.timeouts += 1,
                (false, EndReason::BaseDestroyed) => summary.losses += 1,
            }
            stars += u64::from(result.stars);
            duration += u64::from(result.elapsed_secs);
            produced += u64::from(game.player.units_spawned);
            summary.min_duration_secs = summary.min_duration_secs.min(result.elapsed_secs);
            summary.max_duration_secs = summary.max_duration_secs.max(result.elapsed_secs);
        }

        let count = f64::from(total);
        summary.win_rate = f64::from(summary.wins) / count;
        summary.avg_stars = stars as f64 / count;
        summary.avg_duration_secs = duration as f64 / count;
        summary.avg_units_produced = produced as f64 / count;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(victory: bool, reason: EndReason, elapsed_secs: u32, stars: u8) -> GameMetrics {
        GameMetrics {
            seed: 0,
            strategy: "Rush".to_string(),
            result: MatchResult {
                victory,
                reason,
                elapsed_secs,
                stars,
                gold_reward: 0,
                diamond_reward: 0,
            },
            duration_ms: u64::from(elapsed_secs) * 1000,
            ticks: 0,
            upgrades: 0,
            skipped: 0,
            player: TeamTally {
                units_spawned: 4,
                ..TeamTally::default()
            },
            enemy: TeamTally::default(),
            final_state_hash: 0,
        }
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let games = vec![
            game(true, EndReason::BaseDestroyed, 50, 3),
            game(false, EndReason::BaseDestroyed, 90, 0),
            game(false, EndReason::TimeExpired, 180, 0),
            game(true, EndReason::BaseDestroyed, 100, 2),
        ];
        let summary = BatchSummary::from_games(&games);

        assert_eq!(summary.total_games, 4);
        assert_eq!((summary.wins, summary.losses, summary.timeouts), (2, 1, 1));
        assert!((summary.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((summary.avg_stars - 1.25).abs() < f64::EPSILON);
        assert!((summary.avg_duration_secs - 105.0).abs() < f64::EPSILON);
        assert_eq!(summary.min_duration_secs, 50);
        assert_eq!(summary.max_duration_secs, 180);
        assert!((summary.avg_units_produced - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
