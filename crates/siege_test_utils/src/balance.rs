//! Balance testing utilities for headless simulation.
//!
//! This module provides tools for running many simulated skirmishes
//! to verify unit balance and the effect of persisted unit levels.

use siege_core::combat::compute_damage;
use siege_core::config::CombatConfig;
use siege_core::data::{UnitDefinition, UnitKind, UnitRoster};
use siege_core::rng::SimRng;
use siege_core::simulation::{Match, MatchPhase};
use siege_core::stats::PlayerStats;
use siege_core::team::Team;

use crate::fixtures::{place, quiet_config};

/// Frame length used by duel runs.
const DUEL_FRAME_MS: u32 = 50;

/// Result of a simulated skirmish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelResult {
    /// The surviving side (None if both remain at the time cap).
    pub winner: Option<Team>,
    /// Milliseconds until resolution.
    pub elapsed_ms: u64,
    /// Living left units at the end.
    pub left_survivors: usize,
    /// Living right units at the end.
    pub right_survivors: usize,
}

/// Statistics for a set of skirmishes.
#[derive(Debug, Clone, Default)]
pub struct BattleStats {
    /// Total skirmishes run.
    pub total_battles: u32,
    /// Wins for the left team.
    pub wins_a: u32,
    /// Wins for the right team.
    pub wins_b: u32,
    /// Unresolved at the time cap.
    pub draws: u32,
    /// Average milliseconds to resolution.
    pub avg_elapsed_ms: f64,
}

impl BattleStats {
    /// Fold a set of results.
    #[must_use]
    pub fn from_results(results: &[DuelResult]) -> Self {
        let mut stats = Self::default();
        let mut total_ms = 0_u64;
        for result in results {
            stats.total_battles += 1;
            total_ms += result.elapsed_ms;
            match result.winner {
                Some(Team::Left) => stats.wins_a += 1,
                Some(Team::Right) => stats.wins_b += 1,
                None => stats.draws += 1,
            }
        }
        if stats.total_battles > 0 {
            stats.avg_elapsed_ms = total_ms as f64 / f64::from(stats.total_battles);
        }
        stats
    }

    /// Calculate win rate for the left team (0.0 to 1.0).
    pub fn win_rate_a(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins_a) / f64::from(self.total_battles)
    }

    /// Calculate win rate for the right team (0.0 to 1.0).
    pub fn win_rate_b(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins_b) / f64::from(self.total_battles)
    }

    /// Check if the matchup is balanced (within acceptable range).
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_a();
        rate >= min_rate && rate <= max_rate
    }
}

/// Two armies facing off on an otherwise empty lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelSetup {
    /// Unit ids placed for the left team.
    pub left: Vec<String>,
    /// Unit ids placed for the right team.
    pub right: Vec<String>,
    /// Persisted level applied to every left unit; right units are unscaled.
    pub left_level: u32,
    /// Match seed.
    pub seed: u64,
}

impl DuelSetup {
    /// Both sides field the same army.
    #[must_use]
    pub fn mirrored(army: Vec<String>, left_level: u32, seed: u64) -> Self {
        Self {
            right: army.clone(),
            left: army,
            left_level,
            seed,
        }
    }
}

/// Draw `size` unit ids from `roster`.
#[must_use]
pub fn random_army(rng: &mut SimRng, roster: &UnitRoster, size: usize) -> Vec<String> {
    (0..size)
        .filter_map(|_| {
            let kind = UnitKind(u16::try_from(rng.index(roster.len())).ok()?);
            roster.get(kind).map(|def| def.id.clone())
        })
        .collect()
}

/// Run one skirmish until a side is wiped out or `max_ms` passes.
///
/// # Panics
///
/// Panics if the setup names a unit outside the standard roster.
#[must_use]
pub fn run_duel(setup: &DuelSetup, max_ms: u64) -> DuelResult {
    let roster = UnitRoster::standard();
    let mut stats = PlayerStats::default();
    for (_, def) in roster.iter() {
        stats.unit_levels.insert(def.id.clone(), setup.left_level);
    }
    let config = siege_core::config::MatchConfig {
        seed: setup.seed,
        ..quiet_config()
    };

    let mut game = Match::new(config, roster, stats);
    for id in &setup.left {
        place(&mut game, Team::Left, id);
    }
    for id in &setup.right {
        place(&mut game, Team::Right, id);
    }

    loop {
        let left = game.active_unit_count(Team::Left);
        let right = game.active_unit_count(Team::Right);
        let elapsed_ms = game.state().elapsed_ms();

        let winner = match (left, right) {
            (0, 0) => None,
            (_, 0) => Some(Team::Left),
            (0, _) => Some(Team::Right),
            _ if elapsed_ms >= max_ms || game.phase() == MatchPhase::Ended => None,
            _ => {
                game.step(DUEL_FRAME_MS);
                continue;
            }
        };

        tracing::debug!(
            seed = setup.seed,
            left_survivors = left,
            right_survivors = right,
            elapsed_ms,
            "Duel resolved"
        );
        return DuelResult {
            winner,
            elapsed_ms,
            left_survivors: left,
            right_survivors: right,
        };
    }
}

/// Run `count` mirrored skirmishes of random armies.
#[must_use]
pub fn run_mirrored_batch(count: u32, army_size: usize, left_level: u32, seed: u64) -> BattleStats {
    let roster = UnitRoster::standard();
    let mut rng = SimRng::new(seed);
    let results: Vec<DuelResult> = (0..count)
        .map(|_| {
            let army = random_army(&mut rng, &roster, army_size);
            let setup = DuelSetup::mirrored(army, left_level, rng.next_u64());
            run_duel(&setup, 60_000)
        })
        .collect();
    BattleStats::from_results(&results)
}

/// Milliseconds for `attacker` to kill `defender` from its first swing.
///
/// The first hit lands after the fallback window, the rest one attack
/// interval apart.
#[must_use]
pub fn time_to_kill_ms(
    attacker: &UnitDefinition,
    level: Option<u32>,
    defender: &UnitDefinition,
    config: &CombatConfig,
) -> u64 {
    let opening = compute_damage(
        attacker.attack_power,
        level,
        config.level_bonus_percent,
        attacker.first_strike_bonus,
    );
    let regular = compute_damage(attacker.attack_power, level, config.level_bonus_percent, 0);
    if regular == 0 {
        return u64::MAX;
    }

    let remaining = defender.hp.saturating_sub(opening);
    let hits = 1 + u64::from(remaining.div_ceil(regular));
    (hits - 1) * u64::from(attacker.attack_interval_ms()) + u64::from(attacker.hit_fallback_ms())
}

/// Time-to-kill for every attacker/defender pair in `roster`.
#[must_use]
pub fn ttk_matrix(
    roster: &UnitRoster,
    level: Option<u32>,
    config: &CombatConfig,
) -> Vec<(String, String, u64)> {
    let mut results = Vec::new();
    for (_, attacker) in roster.iter() {
        for (_, defender) in roster.iter() {
            results.push((
                attacker.id.clone(),
                defender.id.clone(),
                time_to_kill_ms(attacker, level, defender, config),
            ));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str) -> UnitDefinition {
        let roster = UnitRoster::standard();
        let kind = roster.kind_of(id).unwrap();
        roster.get(kind).unwrap().clone()
    }

    #[test]
    fn test_recruit_ttk() {
        let recruit = def("recruit");
        let config = CombatConfig::default();
        // 100 HP / 15 damage = 7 hits; 6 intervals of 870ms plus the 348ms window.
        assert_eq!(time_to_kill_ms(&recruit, None, &recruit, &config), 5568);
        // Level 1 deals 17: 6 hits.
        assert_eq!(
            time_to_kill_ms(&recruit, Some(1), &recruit, &config),
            5 * 870 + 348
        );
    }

    #[test]
    fn test_first_strike_shortens_ttk() {
        let cavalry = def("cavalry");
        let recruit = def("recruit");
        let config = CombatConfig::default();
        // 45 then 25s: four hits instead of five.
        let interval = u64::from(cavalry.attack_interval_ms());
        assert_eq!(
            time_to_kill_ms(&cavalry, None, &recruit, &config),
            3 * interval + u64::from(cavalry.hit_fallback_ms())
        );
    }

    #[test]
    fn test_ttk_matrix_covers_all_pairs() {
        let roster = UnitRoster::standard();
        let matrix = ttk_matrix(&roster, None, &CombatConfig::default());
        assert_eq!(matrix.len(), 25);
        assert!(matrix.iter().all(|(_, _, ms)| *ms > 0));
    }

    #[test]
    fn test_single_duel_resolves() {
        let setup = DuelSetup::mirrored(vec!["recruit".into()], 3, 1);
        let result = run_duel(&setup, 60_000);
        assert_eq!(result.winner, Some(Team::Left));
        assert_eq!(result.left_survivors, 1);
        assert_eq!(result.right_survivors, 0);
    }

    #[test]
    fn test_leveled_side_dominates_mirror() {
        let baseline = run_mirrored_batch(8, 3, 0, 11);
        let leveled = run_mirrored_batch(8, 3, 5, 11);

        assert_eq!(baseline.total_battles, 8);
        assert_eq!(leveled.total_battles, 8);
        assert!(leveled.win_rate_a() > 0.75, "{leveled:?}");
    }

    #[test]
    fn test_battle_stats_rates() {
        let stats = BattleStats {
            total_battles: 10,
            wins_a: 5,
            wins_b: 4,
            draws: 1,
            avg_elapsed_ms: 0.0,
        };
        assert!((stats.win_rate_a() - 0.5).abs() < f64::EPSILON);
        assert!((stats.win_rate_b() - 0.4).abs() < f64::EPSILON);
        assert!(stats.is_balanced(0.45, 0.55));
        assert!((BattleStats::default().win_rate_a() - 0.5).abs() < f64::EPSILON);
    }
}
