//! Match tuning.
//!
//! Every number the simulation uses lives here so balance passes can be
//! run from RON files without recompiling. `MatchConfig::default()` is the
//! shipped tuning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::team::Team;

/// Horizontal extent of a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseSpan {
    /// Lane coordinate of the left edge.
    pub left_edge: i32,
    /// Lane coordinate of the right edge.
    pub right_edge: i32,
}

/// Battlefield layout in lane units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneGeometry {
    /// Player base.
    pub left_base: BaseSpan,
    /// Enemy base.
    pub right_base: BaseSpan,
    /// Baseline every unit walks on.
    pub lane_y: i32,
    /// Distance in front of a base at which new units appear.
    pub spawn_offset: i32,
}

impl Default for LaneGeometry {
    fn default() -> Self {
        Self {
            left_base: BaseSpan {
                left_edge: 40,
                right_edge: 240,
            },
            right_base: BaseSpan {
                left_edge: 1040,
                right_edge: 1240,
            },
            lane_y: 360,
            spawn_offset: 20,
        }
    }
}

impl LaneGeometry {
    /// Base span owned by `team`.
    #[must_use]
    pub const fn base(&self, team: Team) -> BaseSpan {
        match team {
            Team::Left => self.left_base,
            Team::Right => self.right_base,
        }
    }

    /// Spawn x for a team: just outside its own base, facing the enemy.
    #[must_use]
    pub fn spawn_x(&self, team: Team) -> Fixed {
        match team {
            Team::Left => Fixed::from_num(self.left_base.right_edge + self.spawn_offset),
            Team::Right => Fixed::from_num(self.right_base.left_edge - self.spawn_offset),
        }
    }
}

/// Gold regeneration and the upgrade ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Gold at match start.
    pub start_amount: u32,
    /// Initial regeneration per second.
    pub start_rate: u32,
    /// Initial cap.
    pub start_cap: u32,
    /// Rate added per upgrade.
    pub rate_bonus: u32,
    /// Cap added per upgrade.
    pub cap_bonus: u32,
    /// Cost of the first upgrade.
    pub first_upgrade_cost: u32,
    /// Number of upgrades available.
    pub max_level: u32,
    /// Cost multiplier per upgrade, in percent.
    pub cost_growth_percent: u32,
    /// Flat cost added per upgrade.
    pub cost_step: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            start_amount: 50,
            start_rate: 5,
            start_cap: 100,
            rate_bonus: 2,
            cap_bonus: 50,
            first_upgrade_cost: 100,
            max_level: 10,
            cost_growth_percent: 135,
            cost_step: 25,
        }
    }
}

/// Engagement, stacking and animation timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Minimum distance from a base edge at which units stop and attack it.
    pub siege_distance: u32,
    /// Engagement range of melee units against other units.
    pub melee_engage_range: u32,
    /// Same-kind units closer than this to the target x spread out laterally.
    pub stack_band: u32,
    /// Largest lateral stacking offset in either direction.
    pub stack_offset_max: i32,
    /// Offset used when the random roll lands on zero.
    pub stack_offset_fallback: i32,
    /// Length of the forward lunge after an attack, in milliseconds.
    pub attack_dash_ms: u32,
    /// Peak forward lunge distance.
    pub attack_dash_distance: u32,
    /// Time a dying unit stays on the field before removal.
    pub death_duration_ms: u32,
    /// Damage bonus per player unit level, in percent.
    pub level_bonus_percent: u32,
    /// Level assumed for unit types without a persisted level.
    pub default_unit_level: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            siege_distance: 50,
            melee_engage_range: 40,
            stack_band: 10,
            stack_offset_max: 10,
            stack_offset_fallback: 6,
            attack_dash_ms: 100,
            attack_dash_distance: 5,
            death_duration_ms: 1500,
            level_bonus_percent: 10,
            default_unit_level: 1,
        }
    }
}

/// The autonomous enemy's spawn timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySpawnConfig {
    /// Whether the enemy spawns on its own at all.
    pub enabled: bool,
    /// Shortest delay between spawns (inclusive).
    pub min_delay_ms: u32,
    /// Longest delay between spawns (inclusive).
    pub max_delay_ms: u32,
}

impl Default for EnemySpawnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: 3000,
            max_delay_ms: 7000,
        }
    }
}

/// A victory band: finishing before `under_secs` earns these rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardTier {
    /// Exclusive upper bound on elapsed whole seconds.
    pub under_secs: u32,
    /// Star rating.
    pub stars: u8,
    /// Gold reward.
    pub gold: u32,
    /// Diamond reward.
    pub diamonds: u32,
}

/// Complete match configuration.
///
/// # Example RON
///
/// ```ron
/// MatchConfig(
///     seed: 7,
///     base_max_hp: 300,
///     enemy_spawn: (enabled: false),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Seed for every random decision in the match.
    pub seed: u64,
    /// Battlefield layout.
    pub lane: LaneGeometry,
    /// Gold economy.
    pub economy: EconomyConfig,
    /// Combat tuning.
    pub combat: CombatConfig,
    /// Enemy spawn timer.
    pub enemy_spawn: EnemySpawnConfig,
    /// Starting and maximum health of both bases.
    pub base_max_hp: u32,
    /// Match length; reaching it with both bases standing is a defeat.
    pub time_limit_secs: u32,
    /// Victory tiers, fastest first.
    pub reward_tiers: Vec<RewardTier>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            lane: LaneGeometry::default(),
            economy: EconomyConfig::default(),
            combat: CombatConfig::default(),
            enemy_spawn: EnemySpawnConfig::default(),
            base_max_hp: 500,
            time_limit_secs: 180,
            reward_tiers: vec![
                RewardTier {
                    under_secs: 60,
                    stars: 3,
                    gold: 1000,
                    diamonds: 50,
                },
                RewardTier {
                    under_secs: 120,
                    stars: 2,
                    gold: 500,
                    diamonds: 20,
                },
                RewardTier {
                    under_secs: 180,
                    stars: 1,
                    gold: 200,
                    diamonds: 5,
                },
            ],
        }
    }
}

impl MatchConfig {
    /// Default tuning with a specific seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Time limit in milliseconds.
    #[must_use]
    pub const fn time_limit_ms(&self) -> u64 {
        self.time_limit_secs as u64 * 1000
    }

    /// Parse a config from RON text. Missing fields take their defaults.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(GameError::ValidationError(errors))
        }
    }

    /// Load a config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&source, &path.display().to_string())
    }

    /// Check internal consistency, returning human-readable problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let (left, right) = (self.lane.left_base, self.lane.right_base);
        if left.left_edge > left.right_edge || right.left_edge > right.right_edge {
            errors.push("Base edges are inverted".to_string());
        }
        if left.right_edge >= right.left_edge {
            errors.push("Bases overlap".to_string());
        }
        if self.base_max_hp == 0 {
            errors.push("Bases need positive health".to_string());
        }
        if self.economy.start_amount > self.economy.start_cap {
            errors.push("Starting gold exceeds the cap".to_string());
        }
        if self.enemy_spawn.min_delay_ms > self.enemy_spawn.max_delay_ms {
            errors.push("Enemy spawn window is inverted".to_string());
        }
        if self.enemy_spawn.enabled && self.enemy_spawn.min_delay_ms == 0 {
            errors.push("Enemy spawn delay must be positive".to_string());
        }
        if self.combat.stack_offset_max < 0 {
            errors.push("Stack offset must not be negative".to_string());
        }
        if self
            .reward_tiers
            .windows(2)
            .any(|pair| pair[0].under_secs >= pair[1].under_secs)
        {
            errors.push("Reward tiers must be ordered fastest first".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.time_limit_ms(), 180_000);
    }

    #[test]
    fn test_spawn_positions_face_the_enemy() {
        let lane = LaneGeometry::default();
        assert_eq!(lane.spawn_x(Team::Left), Fixed::from_num(260));
        assert_eq!(lane.spawn_x(Team::Right), Fixed::from_num(1020));
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let config = MatchConfig::from_ron_str(
            "MatchConfig(seed: 9, base_max_hp: 300, enemy_spawn: (enabled: false))",
            "inline",
        )
        .expect("valid config");
        assert_eq!(config.seed, 9);
        assert_eq!(config.base_max_hp, 300);
        assert!(!config.enemy_spawn.enabled);
        assert_eq!(config.enemy_spawn.max_delay_ms, 7000);
        assert_eq!(config.economy, EconomyConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = MatchConfig::from_ron_str(
            "MatchConfig(enemy_spawn: (min_delay_ms: 9000, max_delay_ms: 10))",
            "inline",
        )
        .expect_err("inverted window");
        assert!(matches!(err, GameError::ValidationError(_)));
    }
}
