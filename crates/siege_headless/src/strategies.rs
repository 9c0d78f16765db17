//! Scripted player strategies for headless playtesting.
//!
//! A strategy is a build order plus an economy target. The player buys
//! economy upgrades until the target level, then cycles through the build
//! order, waiting whenever the next unit is unaffordable or cooling down.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use siege_core::simulation::{Match, SpawnRejection};
use siege_core::unit::UnitId;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// No built-in strategy has this name.
    #[error("Unknown strategy '{0}' (expected idle, rush or economy)")]
    Unknown(String),
}

/// A complete scripted player.
///
/// # Example RON
///
/// ```ron
/// Strategy(
///     name: "Knights",
///     description: "Armored wall",
///     build_order: ["armored_knight", "longbowman"],
///     economy_target: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Units to produce, repeated forever.
    pub build_order: Vec<String>,
    /// Economy level to reach before producing anything.
    #[serde(default)]
    pub economy_target: u32,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::rush()
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Look up a built-in strategy by name.
    pub fn by_name(name: &str) -> Result<Self, StrategyError> {
        match name.to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::idle()),
            "rush" => Ok(Self::rush()),
            "economy" | "eco" => Ok(Self::economy()),
            _ => Err(StrategyError::Unknown(name.to_string())),
        }
    }

    /// Never acts; the match plays out against the enemy timer alone.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            name: "Idle".to_string(),
            description: "Takes no actions".to_string(),
            build_order: Vec::new(),
            economy_target: 0,
        }
    }

    /// Floods the lane with cheap units from the first second.
    #[must_use]
    pub fn rush() -> Self {
        Self {
            name: "Rush".to_string(),
            description: "Cheap units as fast as gold allows".to_string(),
            build_order: vec![
                "recruit".to_string(),
                "recruit".to_string(),
                "longbowman".to_string(),
            ],
            economy_target: 0,
        }
    }

    /// Upgrades the economy first, then fields a sturdier mix.
    #[must_use]
    pub fn economy() -> Self {
        Self {
            name: "Economy".to_string(),
            description: "Upgrade income, then knights behind archers".to_string(),
            build_order: vec![
                "armored_knight".to_string(),
                "longbowman".to_string(),
                "recruit".to_string(),
            ],
            economy_target: 1,
        }
    }
}

/// What a player did on one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do or waiting for gold/cooldowns.
    Wait,
    /// Bought an economy upgrade.
    Upgraded,
    /// Produced a unit.
    Spawned(UnitId),
    /// Gave up on a build-order entry that can never be produced.
    Skipped(SpawnRejection),
}

/// A strategy bound to its position in the build order.
#[derive(Debug, Clone)]
pub struct ScriptedPlayer {
    strategy: Strategy,
    cursor: usize,
}

impl ScriptedPlayer {
    /// Start at the top of the build order.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            cursor: 0,
        }
    }

    /// The strategy being played.
    #[must_use]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Take at most one action on `game`.
    pub fn act(&mut self, game: &mut Match) -> Decision {
        if self.wants_upgrade(game) {
            return if game.request_upgrade().is_ok() {
                Decision::Upgraded
            } else {
                Decision::Wait
            };
        }

        let Some(unit_id) = self
            .strategy
            .build_order
            .get(self.cursor % self.strategy.build_order.len().max(1))
        else {
            return Decision::Wait;
        };

        match game.request_spawn(unit_id) {
            Ok(id) => {
                self.cursor += 1;
                Decision::Spawned(id)
            }
            Err(SpawnRejection::OnCooldown { .. } | SpawnRejection::Unaffordable { .. }) => {
                Decision::Wait
            }
            Err(SpawnRejection::MatchEnded) => Decision::Wait,
            Err(rejection) => {
                tracing::debug!(unit = %unit_id, %rejection, "Skipping build order entry");
                self.cursor += 1;
                Decision::Skipped(rejection)
            }
        }
    }

    /// Whether the economy target is still reachable and not yet reached.
    fn wants_upgrade(&self, game: &Match) -> bool {
        let economy = game.state().economy();
        economy.level() < self.strategy.economy_target
            && !economy.is_max_level()
            && economy.upgrade_cost() <= economy.cap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(Strategy::by_name("RUSH").unwrap(), Strategy::rush());
        assert_eq!(Strategy::by_name("eco").unwrap(), Strategy::economy());
        assert!(matches!(
            Strategy::by_name("turtle"),
            Err(StrategyError::Unknown(_))
        ));
    }

    #[test]
    fn test_ron_roundtrip() {
        let ron = r#"Strategy(name: "Archers", build_order: ["longbowman"])"#;
        let strategy = Strategy::from_ron_str(ron).unwrap();
        assert_eq!(strategy.build_order, vec!["longbowman".to_string()]);
        assert_eq!(strategy.economy_target, 0);
        assert!(strategy.description.is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Strategy::load("/definitely/not/here.ron"),
            Err(StrategyError::FileNotFound(_))
        ));
    }
}
