//! Persistent player profile.
//!
//! [`PlayerStats`] survives between matches: currencies, per-unit levels
//! and which units are unlocked. The match controller receives it
//! explicitly and writes it back through a [`StatsStore`] after a won
//! match and after every purchase.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::data::UnitDefinition;
use crate::error::{GameError, Result};

/// Diamonds consumed by one exchange.
pub const DIAMONDS_PER_EXCHANGE: u64 = 100;

/// Gold produced by one exchange.
pub const GOLD_PER_EXCHANGE: u64 = 4000;

/// Diamond price of unlocking a unit.
pub const UNLOCK_COST_DIAMONDS: u64 = 100;

/// Level of a unit type nobody has upgraded yet.
pub const BASE_UNIT_LEVEL: u32 = 1;

/// Units a fresh profile starts with, and whether each is unlocked.
const STARTING_UNITS: [(&str, bool); 5] = [
    ("recruit", true),
    ("armored_knight", true),
    ("longbowman", true),
    ("cavalry", false),
    ("musketeer", false),
];

/// The player's persisted profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    /// Meta gold, spent on unit levels.
    pub total_gold: u64,
    /// Premium currency, spent on unlocks and exchanges.
    pub total_diamonds: u64,
    /// Level per unit id.
    pub unit_levels: BTreeMap<String, u32>,
    /// Unlock flag per unit id.
    pub unlocked_units: BTreeMap<String, bool>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            total_gold: 0,
            total_diamonds: 0,
            unit_levels: STARTING_UNITS
                .iter()
                .map(|(id, _)| ((*id).to_string(), BASE_UNIT_LEVEL))
                .collect(),
            unlocked_units: STARTING_UNITS
                .iter()
                .map(|(id, unlocked)| ((*id).to_string(), *unlocked))
                .collect(),
        }
    }
}

impl PlayerStats {
    /// Fill in any unit entries a stored profile is missing.
    #[must_use]
    pub fn merged_with_defaults(mut self) -> Self {
        let defaults = Self::default();
        for (id, level) in defaults.unit_levels {
            self.unit_levels.entry(id).or_insert(level);
        }
        for (id, unlocked) in defaults.unlocked_units {
            self.unlocked_units.entry(id).or_insert(unlocked);
        }
        self
    }

    /// Parse a profile from RON, falling back to defaults when corrupt.
    #[must_use]
    pub fn from_ron_or_default(source: &str) -> Self {
        match ron::from_str::<Self>(source) {
            Ok(stats) => stats.merged_with_defaults(),
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt player stats, using defaults");
                Self::default()
            }
        }
    }

    /// Current level of a unit type.
    #[must_use]
    pub fn unit_level(&self, unit_id: &str) -> u32 {
        self.unit_levels
            .get(unit_id)
            .copied()
            .unwrap_or(BASE_UNIT_LEVEL)
    }

    /// Whether a unit type may be produced.
    #[must_use]
    pub fn is_unlocked(&self, unit_id: &str) -> bool {
        self.unlocked_units.get(unit_id).copied().unwrap_or(false)
    }

    /// Add match rewards.
    pub fn award_rewards(&mut self, gold: u32, diamonds: u32) {
        self.total_gold = self.total_gold.saturating_add(u64::from(gold));
        self.total_diamonds = self.total_diamonds.saturating_add(u64::from(diamonds));
    }

    /// Trade diamonds for gold in whole exchanges of
    /// [`DIAMONDS_PER_EXCHANGE`].
    ///
    /// `amount` is rounded down to whole exchanges; anything below one
    /// exchange, or more than the player holds, is refused.
    pub fn exchange_diamonds_to_gold(&mut self, amount: u64) -> bool {
        if amount < DIAMONDS_PER_EXCHANGE {
            return false;
        }
        let exchanges = amount / DIAMONDS_PER_EXCHANGE;
        let cost = exchanges * DIAMONDS_PER_EXCHANGE;
        if self.total_diamonds < cost {
            return false;
        }
        self.total_diamonds -= cost;
        self.total_gold = self
            .total_gold
            .saturating_add(exchanges.saturating_mul(GOLD_PER_EXCHANGE));
        true
    }

    /// Unlock a unit type for diamonds. Already-unlocked units succeed
    /// without charge.
    pub fn unlock_unit(&mut self, unit_id: &str) -> bool {
        if self.is_unlocked(unit_id) {
            return true;
        }
        if self.total_diamonds < UNLOCK_COST_DIAMONDS {
            return false;
        }
        self.total_diamonds -= UNLOCK_COST_DIAMONDS;
        self.unlocked_units.insert(unit_id.to_string(), true);
        true
    }

    /// Gold price of the next level for a unit type: cost × current level.
    #[must_use]
    pub fn upgrade_cost_for(&self, definition: &UnitDefinition) -> u64 {
        u64::from(definition.cost) * u64::from(self.unit_level(&definition.id))
    }

    /// Raise a unit type's level by one for `cost` gold.
    pub fn upgrade_unit_level(&mut self, unit_id: &str, cost: u64) -> bool {
        if self.total_gold < cost {
            return false;
        }
        self.total_gold -= cost;
        let level = self.unit_level(unit_id).saturating_add(1);
        self.unit_levels.insert(unit_id.to_string(), level);
        true
    }

    /// Unlock every unit in `ids`.
    #[must_use]
    pub fn with_unlocked<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        for id in ids {
            self.unlocked_units.insert(id.to_string(), true);
        }
        self
    }
}

/// Where player stats live between matches.
pub trait StatsStore {
    /// Read the profile. Missing or corrupt data yields defaults.
    fn load(&self) -> PlayerStats;

    /// Persist the profile.
    fn save(&mut self, stats: &PlayerStats) -> Result<()>;
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<PlayerStats>>>,
}

impl MemoryStore {
    /// Empty store; loads return defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a profile.
    #[must_use]
    pub fn with_stats(stats: PlayerStats) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(stats))),
        }
    }

    /// The last saved profile, if any.
    #[must_use]
    pub fn saved(&self) -> Option<PlayerStats> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl StatsStore for MemoryStore {
    fn load(&self) -> PlayerStats {
        self.saved()
            .map_or_else(PlayerStats::default, PlayerStats::merged_with_defaults)
    }

    fn save(&mut self, stats: &PlayerStats) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| GameError::Persistence("stats store lock poisoned".to_string()))?;
        *slot = Some(stats.clone());
        Ok(())
    }
}

/// RON file on disk.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    path: PathBuf,
}

impl RonFileStore {
    /// Store backed by `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsStore for RonFileStore {
    fn load(&self) -> PlayerStats {
        match std::fs::read_to_string(&self.path) {
            Ok(source) => PlayerStats::from_ron_or_default(&source),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "No stored player stats");
                PlayerStats::default()
            }
        }
    }

    fn save(&mut self, stats: &PlayerStats) -> Result<()> {
        let text = ron::ser::to_string_pretty(stats, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Persistence(format!("Failed to encode stats: {e}")))?;
        std::fs::write(&self.path, text).map_err(|e| {
            GameError::Persistence(format!(
                "Failed to write '{}': {e}",
                self.path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_profile() {
        let stats = PlayerStats::default();
        assert_eq!(stats.unit_level("recruit"), 1);
        assert_eq!(stats.unit_level("unknown"), 1);
        assert!(stats.is_unlocked("longbowman"));
        assert!(!stats.is_unlocked("cavalry"));
        assert!(!stats.is_unlocked("unknown"));
    }

    #[test]
    fn test_exchange_whole_units_only() {
        let mut stats = PlayerStats {
            total_diamonds: 250,
            ..PlayerStats::default()
        };
        assert!(!stats.exchange_diamonds_to_gold(99));
        assert!(stats.exchange_diamonds_to_gold(250));
        assert_eq!(stats.total_diamonds, 50);
        assert_eq!(stats.total_gold, 8000);
        assert!(!stats.exchange_diamonds_to_gold(100));
        assert_eq!(stats.total_gold, 8000);
    }

    #[test]
    fn test_unlock_charges_once() {
        let mut stats = PlayerStats {
            total_diamonds: 150,
            ..PlayerStats::default()
        };
        assert!(stats.unlock_unit("recruit"));
        assert_eq!(stats.total_diamonds, 150);

        assert!(stats.unlock_unit("cavalry"));
        assert_eq!(stats.total_diamonds, 50);
        assert!(stats.is_unlocked("cavalry"));

        assert!(!stats.unlock_unit("musketeer"));
        assert!(!stats.is_unlocked("musketeer"));
    }

    #[test]
    fn test_unit_upgrade_cost_scales_with_level() {
        let roster = crate::data::UnitRoster::standard();
        let knight = roster
            .iter()
            .map(|(_, d)| d)
            .find(|d| d.id == "armored_knight")
            .expect("knight exists");

        let mut stats = PlayerStats {
            total_gold: 100,
            ..PlayerStats::default()
        };
        let cost = stats.upgrade_cost_for(knight);
        assert_eq!(cost, 40);
        assert!(stats.upgrade_unit_level("armored_knight", cost));
        assert_eq!(stats.unit_level("armored_knight"), 2);
        assert_eq!(stats.upgrade_cost_for(knight), 80);
        assert!(!stats.upgrade_unit_level("armored_knight", 80));
        assert_eq!(stats.total_gold, 60);
    }

    #[test]
    fn test_partial_ron_is_merged() {
        let stats = PlayerStats::from_ron_or_default(
            r#"(total_diamonds: 7, unlocked_units: {"cavalry": true})"#,
        );
        assert_eq!(stats.total_diamonds, 7);
        assert!(stats.is_unlocked("cavalry"));
        assert!(stats.is_unlocked("recruit"));
        assert_eq!(stats.unit_levels.len(), 5);
    }

    #[test]
    fn test_corrupt_ron_falls_back() {
        assert_eq!(
            PlayerStats::from_ron_or_default("{{{ not ron"),
            PlayerStats::default()
        );
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        assert_eq!(store.load(), PlayerStats::default());

        let mut stats = PlayerStats::default();
        stats.award_rewards(1000, 50);
        writer.save(&stats).expect("save");
        assert_eq!(store.load().total_gold, 1000);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = RonFileStore::new(dir.path().join("stats.ron"));
        assert_eq!(store.load(), PlayerStats::default());

        let mut stats = PlayerStats::default();
        stats.award_rewards(200, 5);
        stats.unit_levels.insert("recruit".to_string(), 4);
        store.save(&stats).expect("save");
        assert_eq!(store.load(), stats);

        std::fs::write(store.path(), "garbage(").expect("write");
        assert_eq!(store.load(), PlayerStats::default());
    }
}
