//! The roster of unit definitions shared by both teams.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::unit_data::UnitDefinition;
use crate::error::{GameError, Result};

/// Index of a definition inside a [`UnitRoster`].
///
/// Slot order of the roster is also the order of the production buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKind(pub u16);

impl UnitKind {
    /// Position of this kind within the roster.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered set of unit definitions.
///
/// # Example RON
///
/// ```ron
/// UnitRoster(
///     units: [
///         UnitDefinition(id: "recruit", ...),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRoster {
    /// Definitions in slot order.
    pub units: Vec<UnitDefinition>,
}

impl UnitRoster {
    /// Build a roster from definitions, rejecting invalid data.
    pub fn new(units: Vec<UnitDefinition>) -> Result<Self> {
        let roster = Self { units };
        let errors = roster.validate();
        if errors.is_empty() {
            Ok(roster)
        } else {
            Err(GameError::ValidationError(errors))
        }
    }

    /// Parse a roster from RON text.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        let roster: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::new(roster.units)
    }

    /// Load a roster from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&source, &path.display().to_string())
    }

    /// Validate every definition and the roster as a whole.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.units.is_empty() {
            errors.push("Roster has no units".to_string());
        }
        if self.units.len() > usize::from(u16::MAX) {
            errors.push(format!("Roster has too many units: {}", self.units.len()));
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id.as_str()) {
                errors.push(format!("Duplicate unit id '{}'", unit.id));
            }
            errors.extend(unit.validate());
        }

        errors
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a definition by kind.
    #[must_use]
    pub fn get(&self, kind: UnitKind) -> Option<&UnitDefinition> {
        self.units.get(kind.index())
    }

    /// Resolve a string identifier to its kind.
    #[must_use]
    pub fn kind_of(&self, id: &str) -> Option<UnitKind> {
        self.units
            .iter()
            .position(|unit| unit.id == id)
            .and_then(|index| u16::try_from(index).ok())
            .map(UnitKind)
    }

    /// Iterate definitions with their kinds, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitKind, &UnitDefinition)> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(index, unit)| u16::try_from(index).ok().map(|i| (UnitKind(i), unit)))
    }

    /// The stock five-unit roster.
    #[must_use]
    pub fn standard() -> Self {
        let unit = |id: &str,
                    name: &str,
                    cost: u32,
                    hp: u32,
                    attack_power: u32,
                    attack_range: u32,
                    move_speed: u32,
                    attacks_per_minute: u32,
                    production_cooldown_ms: u32| UnitDefinition {
            id: id.to_string(),
            name: name.to_string(),
            cost,
            hp,
            attack_power,
            attack_range,
            move_speed,
            attacks_per_minute,
            production_cooldown_ms,
            ranged: false,
            first_strike_bonus: 0,
            sound_pitch_percent: 100,
        };

        let recruit = unit("recruit", "Recruit", 20, 100, 15, 20, 120, 69, 900);
        let armored_knight = UnitDefinition {
            sound_pitch_percent: 60,
            ..unit("armored_knight", "Armored Knight", 40, 250, 10, 30, 60, 42, 1700)
        };
        let longbowman = UnitDefinition {
            ranged: true,
            sound_pitch_percent: 145,
            ..unit("longbowman", "Longbowman", 30, 50, 12, 200, 140, 54, 1400)
        };
        let cavalry = UnitDefinition {
            first_strike_bonus: 20,
            sound_pitch_percent: 120,
            ..unit("cavalry", "Cavalry", 60, 180, 25, 40, 220, 66, 2100)
        };
        let musketeer = UnitDefinition {
            ranged: true,
            sound_pitch_percent: 55,
            ..unit("musketeer", "Musketeer", 85, 60, 50, 150, 50, 27, 3000)
        };

        Self {
            units: vec![recruit, armored_knight, longbowman, cavalry, musketeer],
        }
    }
}

impl Default for UnitRoster {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_roster_is_valid() {
        let roster = UnitRoster::standard();
        assert!(roster.validate().is_empty(), "{:?}", roster.validate());
        assert_eq!(roster.len(), 5);
    }

    #[test]
    fn test_kind_lookup() {
        let roster = UnitRoster::standard();
        let kind = roster.kind_of("longbowman").expect("longbowman exists");
        assert_eq!(kind, UnitKind(2));
        assert!(roster.get(kind).is_some_and(|d| d.ranged));
        assert!(roster.kind_of("dragon").is_none());
    }

    #[test]
    fn test_only_cavalry_has_first_strike() {
        let roster = UnitRoster::standard();
        let charged: Vec<_> = roster
            .iter()
            .filter(|(_, d)| d.first_strike_bonus > 0)
            .map(|(_, d)| d.id.as_str())
            .collect();
        assert_eq!(charged, vec!["cavalry"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut units = UnitRoster::standard().units;
        units.push(units[0].clone());
        let err = UnitRoster::new(units).expect_err("duplicates must fail");
        assert!(matches!(err, GameError::ValidationError(ref e) if e.len() == 1));
    }

    #[test]
    fn test_ron_round_trip_through_text() {
        let roster = UnitRoster::standard();
        let text = ron::ser::to_string_pretty(&roster, ron::ser::PrettyConfig::default())
            .expect("serializes");
        let parsed = UnitRoster::from_ron_str(&text, "inline").expect("parses");
        assert_eq!(parsed, roster);
    }

    #[test]
    fn test_bad_ron_reports_path() {
        let err = UnitRoster::from_ron_str("UnitRoster(units: 5)", "bad.ron").expect_err("fails");
        assert!(err.to_string().contains("bad.ron"));
    }
}
