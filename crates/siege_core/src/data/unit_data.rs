//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, scale_percent_round, Fixed};

/// Slowest allowed attack rate, in attacks per minute (0.1 per second).
const MIN_ATTACKS_PER_MINUTE: u32 = 6;

/// Share of the attack interval used as the hit fallback window.
const HIT_FALLBACK_PERCENT: u32 = 40;

/// Lower bound of the hit fallback window in milliseconds.
const HIT_FALLBACK_MIN_MS: u32 = 160;

/// Upper bound of the hit fallback window in milliseconds.
const HIT_FALLBACK_MAX_MS: u32 = 420;

/// Data-driven unit definition.
///
/// Immutable once loaded; both teams spawn from the same definitions.
///
/// # Example RON
///
/// ```ron
/// UnitDefinition(
///     id: "cavalry",
///     name: "Cavalry",
///     cost: 60,
///     hp: 180,
///     attack_power: 25,
///     attack_range: 40,
///     move_speed: 220,
///     attacks_per_minute: 66,
///     production_cooldown_ms: 2100,
///     first_strike_bonus: 20,
///     sound_pitch_percent: 120,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Unique string identifier, also the key for persisted levels.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Gold cost to produce this unit.
    pub cost: u32,

    /// Maximum health points.
    pub hp: u32,

    /// Base damage per attack.
    pub attack_power: u32,

    /// Attack range in lane units.
    pub attack_range: u32,

    /// Movement speed in lane units per second.
    pub move_speed: u32,

    /// Attack rate in whole attacks per minute.
    ///
    /// Rates are quantized to 1/60 attack per second so intervals stay
    /// integer milliseconds: 1.15/s is stored as 69 and attacks every
    /// 870ms rather than 869.57ms.
    pub attacks_per_minute: u32,

    /// Production cooldown of this unit's slot in milliseconds.
    pub production_cooldown_ms: u32,

    /// Ranged units engage at their full attack range.
    #[serde(default)]
    pub ranged: bool,

    /// Extra damage added to the unit's first attack only.
    #[serde(default)]
    pub first_strike_bonus: u32,

    /// Pitch handed to sound hooks, in percent of the base pitch.
    #[serde(default = "default_pitch")]
    pub sound_pitch_percent: u32,
}

/// Default sound pitch (unmodified).
const fn default_pitch() -> u32 {
    100
}

impl UnitDefinition {
    /// Milliseconds between attacks: `1000 / max(0.1, attacks per second)`,
    /// rounded up to the next whole millisecond.
    #[must_use]
    pub fn attack_interval_ms(&self) -> u32 {
        let rate = self.attacks_per_minute.max(MIN_ATTACKS_PER_MINUTE);
        60_000_u32.div_ceil(rate)
    }

    /// Fallback window before an unconfirmed hit lands on its own.
    #[must_use]
    pub fn hit_fallback_ms(&self) -> u32 {
        scale_percent_round(self.attack_interval_ms(), HIT_FALLBACK_PERCENT)
            .clamp(HIT_FALLBACK_MIN_MS, HIT_FALLBACK_MAX_MS)
    }

    /// Derive the per-instance combat profile.
    #[must_use]
    pub fn combat_profile(&self) -> CombatProfile {
        CombatProfile {
            max_hp: self.hp,
            attack_power: self.attack_power,
            attack_range: Fixed::from_num(self.attack_range),
            move_speed: Fixed::from_num(self.move_speed),
            attack_interval_ms: self.attack_interval_ms(),
            hit_fallback_ms: self.hit_fallback_ms(),
            ranged: self.ranged,
            first_strike_bonus: self.first_strike_bonus,
            sound_pitch_percent: self.sound_pitch_percent,
        }
    }

    /// Validate a single definition, returning human-readable problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.trim().is_empty() {
            errors.push("Unit with empty id".to_string());
        }
        if self.hp == 0 {
            errors.push(format!("Unit '{}' has zero hp", self.id));
        }
        if self.attacks_per_minute == 0 {
            errors.push(format!("Unit '{}' never attacks", self.id));
        }
        if self.move_speed == 0 {
            errors.push(format!("Unit '{}' cannot move", self.id));
        }
        if self.ranged && self.attack_range == 0 {
            errors.push(format!("Ranged unit '{}' has zero range", self.id));
        }
        errors
    }
}

/// Numeric combat stats copied into every spawned unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatProfile {
    /// Maximum health points.
    pub max_hp: u32,
    /// Base damage per attack.
    pub attack_power: u32,
    /// Attack range.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
    /// Movement speed per second.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// Milliseconds between attacks.
    pub attack_interval_ms: u32,
    /// Pending-hit fallback window.
    pub hit_fallback_ms: u32,
    /// Whether the unit engages at full range.
    pub ranged: bool,
    /// One-time bonus on the first attack.
    pub first_strike_bonus: u32,
    /// Sound pitch in percent.
    pub sound_pitch_percent: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_unit(attacks_per_minute: u32) -> UnitDefinition {
        UnitDefinition {
            id: "test_unit".to_string(),
            name: "Test Unit".to_string(),
            cost: 20,
            hp: 100,
            attack_power: 15,
            attack_range: 20,
            move_speed: 120,
            attacks_per_minute,
            production_cooldown_ms: 900,
            ranged: false,
            first_strike_bonus: 0,
            sound_pitch_percent: 100,
        }
    }

    #[test]
    fn test_attack_interval_from_rate() {
        assert_eq!(create_test_unit(60).attack_interval_ms(), 1000);
        // 1.15 attacks per second
        assert_eq!(create_test_unit(69).attack_interval_ms(), 870);
        // Clamped to 0.1 attacks per second
        assert_eq!(create_test_unit(1).attack_interval_ms(), 10_000);
    }

    #[test]
    fn test_hit_fallback_window_is_clamped() {
        assert_eq!(create_test_unit(60).hit_fallback_ms(), 400);
        // Fast attacker: 40% of 500ms is 200ms, inside the window
        assert_eq!(create_test_unit(120).hit_fallback_ms(), 200);
        // Very fast attacker hits the floor
        assert_eq!(create_test_unit(600).hit_fallback_ms(), 160);
        // Slow attacker hits the ceiling
        assert_eq!(create_test_unit(27).hit_fallback_ms(), 420);
    }

    #[test]
    fn test_validate_flags_bad_definitions() {
        assert!(create_test_unit(60).validate().is_empty());

        let mut broken = create_test_unit(0);
        broken.hp = 0;
        broken.ranged = true;
        broken.attack_range = 0;
        assert_eq!(broken.validate().len(), 3);
    }

    #[test]
    fn test_ron_defaults() {
        let ron = r#"UnitDefinition(
            id: "recruit",
            name: "Recruit",
            cost: 20,
            hp: 100,
            attack_power: 15,
            attack_range: 20,
            move_speed: 120,
            attacks_per_minute: 69,
            production_cooldown_ms: 900,
        )"#;
        let def: UnitDefinition = ron::from_str(ron).expect("valid unit ron");
        assert!(!def.ranged);
        assert_eq!(def.first_strike_bonus, 0);
        assert_eq!(def.sound_pitch_percent, 100);
    }
}
