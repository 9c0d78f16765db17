//! Gold economy.
//!
//! Gold regenerates continuously up to a cap. An upgrade ladder trades
//! gold for a faster rate and a higher cap. The amount is fixed-point so
//! partial gold from short frames accumulates exactly.

use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::math::{fixed_serde, per_second, scale_percent_round, Fixed};

/// Regenerating, capped gold plus the upgrade ladder.
///
/// Invariants: `0 <= amount <= cap` and `level <= max_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Economy {
    #[serde(with = "fixed_serde")]
    amount: Fixed,
    cap: u32,
    rate: u32,
    level: u32,
    max_level: u32,
    upgrade_cost: u32,
    rate_bonus: u32,
    cap_bonus: u32,
    cost_growth_percent: u32,
    cost_step: u32,
    halted: bool,
}

impl Economy {
    /// Create an economy from its tuning.
    #[must_use]
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            amount: Fixed::from_num(config.start_amount.min(config.start_cap)),
            cap: config.start_cap,
            rate: config.start_rate,
            level: 0,
            max_level: config.max_level,
            upgrade_cost: config.first_upgrade_cost,
            rate_bonus: config.rate_bonus,
            cap_bonus: config.cap_bonus,
            cost_growth_percent: config.cost_growth_percent,
            cost_step: config.cost_step,
            halted: false,
        }
    }

    /// Regenerate gold for `delta_ms`. No-op once halted.
    pub fn tick(&mut self, delta_ms: u32) {
        if self.halted {
            return;
        }
        let cap = Fixed::from_num(self.cap);
        if self.amount >= cap {
            return;
        }
        let gained = per_second(Fixed::from_num(self.rate), delta_ms);
        self.amount = self.amount.saturating_add(gained).min(cap);
    }

    /// Deduct `cost` if the full amount is available.
    pub fn try_spend(&mut self, cost: u32) -> bool {
        let cost = Fixed::from_num(cost);
        if self.amount < cost {
            return false;
        }
        self.amount -= cost;
        true
    }

    /// Whether `cost` could be spent right now.
    #[must_use]
    pub fn can_afford(&self, cost: u32) -> bool {
        self.amount >= Fixed::from_num(cost)
    }

    /// Buy the next rung of the ladder.
    ///
    /// Fails without side effects at max level or when unaffordable.
    pub fn upgrade(&mut self) -> bool {
        if self.is_max_level() || !self.try_spend(self.upgrade_cost) {
            return false;
        }
        self.level += 1;
        self.rate += self.rate_bonus;
        self.cap += self.cap_bonus;
        self.upgrade_cost =
            scale_percent_round(self.upgrade_cost, self.cost_growth_percent) + self.cost_step;
        tracing::debug!(
            level = self.level,
            rate = self.rate,
            cap = self.cap,
            next_cost = self.upgrade_cost,
            "Economy upgraded"
        );
        true
    }

    /// Whether the next upgrade could be bought right now.
    #[must_use]
    pub fn can_upgrade(&self) -> bool {
        !self.is_max_level() && self.can_afford(self.upgrade_cost)
    }

    /// Stop regeneration for the rest of the match.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Current gold.
    #[must_use]
    pub const fn amount(&self) -> Fixed {
        self.amount
    }

    /// Current gold rounded down, as shown to the player.
    #[must_use]
    pub fn whole_amount(&self) -> u32 {
        self.amount.floor().to_num::<u32>()
    }

    /// Current cap.
    #[must_use]
    pub const fn cap(&self) -> u32 {
        self.cap
    }

    /// Current regeneration per second.
    #[must_use]
    pub const fn rate(&self) -> u32 {
        self.rate
    }

    /// Upgrades bought so far.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Ladder length.
    #[must_use]
    pub const fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Whether the ladder is exhausted.
    #[must_use]
    pub const fn is_max_level(&self) -> bool {
        self.level >= self.max_level
    }

    /// Price of the next upgrade.
    #[must_use]
    pub const fn upgrade_cost(&self) -> u32 {
        self.upgrade_cost
    }

    /// Whether regeneration has stopped.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }
}

impl Default for Economy {
    fn default() -> Self {
        Self::new(&EconomyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regenerates_and_spends() {
        let mut economy = Economy::default();
        for _ in 0..20 {
            economy.tick(100);
        }
        assert_eq!(economy.amount(), Fixed::from_num(60));

        assert!(economy.try_spend(20));
        assert_eq!(economy.amount(), Fixed::from_num(40));

        assert!(!economy.try_spend(50));
        assert_eq!(economy.amount(), Fixed::from_num(40));
    }

    #[test]
    fn test_clamped_to_cap() {
        let mut economy = Economy::default();
        economy.tick(60_000);
        assert_eq!(economy.amount(), Fixed::from_num(100));
        economy.tick(16);
        assert_eq!(economy.amount(), Fixed::from_num(100));
    }

    #[test]
    fn test_halt_stops_regeneration() {
        let mut economy = Economy::default();
        economy.halt();
        economy.tick(5000);
        assert_eq!(economy.whole_amount(), 50);
        assert!(economy.is_halted());
    }

    #[test]
    fn test_upgrade_ladder() {
        let mut economy = Economy::default();
        assert!(!economy.upgrade(), "50 gold cannot buy a 100 gold upgrade");
        assert_eq!(economy.level(), 0);

        economy.tick(10_000);
        assert!(economy.upgrade());
        assert_eq!(economy.level(), 1);
        assert_eq!(economy.rate(), 7);
        assert_eq!(economy.cap(), 150);
        assert_eq!(economy.upgrade_cost(), 160);
        assert_eq!(economy.whole_amount(), 0);
    }

    #[test]
    fn test_upgrade_cost_strictly_increases_until_max() {
        let mut economy = Economy::new(&EconomyConfig {
            start_amount: 1_000_000,
            start_cap: 1_000_000,
            ..EconomyConfig::default()
        });
        let mut last_cost = economy.upgrade_cost();
        for _ in 0..economy.max_level() {
            assert!(economy.upgrade());
            assert!(economy.upgrade_cost() > last_cost);
            last_cost = economy.upgrade_cost();
        }
        let before = economy.amount();
        assert!(!economy.upgrade());
        assert_eq!(economy.amount(), before);
        assert_eq!(economy.level(), economy.max_level());
    }

    #[test]
    fn test_cap_limits_the_default_ladder() {
        let mut economy = Economy::default();
        let mut bought = 0;
        while {
            economy.tick(600_000);
            economy.upgrade()
        } {
            bought += 1;
        }
        // The second rung costs 160 but the cap only grows to 150.
        assert_eq!(bought, 1);
        assert_eq!(economy.cap(), 150);
        assert_eq!(economy.upgrade_cost(), 160);
    }
}
