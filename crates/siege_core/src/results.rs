//! Match outcome and reward tiers.

use serde::{Deserialize, Serialize};

use crate::config::RewardTier;

/// Why the match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// One of the bases reached zero health.
    BaseDestroyed,
    /// The time limit passed with both bases standing.
    TimeExpired,
}

/// The single result emitted when a match ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether the player (left team) won.
    pub victory: bool,
    /// How the match ended.
    pub reason: EndReason,
    /// Elapsed match time in whole seconds, rounded down.
    pub elapsed_secs: u32,
    /// Star rating, 0 to 3.
    pub stars: u8,
    /// Gold awarded.
    pub gold_reward: u32,
    /// Diamonds awarded.
    pub diamond_reward: u32,
}

impl MatchResult {
    /// Grade a finished match against the reward tiers.
    ///
    /// A victory slower than every tier earns nothing and counts as a
    /// defeat, matching the time-limit rule.
    #[must_use]
    pub fn grade(victory: bool, reason: EndReason, elapsed_secs: u32, tiers: &[RewardTier]) -> Self {
        let tier = if victory {
            tiers.iter().find(|tier| elapsed_secs < tier.under_secs)
        } else {
            None
        };

        match tier {
            Some(tier) => Self {
                victory: true,
                reason,
                elapsed_secs,
                stars: tier.stars,
                gold_reward: tier.gold,
                diamond_reward: tier.diamonds,
            },
            None => Self {
                victory: false,
                reason,
                elapsed_secs,
                stars: 0,
                gold_reward: 0,
                diamond_reward: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;

    fn grade(victory: bool, secs: u32) -> MatchResult {
        let reason = if victory {
            EndReason::BaseDestroyed
        } else {
            EndReason::TimeExpired
        };
        MatchResult::grade(victory, reason, secs, &MatchConfig::default().reward_tiers)
    }

    #[test]
    fn test_victory_tiers() {
        let fast = grade(true, 59);
        assert_eq!((fast.stars, fast.gold_reward, fast.diamond_reward), (3, 1000, 50));

        let medium = grade(true, 60);
        assert_eq!((medium.stars, medium.gold_reward, medium.diamond_reward), (2, 500, 20));

        let slow = grade(true, 179);
        assert_eq!((slow.stars, slow.gold_reward, slow.diamond_reward), (1, 200, 5));
    }

    #[test]
    fn test_too_slow_is_defeat() {
        let result = grade(true, 180);
        assert!(!result.victory);
        assert_eq!(result.stars, 0);
        assert_eq!(result.gold_reward, 0);
    }

    #[test]
    fn test_defeat_earns_nothing() {
        let result = grade(false, 10);
        assert!(!result.victory);
        assert_eq!((result.stars, result.gold_reward, result.diamond_reward), (0, 0, 0));
    }
}
