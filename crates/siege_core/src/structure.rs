//! Team bases.

use serde::{Deserialize, Serialize};

use crate::config::BaseSpan;
use crate::math::Fixed;
use crate::team::Team;

/// A static structure that units besiege.
///
/// Health only ever decreases; reaching zero ends the match in favour of
/// the opposing team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Base {
    team: Team,
    hp: u32,
    max_hp: u32,
    span: BaseSpan,
}

impl Base {
    /// Create a base at full health.
    #[must_use]
    pub const fn new(team: Team, max_hp: u32, span: BaseSpan) -> Self {
        Self {
            team,
            hp: max_hp,
            max_hp,
            span,
        }
    }

    /// Apply damage, clamped at zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.hp);
        self.hp -= taken;
        taken
    }

    /// Whether the base has fallen.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.hp == 0
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Current health.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Starting health.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Lane coordinate of the left edge.
    #[must_use]
    pub fn left_edge(&self) -> Fixed {
        Fixed::from_num(self.span.left_edge)
    }

    /// Lane coordinate of the right edge.
    #[must_use]
    pub fn right_edge(&self) -> Fixed {
        Fixed::from_num(self.span.right_edge)
    }

    /// Signed distance from `x` to the facing edge, positive while the
    /// attacker has not reached it yet.
    #[must_use]
    pub fn distance_from(&self, attacker: Team, x: Fixed) -> Fixed {
        match attacker {
            Team::Left => self.left_edge() - x,
            Team::Right => x - self.right_edge(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_base() -> Base {
        Base::new(
            Team::Right,
            500,
            BaseSpan {
                left_edge: 1040,
                right_edge: 1240,
            },
        )
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut base = enemy_base();
        for _ in 0..3 {
            assert_eq!(base.take_damage(50), 50);
        }
        assert_eq!(base.hp(), 350);
        assert_eq!(base.take_damage(400), 350);
        assert_eq!(base.hp(), 0);
        assert!(base.is_destroyed());
        assert_eq!(base.take_damage(10), 0);
    }

    #[test]
    fn test_distance_from_each_side() {
        let base = enemy_base();
        assert_eq!(
            base.distance_from(Team::Left, Fixed::from_num(1000)),
            Fixed::from_num(40)
        );
        let own = Base::new(
            Team::Left,
            500,
            BaseSpan {
                left_edge: 40,
                right_edge: 240,
            },
        );
        assert_eq!(
            own.distance_from(Team::Right, Fixed::from_num(300)),
            Fixed::from_num(60)
        );
    }
}
