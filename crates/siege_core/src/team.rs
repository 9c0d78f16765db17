//! Team identifiers.

use serde::{Deserialize, Serialize};

/// The two sides of the lane.
///
/// `Left` is the player's side; `Right` is the autonomous enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Player side, advancing toward +x.
    Left,
    /// Enemy side, advancing toward -x.
    Right,
}

impl Team {
    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Direction of travel along the lane (+1 or -1).
    #[must_use]
    pub const fn direction(self) -> i32 {
        match self {
            Self::Left => 1,
            Self::Right => -1,
        }
    }

    /// Whether this side is controlled by the player.
    #[must_use]
    pub const fn is_player(self) -> bool {
        matches!(self, Self::Left)
    }

    /// Short lowercase name, as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}
