//! Presentation and animation seams.
//!
//! The simulation never draws or plays anything. It reports what happened
//! through [`PresentationHooks`] and moves sprites through the narrow
//! [`UnitVisual`] capability. Both are optional; [`NullHooks`] is the
//! headless default.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::results::MatchResult;
use crate::team::Team;
use crate::unit::{StateTransition, Unit, UnitId};

/// Animation event names that count as the moment of impact.
pub const HIT_EVENT_NAMES: [&str; 7] = ["hit", "damage", "attack", "impact", "slash", "shoot", "fire"];

/// Tint applied to dying units.
pub const DYING_TINT: u32 = 0x6b_72_80;

/// Default drawn size of a unit.
pub const UNIT_VISUAL_SIZE: (u32, u32) = (24, 32);

/// Whether an animation event name marks a hit (case-insensitive).
#[must_use]
pub fn is_hit_event(name: &str) -> bool {
    HIT_EVENT_NAMES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// What a pending hit lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitTarget {
    /// An enemy unit.
    Unit(UnitId),
    /// The base owned by the given team.
    Base(Team),
}

/// Damage that just landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageContext {
    /// Unit that dealt the blow.
    pub attacker: UnitId,
    /// What was hit.
    pub target: HitTarget,
    /// Health actually removed.
    pub damage: u32,
    /// Sound pitch of the attacker, in percent.
    pub pitch_percent: u32,
}

/// Sprite handle owned by the controller for one unit.
pub trait UnitVisual {
    /// Move the sprite.
    fn set_position(&mut self, x: Fixed, y: Fixed);
    /// Resize the sprite.
    fn set_size(&mut self, width: u32, height: u32);
    /// Tint the sprite, or clear the tint with `None`.
    fn set_tint(&mut self, tint: Option<u32>);
    /// Show or hide the sprite.
    fn set_visible(&mut self, visible: bool);
}

/// Fire-and-forget notifications from the simulation.
///
/// Every method has a no-op default.
pub trait PresentationHooks {
    /// Create a sprite for a freshly spawned unit.
    fn attach_visual(&mut self, _unit: &Unit) -> Option<Box<dyn UnitVisual + Send>> {
        None
    }

    /// A unit entered the field.
    fn on_unit_spawned(&mut self, _unit: &Unit) {}

    /// A unit changed state.
    fn on_unit_state_changed(&mut self, _change: &StateTransition) {}

    /// A unit started a swing; `damage` lands when the hit resolves.
    fn on_attack_started(&mut self, _attacker: UnitId, _target: HitTarget, _damage: u32) {}

    /// A hit landed on a unit or base.
    fn on_damage_applied(&mut self, _context: &DamageContext) {}

    /// A base lost health.
    fn on_base_damaged(&mut self, _team: Team, _damage: u32, _remaining: u32) {}

    /// The match is over.
    fn on_match_ended(&mut self, _result: &MatchResult) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl PresentationHooks for NullHooks {}
