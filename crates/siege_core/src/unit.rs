//! Combatants and their attack state machine.
//!
//! A unit is spawned from a [`UnitDefinition`](crate::data::UnitDefinition),
//! walks toward the enemy base, and attacks whatever it meets. Attacks are
//! two-phase: [`Unit::record_attack`] starts the swing, and the damage lands
//! later when the queued [`PendingHit`] resolves (animation event or
//! fallback timer, whichever comes first).

use serde::{Deserialize, Serialize};

use crate::data::{CombatProfile, UnitKind};
use crate::hooks::HitTarget;
use crate::math::{Fixed, LanePoint};
use crate::scheduler::EventHandle;
use crate::team::Team;

/// Unique identifier of a unit within one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Animation/attack state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Standing still, usually engaged and waiting for the cooldown.
    Idle,
    /// Advancing along the lane.
    Walk,
    /// Mid-swing.
    Attack,
    /// Health reached zero; removed once the death transition finishes.
    Dying,
}

impl UnitState {
    /// Lowercase name, as used in logs and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Attack => "attack",
            Self::Dying => "dying",
        }
    }
}

/// A state change reported to presentation hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// Unit that changed.
    pub unit: UnitId,
    /// Previous state.
    pub from: UnitState,
    /// New state.
    pub to: UnitState,
}

/// Damage waiting for its hit moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingHit {
    /// What the damage lands on.
    pub target: HitTarget,
    /// Damage computed when the attack started.
    pub damage: u32,
    /// Fallback timer that lands the hit if no animation event arrives.
    pub timer: EventHandle,
}

/// Result of [`Unit::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Health actually removed.
    pub taken: u32,
    /// Set when this hit killed the unit.
    pub death: Option<StateTransition>,
    /// The unit's own pending hit, dropped because it died. The caller must
    /// cancel its timer.
    pub cancelled_hit: Option<PendingHit>,
}

/// A single combatant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    team: Team,
    kind: UnitKind,
    profile: CombatProfile,
    position: LanePoint,
    stack_offset: i32,
    hp: u32,
    state: UnitState,
    last_attack_ms: Option<u64>,
    pending_hit: Option<PendingHit>,
    dash_remaining_ms: u32,
    dash_duration_ms: u32,
    first_strike_used: bool,
    died_at_ms: Option<u64>,
}

impl Unit {
    /// Create a unit at full health, idle at `position`.
    #[must_use]
    pub fn new(
        id: UnitId,
        team: Team,
        kind: UnitKind,
        profile: CombatProfile,
        position: LanePoint,
    ) -> Self {
        Self {
            id,
            team,
            kind,
            profile,
            position,
            stack_offset: 0,
            hp: profile.max_hp,
            state: UnitState::Idle,
            last_attack_ms: None,
            pending_hit: None,
            dash_remaining_ms: 0,
            dash_duration_ms: 0,
            first_strike_used: false,
            died_at_ms: None,
        }
    }

    /// Health above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether the attack cooldown has elapsed at `now_ms`.
    ///
    /// A unit that has never attacked may attack immediately.
    #[must_use]
    pub fn can_attack(&self, now_ms: u64) -> bool {
        self.last_attack_ms.map_or(true, |last| {
            now_ms.saturating_sub(last) >= u64::from(self.profile.attack_interval_ms)
        })
    }

    /// Request a state change.
    ///
    /// `Idle`/`Walk` are ignored while an attack lunge is still in flight.
    /// Entering `Attack` always restarts the lunge. Returns the transition
    /// when the state actually changed.
    pub fn set_state(&mut self, state: UnitState) -> Option<StateTransition> {
        if self.state == UnitState::Dying {
            return None;
        }
        if self.state == UnitState::Attack
            && self.dash_remaining_ms > 0
            && matches!(state, UnitState::Idle | UnitState::Walk)
        {
            return None;
        }
        if state == UnitState::Attack {
            self.dash_remaining_ms = self.dash_duration_ms;
        }
        if self.state == state {
            return None;
        }
        let from = self.state;
        self.state = state;
        Some(StateTransition {
            unit: self.id,
            from,
            to: state,
        })
    }

    /// Start a swing: stamp the cooldown and enter `Attack`.
    pub fn record_attack(&mut self, now_ms: u64, dash_ms: u32) -> Option<StateTransition> {
        self.last_attack_ms = Some(now_ms);
        self.dash_duration_ms = dash_ms;
        self.set_state(UnitState::Attack)
    }

    /// Queue a hit, returning the one it replaces.
    pub fn queue_hit(&mut self, hit: PendingHit) -> Option<PendingHit> {
        self.pending_hit.replace(hit)
    }

    /// Remove and return the pending hit.
    pub fn take_pending_hit(&mut self) -> Option<PendingHit> {
        self.pending_hit.take()
    }

    /// The pending hit, if any.
    #[must_use]
    pub const fn pending_hit(&self) -> Option<&PendingHit> {
        self.pending_hit.as_ref()
    }

    /// Subtract health, clamped at zero. At zero the unit starts dying and
    /// drops its own pending hit.
    pub fn take_damage(&mut self, amount: u32, now_ms: u64) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome {
                taken: 0,
                death: None,
                cancelled_hit: None,
            };
        }
        let taken = amount.min(self.hp);
        self.hp -= taken;

        if self.hp > 0 {
            return DamageOutcome {
                taken,
                death: None,
                cancelled_hit: None,
            };
        }

        let cancelled_hit = self.pending_hit.take();
        let from = self.state;
        self.state = UnitState::Dying;
        self.dash_remaining_ms = 0;
        self.died_at_ms = Some(now_ms);
        DamageOutcome {
            taken,
            death: Some(StateTransition {
                unit: self.id,
                from,
                to: UnitState::Dying,
            }),
            cancelled_hit,
        }
    }

    /// Extra damage for the first attack; zero afterwards.
    pub fn consume_first_strike(&mut self) -> u32 {
        if self.first_strike_used || self.profile.first_strike_bonus == 0 {
            return 0;
        }
        self.first_strike_used = true;
        self.profile.first_strike_bonus
    }

    /// Run down the attack lunge.
    pub fn decay_dash(&mut self, delta_ms: u32) {
        self.dash_remaining_ms = self.dash_remaining_ms.saturating_sub(delta_ms);
    }

    /// Whether the death transition has finished at `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64, death_duration_ms: u32) -> bool {
        self.died_at_ms
            .is_some_and(|died| now_ms.saturating_sub(died) >= u64::from(death_duration_ms))
    }

    /// Move along the lane.
    pub fn set_x(&mut self, x: Fixed) {
        self.position.x = x;
    }

    /// Set the lateral stacking offset.
    pub fn set_stack_offset(&mut self, offset: i32) {
        self.stack_offset = offset;
    }

    /// Forward lunge distance for drawing, scaled by the remaining dash.
    #[must_use]
    pub fn dash_offset(&self, peak: u32) -> Fixed {
        if self.dash_remaining_ms == 0 || self.dash_duration_ms == 0 {
            return Fixed::ZERO;
        }
        let magnitude = Fixed::from_num(peak) * Fixed::from_num(self.dash_remaining_ms)
            / Fixed::from_num(self.dash_duration_ms);
        magnitude * Fixed::from_num(self.team.direction())
    }

    /// Where the unit should be drawn: lane position plus lunge and stacking.
    #[must_use]
    pub fn draw_position(&self, dash_peak: u32) -> LanePoint {
        LanePoint::new(
            self.position.x + self.dash_offset(dash_peak),
            self.position.y + Fixed::from_num(self.stack_offset),
        )
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Roster slot this unit was spawned from.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Combat stats.
    #[must_use]
    pub const fn profile(&self) -> &CombatProfile {
        &self.profile
    }

    /// Lane position (without stacking or lunge).
    #[must_use]
    pub const fn position(&self) -> LanePoint {
        self.position
    }

    /// Lane coordinate.
    #[must_use]
    pub const fn x(&self) -> Fixed {
        self.position.x
    }

    /// Lateral stacking offset.
    #[must_use]
    pub const fn stack_offset(&self) -> i32 {
        self.stack_offset
    }

    /// Current health.
    #[must_use]
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Time of the last attack.
    #[must_use]
    pub const fn last_attack_ms(&self) -> Option<u64> {
        self.last_attack_ms
    }

    /// Milliseconds of lunge left.
    #[must_use]
    pub const fn dash_remaining_ms(&self) -> u32 {
        self.dash_remaining_ms
    }

    /// Whether the first-strike bonus has been spent.
    #[must_use]
    pub const fn first_strike_used(&self) -> bool {
        self.first_strike_used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitRoster;

    fn recruit() -> Unit {
        let roster = UnitRoster::standard();
        let kind = roster.kind_of("recruit").expect("recruit exists");
        let profile = roster.get(kind).expect("recruit exists").combat_profile();
        Unit::new(
            UnitId(1),
            Team::Left,
            kind,
            profile,
            LanePoint::new(Fixed::from_num(260), Fixed::from_num(360)),
        )
    }

    fn hit(timer: u64) -> PendingHit {
        PendingHit {
            target: HitTarget::Base(Team::Right),
            damage: 10,
            timer: EventHandle(timer),
        }
    }

    #[test]
    fn test_first_attack_allowed_then_cooldown() {
        let mut unit = recruit();
        assert!(unit.can_attack(0));
        unit.record_attack(1000, 100);
        assert!(!unit.can_attack(1869));
        assert!(unit.can_attack(1870));
    }

    #[test]
    fn test_dash_suppresses_idle_and_walk() {
        let mut unit = recruit();
        let change = unit.record_attack(0, 100).expect("idle -> attack");
        assert_eq!(change.to, UnitState::Attack);

        assert!(unit.set_state(UnitState::Idle).is_none());
        assert!(unit.set_state(UnitState::Walk).is_none());
        assert_eq!(unit.state(), UnitState::Attack);

        unit.decay_dash(60);
        assert!(unit.set_state(UnitState::Idle).is_none());
        unit.decay_dash(40);
        let change = unit.set_state(UnitState::Idle).expect("dash finished");
        assert_eq!(change.from, UnitState::Attack);
    }

    #[test]
    fn test_lethal_damage_starts_dying_and_drops_pending_hit() {
        let mut unit = recruit();
        unit.queue_hit(hit(4));

        let outcome = unit.take_damage(60, 500);
        assert_eq!(outcome.taken, 60);
        assert!(outcome.death.is_none());
        assert_eq!(unit.hp(), 40);

        let outcome = unit.take_damage(90, 600);
        assert_eq!(outcome.taken, 40);
        assert_eq!(unit.hp(), 0);
        assert_eq!(unit.state(), UnitState::Dying);
        assert_eq!(outcome.cancelled_hit.map(|h| h.timer), Some(EventHandle(4)));
        assert!(unit.pending_hit().is_none());

        let again = unit.take_damage(10, 700);
        assert_eq!(again.taken, 0);
        assert!(again.death.is_none());
    }

    #[test]
    fn test_dying_ignores_state_requests_and_expires() {
        let mut unit = recruit();
        unit.take_damage(1000, 2000);
        assert!(unit.set_state(UnitState::Walk).is_none());
        assert!(unit.set_state(UnitState::Attack).is_none());
        assert!(!unit.is_expired(3499, 1500));
        assert!(unit.is_expired(3500, 1500));
    }

    #[test]
    fn test_new_hit_replaces_old() {
        let mut unit = recruit();
        assert!(unit.queue_hit(hit(1)).is_none());
        assert_eq!(unit.queue_hit(hit(2)).map(|h| h.timer), Some(EventHandle(1)));
        assert_eq!(unit.take_pending_hit().map(|h| h.timer), Some(EventHandle(2)));
        assert!(unit.take_pending_hit().is_none());
    }

    #[test]
    fn test_first_strike_only_for_units_that_carry_it() {
        let mut unit = recruit();
        assert_eq!(unit.consume_first_strike(), 0);

        let roster = UnitRoster::standard();
        let kind = roster.kind_of("cavalry").expect("cavalry exists");
        let profile = roster.get(kind).expect("cavalry exists").combat_profile();
        let mut cavalry = Unit::new(UnitId(2), Team::Right, kind, profile, LanePoint::default());
        assert_eq!(cavalry.consume_first_strike(), 20);
        assert_eq!(cavalry.consume_first_strike(), 0);
        assert!(cavalry.first_strike_used());
    }

    #[test]
    fn test_draw_position_includes_lunge_and_stack() {
        let mut unit = recruit();
        unit.set_stack_offset(-7);
        unit.record_attack(0, 100);
        let drawn = unit.draw_position(5);
        assert_eq!(drawn.x, Fixed::from_num(265));
        assert_eq!(drawn.y, Fixed::from_num(353));

        unit.decay_dash(50);
        assert_eq!(unit.dash_offset(5), Fixed::from_num(2.5));
    }
}
