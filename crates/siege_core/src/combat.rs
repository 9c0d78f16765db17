//! Per-team combat resolution.
//!
//! Each tick the controller runs one pass for the left team and then one
//! for the right. A pass walks the acting team's living units in
//! collection order and, for each, picks exactly one of:
//!
//! 1. **Engage a unit** - the nearest living enemy within engagement range.
//! 2. **Besiege the base** - the enemy base is within siege range.
//! 3. **Advance** - walk toward the enemy base, stopping at the siege line.
//!
//! Attacks never deal damage here. They queue a [`PendingHit`] with a
//! fallback timer; the controller lands it later.

use crate::config::CombatConfig;
use crate::data::CombatProfile;
use crate::hooks::HitTarget;
use crate::math::{per_second, Fixed};
use crate::rng::SimRng;
use crate::scheduler::{MatchTimer, Scheduler};
use crate::structure::Base;
use crate::team::Team;
use crate::unit::{PendingHit, StateTransition, Unit, UnitId, UnitState};

/// Something a team pass did that the controller should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatEvent {
    /// A unit changed state.
    StateChanged(StateTransition),
    /// A unit started a swing.
    AttackStarted {
        /// Attacking unit.
        attacker: UnitId,
        /// What it swung at.
        target: HitTarget,
        /// Damage that will land.
        damage: u32,
    },
}

/// Shared inputs of one team pass.
pub struct TeamPass<'a> {
    /// Match clock.
    pub now_ms: u64,
    /// Frame length.
    pub delta_ms: u32,
    /// Combat tuning.
    pub config: &'a CombatConfig,
    /// Per-kind levels for damage scaling; `None` for unscaled teams.
    pub levels: Option<&'a [u32]>,
    /// Stacking rolls.
    pub rng: &'a mut SimRng,
    /// Where hit fallbacks are queued.
    pub scheduler: &'a mut Scheduler<MatchTimer>,
}

/// Range at which a unit engages enemy units.
#[must_use]
pub fn engage_range(profile: &CombatProfile, config: &CombatConfig) -> Fixed {
    if profile.ranged {
        profile.attack_range
    } else {
        Fixed::from_num(config.melee_engage_range)
    }
}

/// Range at which a unit starts besieging the enemy base.
#[must_use]
pub fn siege_range(profile: &CombatProfile, config: &CombatConfig) -> Fixed {
    profile
        .attack_range
        .max(Fixed::from_num(config.siege_distance))
}

/// Where a unit stops in front of the enemy base.
#[must_use]
pub fn stop_x(team: Team, profile: &CombatProfile, enemy_base: &Base, config: &CombatConfig) -> Fixed {
    let standoff = if profile.ranged {
        siege_range(profile, config)
    } else {
        Fixed::from_num(config.siege_distance)
    };
    match team {
        Team::Left => enemy_base.left_edge() - standoff,
        Team::Right => enemy_base.right_edge() + standoff,
    }
}

/// Index of the nearest living enemy within `range` of `x`.
///
/// Ties go to the earlier unit in collection order.
#[must_use]
pub fn find_enemy_in_range(x: Fixed, enemies: &[Unit], range: Fixed) -> Option<usize> {
    let mut closest: Option<(usize, Fixed)> = None;
    for (index, enemy) in enemies.iter().enumerate() {
        if !enemy.is_alive() {
            continue;
        }
        let distance = (enemy.x() - x).abs();
        if distance > range {
            continue;
        }
        if closest.map_or(true, |(_, best)| distance < best) {
            closest = Some((index, distance));
        }
    }
    closest.map(|(index, _)| index)
}

/// Damage of one attack: `round(power * (1 + level * bonus%) + first_strike)`.
///
/// `level` is `None` for teams without persisted levels.
#[must_use]
pub fn compute_damage(
    attack_power: u32,
    level: Option<u32>,
    level_bonus_percent: u32,
    first_strike_bonus: u32,
) -> u32 {
    let multiplier = level.map_or(100, |level| {
        100 + u64::from(level) * u64::from(level_bonus_percent)
    });
    let hundredths = u64::from(attack_power) * multiplier + u64::from(first_strike_bonus) * 100;
    u32::try_from((hundredths + 50) / 100).unwrap_or(u32::MAX)
}

/// Lateral offset for unit `index` when it holds position at `target_x`.
///
/// Same-kind living allies crowding the spot spread out with a random
/// offset that the unit keeps until it walks again.
pub fn stack_offset(
    units: &[Unit],
    index: usize,
    target_x: Fixed,
    config: &CombatConfig,
    rng: &mut SimRng,
) -> i32 {
    let Some(unit) = units.get(index) else {
        return 0;
    };
    let band = Fixed::from_num(config.stack_band);
    let crowd = units
        .iter()
        .filter(|member| {
            member.kind() == unit.kind()
                && member.is_alive()
                && (member.x() - target_x).abs() < band
        })
        .count();

    if crowd <= 1 {
        return 0;
    }
    if unit.stack_offset() != 0 {
        return unit.stack_offset();
    }

    let max = i64::from(config.stack_offset_max);
    match rng.between(-max, max) {
        0 => config.stack_offset_fallback,
        roll => i32::try_from(roll).unwrap_or(config.stack_offset_fallback),
    }
}

/// Run one team's decisions for this tick.
pub fn run_team_pass(
    units: &mut [Unit],
    enemies: &[Unit],
    enemy_base: &Base,
    pass: &mut TeamPass<'_>,
) -> Vec<CombatEvent> {
    let mut events = Vec::new();

    for index in 0..units.len() {
        if !units[index].is_alive() {
            continue;
        }

        let profile = *units[index].profile();
        let team = units[index].team();
        let x = units[index].x();

        let engaged = find_enemy_in_range(x, enemies, engage_range(&profile, pass.config))
            .map(|enemy| (HitTarget::Unit(enemies[enemy].id()), enemies[enemy].x()))
            .or_else(|| {
                (enemy_base.distance_from(team, x) <= siege_range(&profile, pass.config)).then(
                    || {
                        (
                            HitTarget::Base(enemy_base.team()),
                            stop_x(team, &profile, enemy_base, pass.config),
                        )
                    },
                )
            });

        match engaged {
            Some((target, hold_x)) => {
                let offset = stack_offset(units, index, hold_x, pass.config, pass.rng);
                let unit = &mut units[index];
                unit.set_stack_offset(offset);
                if let Some(change) = unit.set_state(UnitState::Idle) {
                    events.push(CombatEvent::StateChanged(change));
                }
                if unit.can_attack(pass.now_ms) {
                    events.extend(start_attack(unit, target, pass));
                }
            }
            None => {
                let stop = stop_x(team, &profile, enemy_base, pass.config);
                let step = per_second(profile.move_speed, pass.delta_ms);
                let next = match team {
                    Team::Left => (x + step).min(stop),
                    Team::Right => (x - step).max(stop),
                };
                let unit = &mut units[index];
                unit.set_x(next);
                unit.set_stack_offset(0);
                if let Some(change) = unit.set_state(UnitState::Walk) {
                    events.push(CombatEvent::StateChanged(change));
                }
            }
        }

        units[index].decay_dash(pass.delta_ms);
    }

    events
}

/// Swing at `target`: stamp the cooldown, compute damage and queue the hit.
fn start_attack(unit: &mut Unit, target: HitTarget, pass: &mut TeamPass<'_>) -> Vec<CombatEvent> {
    let mut events = Vec::with_capacity(2);

    let level = pass.levels.map(|levels| {
        levels
            .get(unit.kind().index())
            .copied()
            .unwrap_or(pass.config.default_unit_level)
    });
    let first_strike = unit.consume_first_strike();
    let damage = compute_damage(
        unit.profile().attack_power,
        level,
        pass.config.level_bonus_percent,
        first_strike,
    );

    if let Some(change) = unit.record_attack(pass.now_ms, pass.config.attack_dash_ms) {
        events.push(CombatEvent::StateChanged(change));
    }

    let due = pass.now_ms + u64::from(unit.profile().hit_fallback_ms);
    let timer = pass.scheduler.schedule(due, MatchTimer::HitFallback(unit.id()));
    if let Some(replaced) = unit.queue_hit(PendingHit {
        target,
        damage,
        timer,
    }) {
        pass.scheduler.cancel(replaced.timer);
    }

    tracing::debug!(
        unit = unit.id().0,
        team = unit.team().as_str(),
        ?target,
        damage,
        due,
        "Attack started"
    );
    events.push(CombatEvent::AttackStarted {
        attacker: unit.id(),
        target,
        damage,
    });
    events
}
