//! The match controller.
//!
//! [`Match`] owns both teams' units, both bases, the economy and every
//! scheduled event, and advances them in a fixed order each frame.
//!
//! # Tick Order
//!
//! 1. **Clock** - advance elapsed time; at the time limit the match ends
//!    as a defeat before anything else happens
//! 2. **Economy** - regenerate gold
//! 3. **Timers** - land due pending-hit fallbacks, spawn due enemies
//! 4. **Left pass** - player units decide and act
//! 5. **Right pass** - enemy units decide and act
//! 6. **Purge** - remove units whose death transition finished
//! 7. **Visuals** - push positions to attached sprites
//!
//! Everything that can be serialized lives in [`BattleState`]; hooks,
//! sprites and the stats store stay on the [`Match`].

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{run_team_pass, CombatEvent, TeamPass};
use crate::config::MatchConfig;
use crate::data::{UnitKind, UnitRoster};
use crate::economy::Economy;
use crate::error::{GameError, Result};
use crate::hooks::{
    is_hit_event, DamageContext, HitTarget, NullHooks, PresentationHooks, UnitVisual, DYING_TINT,
    UNIT_VISUAL_SIZE,
};
use crate::math::{Fixed, LanePoint, MS_PER_SECOND};
use crate::results::{EndReason, MatchResult};
use crate::rng::SimRng;
use crate::scheduler::{EventHandle, MatchTimer, Scheduler};
use crate::snapshot::MirrorSnapshot;
use crate::stats::{
    PlayerStats, StatsStore, DIAMONDS_PER_EXCHANGE, GOLD_PER_EXCHANGE, UNLOCK_COST_DIAMONDS,
};
use crate::structure::Base;
use crate::team::Team;
use crate::unit::{PendingHit, Unit, UnitId, UnitState};

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Units fight and the economy runs.
    Running,
    /// A result has been produced; nothing advances any more.
    Ended,
}

/// Why a spawn request was declined. Declined requests change nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnRejection {
    /// The match is over.
    #[error("The match has ended")]
    MatchEnded,
    /// No such unit in the roster.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
    /// The player has not unlocked this unit.
    #[error("Unit '{0}' is locked")]
    Locked(String),
    /// The unit's production slot is cooling down.
    #[error("Production cooling down for another {remaining_ms}ms")]
    OnCooldown {
        /// Time until the slot is ready.
        remaining_ms: u64,
    },
    /// Not enough gold.
    #[error("Needs {cost} gold, {available} available")]
    Unaffordable {
        /// Unit cost.
        cost: u32,
        /// Whole gold on hand.
        available: u32,
    },
}

/// Why an economy upgrade was declined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeRejection {
    /// The match is over.
    #[error("The match has ended")]
    MatchEnded,
    /// The ladder is exhausted.
    #[error("Economy is already at max level")]
    MaxLevel,
    /// Not enough gold.
    #[error("Upgrade needs {cost} gold, {available} available")]
    Unaffordable {
        /// Upgrade cost.
        cost: u32,
        /// Whole gold on hand.
        available: u32,
    },
}

/// Why a profile purchase was declined. Declined purchases change nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseRejection {
    /// No such unit in the roster.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
    /// Fewer diamonds offered than one exchange needs.
    #[error("Exchanges take at least {} diamonds", DIAMONDS_PER_EXCHANGE)]
    BelowOneExchange,
    /// Not enough profile gold.
    #[error("Needs {cost} gold, {available} available")]
    NotEnoughGold {
        /// Price.
        cost: u64,
        /// Gold held.
        available: u64,
    },
    /// Not enough diamonds.
    #[error("Needs {cost} diamonds, {available} available")]
    NotEnoughDiamonds {
        /// Price.
        cost: u64,
        /// Diamonds held.
        available: u64,
    },
}

/// All deterministic match state.
///
/// Two states built from the same config, roster and stats and fed the
/// same inputs hash identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    config: MatchConfig,
    roster: UnitRoster,
    tick: u64,
    now_ms: u64,
    elapsed_ms: u64,
    phase: MatchPhase,
    left_units: Vec<Unit>,
    right_units: Vec<Unit>,
    left_base: Base,
    right_base: Base,
    economy: Economy,
    scheduler: Scheduler<MatchTimer>,
    rng: SimRng,
    next_unit_id: u64,
    slot_ready_at: Vec<u64>,
    player_levels: Vec<u32>,
    result: Option<MatchResult>,
}

impl BattleState {
    /// Fresh state at time zero. The first enemy spawn is already scheduled.
    #[must_use]
    pub fn new(config: MatchConfig, roster: UnitRoster, stats: &PlayerStats) -> Self {
        let player_levels = roster
            .iter()
            .map(|(_, def)| {
                stats
                    .unit_levels
                    .get(&def.id)
                    .copied()
                    .unwrap_or(config.combat.default_unit_level)
            })
            .collect();

        let mut state = Self {
            left_base: Base::new(Team::Left, config.base_max_hp, config.lane.left_base),
            right_base: Base::new(Team::Right, config.base_max_hp, config.lane.right_base),
            economy: Economy::new(&config.economy),
            scheduler: Scheduler::new(),
            rng: SimRng::new(config.seed),
            tick: 0,
            now_ms: 0,
            elapsed_ms: 0,
            phase: MatchPhase::Running,
            left_units: Vec::new(),
            right_units: Vec::new(),
            next_unit_id: 1,
            slot_ready_at: vec![0; roster.len()],
            player_levels,
            result: None,
            config,
            roster,
        };
        state.schedule_enemy_spawn();
        state
    }

    fn schedule_enemy_spawn(&mut self) {
        let spawn = self.config.enemy_spawn;
        if !spawn.enabled {
            return;
        }
        let delay = self
            .rng
            .between(i64::from(spawn.min_delay_ms), i64::from(spawn.max_delay_ms));
        // A zero delay would fire again inside the same timer drain.
        let due = self.now_ms + u64::try_from(delay).unwrap_or(0).max(1);
        self.scheduler.schedule(due, MatchTimer::EnemySpawn);
    }

    /// Units of one team in collection order, dying units included.
    #[must_use]
    pub fn units(&self, team: Team) -> &[Unit] {
        match team {
            Team::Left => &self.left_units,
            Team::Right => &self.right_units,
        }
    }

    fn units_mut(&mut self, team: Team) -> &mut Vec<Unit> {
        match team {
            Team::Left => &mut self.left_units,
            Team::Right => &mut self.right_units,
        }
    }

    /// Look up a unit on either team.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.left_units
            .iter()
            .chain(&self.right_units)
            .find(|unit| unit.id() == id)
    }

    fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.left_units
            .iter_mut()
            .chain(self.right_units.iter_mut())
            .find(|unit| unit.id() == id)
    }

    /// A team's base.
    #[must_use]
    pub const fn base(&self, team: Team) -> &Base {
        match team {
            Team::Left => &self.left_base,
            Team::Right => &self.right_base,
        }
    }

    fn base_mut(&mut self, team: Team) -> &mut Base {
        match team {
            Team::Left => &mut self.left_base,
            Team::Right => &mut self.right_base,
        }
    }

    /// Simulation ticks run so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Match clock used for cooldowns and timers.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Elapsed match time.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// The player's gold.
    #[must_use]
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Pending timers.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler<MatchTimer> {
        &self.scheduler
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Unit definitions in effect.
    #[must_use]
    pub const fn roster(&self) -> &UnitRoster {
        &self.roster
    }

    /// The result, once the match has ended.
    #[must_use]
    pub const fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    /// Calculate a hash of the deterministic state.
    ///
    /// Two states with identical units, bases, economy, timers and RNG
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.now_ms.hash(&mut hasher);
        self.elapsed_ms.hash(&mut hasher);
        self.phase.hash(&mut hasher);

        self.left_units.hash(&mut hasher);
        self.right_units.hash(&mut hasher);
        self.left_base.hash(&mut hasher);
        self.right_base.hash(&mut hasher);
        self.economy.hash(&mut hasher);

        self.scheduler.len().hash(&mut hasher);
        for (due, handle, timer) in self.scheduler.iter() {
            due.hash(&mut hasher);
            handle.hash(&mut hasher);
            timer.hash(&mut hasher);
        }

        self.rng.state().hash(&mut hasher);
        self.next_unit_id.hash(&mut hasher);
        self.slot_ready_at.hash(&mut hasher);
        self.result.hash(&mut hasher);

        hasher.finish()
    }

    /// Problems with the state's invariants; empty when healthy.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for unit in self.left_units.iter().chain(&self.right_units) {
            let dying = unit.state() == UnitState::Dying;
            if unit.hp() == 0 && !dying {
                problems.push(format!("unit {} has no health but is {:?}", unit.id().0, unit.state()));
            }
            if unit.hp() > 0 && dying {
                problems.push(format!("unit {} is dying with {} hp", unit.id().0, unit.hp()));
            }
            if unit.hp() > unit.profile().max_hp {
                problems.push(format!("unit {} is above max hp", unit.id().0));
            }
            if let Some(hit) = unit.pending_hit() {
                if !self.scheduler.is_pending(hit.timer) {
                    problems.push(format!("unit {} holds a hit with no timer", unit.id().0));
                }
            }
        }
        if self.economy.amount() < Fixed::ZERO
            || self.economy.amount() > Fixed::from_num(self.economy.cap())
        {
            problems.push(format!("gold {} outside [0, {}]", self.economy.amount(), self.economy.cap()));
        }
        if self.economy.level() > self.economy.max_level() {
            problems.push("economy above max level".to_string());
        }
        if self.phase == MatchPhase::Ended && !self.scheduler.is_empty() {
            problems.push("timers still pending after the match ended".to_string());
        }
        problems
    }

    /// Serialize the state for replay or network sync.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize battle: {e}")))
    }
}

/// A running match: the deterministic [`BattleState`] plus the player's
/// profile, the presentation hooks and attached sprites.
///
/// # Example
///
/// ```
/// use siege_core::prelude::*;
///
/// let mut game = Match::new(MatchConfig::default(), UnitRoster::standard(), PlayerStats::default());
/// game.step(1000);
/// let id = game.request_spawn("recruit").expect("affordable");
/// assert!(game.state().unit(id).is_some());
/// ```
pub struct Match {
    state: BattleState,
    stats: PlayerStats,
    store: Option<Box<dyn StatsStore + Send>>,
    hooks: Box<dyn PresentationHooks + Send>,
    visuals: BTreeMap<UnitId, Box<dyn UnitVisual + Send>>,
}

impl Match {
    /// Start a match with an explicit player profile.
    #[must_use]
    pub fn new(config: MatchConfig, roster: UnitRoster, stats: PlayerStats) -> Self {
        tracing::info!(
            seed = config.seed,
            units = roster.len(),
            base_hp = config.base_max_hp,
            "Match started"
        );
        let state = BattleState::new(config, roster, &stats);
        Self::restore(state, stats)
    }

    /// Start a match with the profile read from `store`; the profile is
    /// written back when the match is won.
    #[must_use]
    pub fn with_store(
        config: MatchConfig,
        roster: UnitRoster,
        store: impl StatsStore + Send + 'static,
    ) -> Self {
        let stats = store.load();
        let mut game = Self::new(config, roster, stats);
        game.store = Some(Box::new(store));
        game
    }

    /// Resume from a saved state.
    #[must_use]
    pub fn restore(state: BattleState, stats: PlayerStats) -> Self {
        Self {
            state,
            stats,
            store: None,
            hooks: Box::new(NullHooks),
            visuals: BTreeMap::new(),
        }
    }

    /// Replace the presentation hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl PresentationHooks + Send + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Advance the match by one frame of `delta_ms`.
    pub fn step(&mut self, delta_ms: u32) {
        let time_ms = self.state.now_ms + u64::from(delta_ms);
        self.update(time_ms, delta_ms);
    }

    /// Advance the match to host time `time_ms` by a frame of `delta_ms`.
    ///
    /// `time_ms` drives cooldowns and timers and never runs backwards;
    /// `delta_ms` drives movement, gold and the match timer.
    pub fn update(&mut self, time_ms: u64, delta_ms: u32) {
        if self.state.phase == MatchPhase::Ended {
            return;
        }

        self.state.tick += 1;
        self.state.now_ms = self.state.now_ms.max(time_ms);
        self.state.elapsed_ms += u64::from(delta_ms);

        if self.state.elapsed_ms >= self.state.config.time_limit_ms() {
            self.end_match(false, EndReason::TimeExpired);
            self.sync_visuals();
            return;
        }

        self.state.economy.tick(delta_ms);
        self.fire_due_timers();

        if self.state.phase == MatchPhase::Running {
            self.run_passes(delta_ms);
            self.purge_expired();
        }
        self.sync_visuals();

        #[cfg(feature = "debug-validation")]
        {
            let problems = self.state.invariant_violations();
            debug_assert!(problems.is_empty(), "invariants broken: {problems:?}");
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state.state_hash();
            tracing::trace!(tick = self.state.tick, state_hash = hash, "Battle state hash");
        }
    }

    fn fire_due_timers(&mut self) {
        while let Some((handle, timer)) = self.state.scheduler.pop_due(self.state.now_ms) {
            match timer {
                MatchTimer::HitFallback(unit) => self.resolve_fallback(unit, handle),
                MatchTimer::EnemySpawn => self.spawn_enemy(),
            }
        }
    }

    fn resolve_fallback(&mut self, unit_id: UnitId, handle: EventHandle) {
        let Some(unit) = self.state.unit_mut(unit_id) else {
            return;
        };
        if unit.pending_hit().map(|hit| hit.timer) != Some(handle) {
            return;
        }
        if let Some(hit) = unit.take_pending_hit() {
            let attacker = (unit.id(), unit.team(), unit.profile().sound_pitch_percent);
            self.apply_hit(attacker, hit);
        }
    }

    fn spawn_enemy(&mut self) {
        let index = self.state.rng.index(self.state.roster.len());
        let kind = u16::try_from(index).map(UnitKind);
        if let Ok(kind) = kind {
            self.spawn_unit(Team::Right, kind);
        }
        self.state.schedule_enemy_spawn();
    }

    fn run_passes(&mut self, delta_ms: u32) {
        let state = &mut self.state;
        let mut events = Vec::new();

        for team in [Team::Left, Team::Right] {
            let levels = team.is_player().then_some(state.player_levels.as_slice());
            let mut pass = TeamPass {
                now_ms: state.now_ms,
                delta_ms,
                config: &state.config.combat,
                levels,
                rng: &mut state.rng,
                scheduler: &mut state.scheduler,
            };
            let (units, enemies, enemy_base) = match team {
                Team::Left => (&mut state.left_units, &state.right_units, &state.right_base),
                Team::Right => (&mut state.right_units, &state.left_units, &state.left_base),
            };
            events.extend(run_team_pass(units, enemies, enemy_base, &mut pass));
        }

        for event in events {
            match event {
                CombatEvent::StateChanged(change) => self.hooks.on_unit_state_changed(&change),
                CombatEvent::AttackStarted {
                    attacker,
                    target,
                    damage,
                } => self.hooks.on_attack_started(attacker, target, damage),
            }
        }
    }

    fn purge_expired(&mut self) {
        let now = self.state.now_ms;
        let duration = self.state.config.combat.death_duration_ms;
        for team in [Team::Left, Team::Right] {
            let units = self.state.units_mut(team);
            let expired: Vec<UnitId> = units
                .iter()
                .filter(|unit| unit.is_expired(now, duration))
                .map(Unit::id)
                .collect();
            if expired.is_empty() {
                continue;
            }
            units.retain(|unit| !unit.is_expired(now, duration));
            for id in expired {
                if let Some(mut visual) = self.visuals.remove(&id) {
                    visual.set_visible(false);
                }
                tracing::debug!(unit = id.0, team = team.as_str(), "Unit removed");
            }
        }
    }

    fn sync_visuals(&mut self) {
        let dash_peak = self.state.config.combat.attack_dash_distance;
        for unit in self.state.left_units.iter().chain(&self.state.right_units) {
            let Some(visual) = self.visuals.get_mut(&unit.id()) else {
                continue;
            };
            if unit.state() == UnitState::Dying {
                visual.set_tint(Some(DYING_TINT));
            }
            let drawn = unit.draw_position(dash_peak);
            visual.set_position(drawn.x, drawn.y);
        }
    }

    /// Land a hit. Hits on units that already died or left the field fizzle.
    fn apply_hit(&mut self, attacker: (UnitId, Team, u32), hit: PendingHit) {
        let (attacker_id, attacker_team, pitch_percent) = attacker;
        let now = self.state.now_ms;

        match hit.target {
            HitTarget::Unit(target_id) => {
                let target = self
                    .state
                    .units_mut(attacker_team.opponent())
                    .iter_mut()
                    .find(|unit| unit.id() == target_id);
                let Some(target) = target.filter(|unit| unit.is_alive()) else {
                    tracing::debug!(attacker = attacker_id.0, target = target_id.0, "Hit fizzled");
                    return;
                };
                let outcome = target.take_damage(hit.damage, now);
                if let Some(cancelled) = outcome.cancelled_hit {
                    self.state.scheduler.cancel(cancelled.timer);
                }
                self.hooks.on_damage_applied(&DamageContext {
                    attacker: attacker_id,
                    target: hit.target,
                    damage: outcome.taken,
                    pitch_percent,
                });
                if let Some(death) = outcome.death {
                    tracing::debug!(unit = target_id.0, killer = attacker_id.0, "Unit killed");
                    self.hooks.on_unit_state_changed(&death);
                }
            }
            HitTarget::Base(team) => {
                let base = self.state.base_mut(team);
                if base.is_destroyed() {
                    return;
                }
                let taken = base.take_damage(hit.damage);
                let remaining = base.hp();
                self.hooks.on_damage_applied(&DamageContext {
                    attacker: attacker_id,
                    target: hit.target,
                    damage: taken,
                    pitch_percent,
                });
                self.hooks.on_base_damaged(team, taken, remaining);
                tracing::debug!(team = team.as_str(), damage = taken, remaining, "Base damaged");
                if remaining == 0 {
                    self.end_match(team == Team::Right, EndReason::BaseDestroyed);
                }
            }
        }
    }

    fn end_match(&mut self, victory: bool, reason: EndReason) {
        if self.state.phase == MatchPhase::Ended {
            return;
        }
        self.state.phase = MatchPhase::Ended;
        self.state.scheduler.cancel_all();
        self.state.economy.halt();
        for unit in self.state.left_units.iter_mut().chain(self.state.right_units.iter_mut()) {
            unit.take_pending_hit();
        }

        let elapsed_secs =
            u32::try_from(self.state.elapsed_ms / u64::from(MS_PER_SECOND)).unwrap_or(u32::MAX);
        let result = MatchResult::grade(
            victory,
            reason,
            elapsed_secs,
            &self.state.config.reward_tiers,
        );
        self.state.result = Some(result);

        tracing::info!(
            victory = result.victory,
            ?reason,
            elapsed_secs,
            stars = result.stars,
            gold = result.gold_reward,
            diamonds = result.diamond_reward,
            "Match ended"
        );

        if result.victory {
            self.stats
                .award_rewards(result.gold_reward, result.diamond_reward);
            self.persist_stats();
        }

        self.hooks.on_match_ended(&result);
    }

    /// Place a unit on the field without any checks or charges.
    ///
    /// Used by the enemy timer and by tests; returns `None` for a kind the
    /// roster does not contain.
    pub fn spawn_unit(&mut self, team: Team, kind: UnitKind) -> Option<UnitId> {
        let definition = self.state.roster.get(kind)?;
        let profile = definition.combat_profile();
        let id = UnitId(self.state.next_unit_id);
        self.state.next_unit_id += 1;

        let lane = self.state.config.lane;
        let position = LanePoint::new(lane.spawn_x(team), Fixed::from_num(lane.lane_y));
        let unit = Unit::new(id, team, kind, profile, position);

        tracing::debug!(
            unit = id.0,
            team = team.as_str(),
            kind = %definition.id,
            tick = self.state.tick,
            "Unit spawned"
        );

        self.hooks.on_unit_spawned(&unit);
        if let Some(mut visual) = self.hooks.attach_visual(&unit) {
            visual.set_size(UNIT_VISUAL_SIZE.0, UNIT_VISUAL_SIZE.1);
            visual.set_position(position.x, position.y);
            self.visuals.insert(id, visual);
        }
        self.state.units_mut(team).push(unit);
        Some(id)
    }

    /// Check whether the player could produce `unit_id` right now.
    pub fn can_spawn(&self, unit_id: &str) -> std::result::Result<UnitKind, SpawnRejection> {
        if self.state.phase == MatchPhase::Ended {
            return Err(SpawnRejection::MatchEnded);
        }
        let kind = self
            .state
            .roster
            .kind_of(unit_id)
            .ok_or_else(|| SpawnRejection::UnknownUnit(unit_id.to_string()))?;
        if !self.stats.is_unlocked(unit_id) {
            return Err(SpawnRejection::Locked(unit_id.to_string()));
        }
        let remaining_ms = self.slot_cooldown_remaining(kind);
        if remaining_ms > 0 {
            return Err(SpawnRejection::OnCooldown { remaining_ms });
        }
        let cost = self.state.roster.get(kind).map_or(0, |def| def.cost);
        if !self.state.economy.can_afford(cost) {
            return Err(SpawnRejection::Unaffordable {
                cost,
                available: self.state.economy.whole_amount(),
            });
        }
        Ok(kind)
    }

    /// Produce a player unit: charge gold, start the slot cooldown and
    /// place the unit, all or nothing.
    pub fn request_spawn(&mut self, unit_id: &str) -> std::result::Result<UnitId, SpawnRejection> {
        let kind = self.can_spawn(unit_id)?;
        let (cost, cooldown) = self
            .state
            .roster
            .get(kind)
            .map(|def| (def.cost, def.production_cooldown_ms))
            .ok_or_else(|| SpawnRejection::UnknownUnit(unit_id.to_string()))?;

        if !self.state.economy.try_spend(cost) {
            return Err(SpawnRejection::Unaffordable {
                cost,
                available: self.state.economy.whole_amount(),
            });
        }
        if let Some(ready_at) = self.state.slot_ready_at.get_mut(kind.index()) {
            *ready_at = self.state.now_ms + u64::from(cooldown);
        }
        self.spawn_unit(Team::Left, kind)
            .ok_or_else(|| SpawnRejection::UnknownUnit(unit_id.to_string()))
    }

    /// Buy the next economy upgrade.
    pub fn request_upgrade(&mut self) -> std::result::Result<(), UpgradeRejection> {
        if self.state.phase == MatchPhase::Ended {
            return Err(UpgradeRejection::MatchEnded);
        }
        let economy = &mut self.state.economy;
        if economy.is_max_level() {
            return Err(UpgradeRejection::MaxLevel);
        }
        if !economy.upgrade() {
            return Err(UpgradeRejection::Unaffordable {
                cost: economy.upgrade_cost(),
                available: economy.whole_amount(),
            });
        }
        Ok(())
    }

    /// Buy the next level of a unit type with profile gold.
    ///
    /// Player units attacking after the purchase use the new level.
    /// Returns the new level.
    pub fn purchase_unit_level(
        &mut self,
        unit_id: &str,
    ) -> std::result::Result<u32, PurchaseRejection> {
        let kind = self
            .state
            .roster
            .kind_of(unit_id)
            .ok_or_else(|| PurchaseRejection::UnknownUnit(unit_id.to_string()))?;
        let cost = self
            .state
            .roster
            .get(kind)
            .map(|def| self.stats.upgrade_cost_for(def))
            .ok_or_else(|| PurchaseRejection::UnknownUnit(unit_id.to_string()))?;

        if !self.stats.upgrade_unit_level(unit_id, cost) {
            return Err(PurchaseRejection::NotEnoughGold {
                cost,
                available: self.stats.total_gold,
            });
        }
        let level = self.stats.unit_level(unit_id);
        if let Some(slot) = self.state.player_levels.get_mut(kind.index()) {
            *slot = level;
        }
        tracing::info!(unit = unit_id, level, cost, "Unit level purchased");
        self.persist_stats();
        Ok(level)
    }

    /// Unlock a unit type with diamonds. Unlocked units stay free.
    pub fn purchase_unlock(&mut self, unit_id: &str) -> std::result::Result<(), PurchaseRejection> {
        if self.state.roster.kind_of(unit_id).is_none() {
            return Err(PurchaseRejection::UnknownUnit(unit_id.to_string()));
        }
        if self.stats.is_unlocked(unit_id) {
            return Ok(());
        }
        if !self.stats.unlock_unit(unit_id) {
            return Err(PurchaseRejection::NotEnoughDiamonds {
                cost: UNLOCK_COST_DIAMONDS,
                available: self.stats.total_diamonds,
            });
        }
        tracing::info!(unit = unit_id, "Unit unlocked");
        self.persist_stats();
        Ok(())
    }

    /// Trade diamonds for profile gold in whole exchanges. Returns the
    /// gold gained.
    pub fn exchange_diamonds(&mut self, amount: u64) -> std::result::Result<u64, PurchaseRejection> {
        if amount < DIAMONDS_PER_EXCHANGE {
            return Err(PurchaseRejection::BelowOneExchange);
        }
        let exchanges = amount / DIAMONDS_PER_EXCHANGE;
        if !self.stats.exchange_diamonds_to_gold(amount) {
            return Err(PurchaseRejection::NotEnoughDiamonds {
                cost: exchanges * DIAMONDS_PER_EXCHANGE,
                available: self.stats.total_diamonds,
            });
        }
        let gold = exchanges * GOLD_PER_EXCHANGE;
        tracing::info!(diamonds = exchanges * DIAMONDS_PER_EXCHANGE, gold, "Diamonds exchanged");
        self.persist_stats();
        Ok(gold)
    }

    fn persist_stats(&mut self) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.save(&self.stats) {
                tracing::warn!(error = %e, "Failed to save player stats");
            }
        }
    }

    /// Report an animation event for a unit.
    ///
    /// Hit-like names land the unit's pending hit early and cancel its
    /// fallback timer. Returns whether a hit landed.
    pub fn animation_event(&mut self, unit_id: UnitId, name: &str) -> bool {
        if self.state.phase == MatchPhase::Ended || !is_hit_event(name) {
            return false;
        }
        let Some(unit) = self.state.unit_mut(unit_id) else {
            return false;
        };
        let Some(hit) = unit.take_pending_hit() else {
            return false;
        };
        let attacker = (unit.id(), unit.team(), unit.profile().sound_pitch_percent);
        self.state.scheduler.cancel(hit.timer);
        self.apply_hit(attacker, hit);
        true
    }

    fn slot_cooldown_remaining(&self, kind: UnitKind) -> u64 {
        self.state
            .slot_ready_at
            .get(kind.index())
            .map_or(0, |ready_at| ready_at.saturating_sub(self.state.now_ms))
    }

    /// Production cooldown left for a unit, zero when ready or unknown.
    #[must_use]
    pub fn cooldown_remaining_ms(&self, unit_id: &str) -> u64 {
        self.state
            .roster
            .kind_of(unit_id)
            .map_or(0, |kind| self.slot_cooldown_remaining(kind))
    }

    /// Whether the next economy upgrade is affordable.
    #[must_use]
    pub fn can_upgrade(&self) -> bool {
        self.state.phase == MatchPhase::Running && self.state.economy.can_upgrade()
    }

    /// Living units on a team.
    #[must_use]
    pub fn active_unit_count(&self, team: Team) -> usize {
        self.state
            .units(team)
            .iter()
            .filter(|unit| unit.is_alive())
            .count()
    }

    /// Elapsed match time in whole seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.state.elapsed_ms / u64::from(MS_PER_SECOND)
    }

    /// The deterministic state.
    #[must_use]
    pub const fn state(&self) -> &BattleState {
        &self.state
    }

    /// The player's profile, including rewards once the match is won.
    #[must_use]
    pub const fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    /// The result, once the match has ended.
    #[must_use]
    pub const fn result(&self) -> Option<&MatchResult> {
        self.state.result()
    }

    /// See [`BattleState::state_hash`].
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Observer view of the current tick.
    #[must_use]
    pub fn mirror_snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot::capture(&self.state)
    }

    /// Consume the match, returning its state and profile.
    #[must_use]
    pub fn into_parts(self) -> (BattleState, PlayerStats) {
        (self.state, self.stats)
    }
}
