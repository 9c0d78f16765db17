//! Test fixtures and helpers.
//!
//! Pre-built matches, profiles and presentation hooks that record what
//! the simulation reported.

use std::sync::{Arc, Mutex};

use fixed::types::I32F32;
use siege_core::config::{EnemySpawnConfig, MatchConfig};
use siege_core::data::UnitRoster;
use siege_core::hooks::{DamageContext, HitTarget, PresentationHooks, UnitVisual};
use siege_core::results::MatchResult;
use siege_core::simulation::Match;
use siege_core::stats::PlayerStats;
use siege_core::team::Team;
use siege_core::unit::{StateTransition, Unit, UnitId};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Default tuning with the enemy spawn timer switched off.
#[must_use]
pub fn quiet_config() -> MatchConfig {
    MatchConfig {
        enemy_spawn: EnemySpawnConfig {
            enabled: false,
            ..EnemySpawnConfig::default()
        },
        ..MatchConfig::default()
    }
}

/// A profile with every standard unit unlocked.
#[must_use]
pub fn unlocked_stats() -> PlayerStats {
    let roster = UnitRoster::standard();
    PlayerStats::default().with_unlocked(roster.iter().map(|(_, def)| def.id.as_str()))
}

/// A standard match with a seed and every unit unlocked.
#[must_use]
pub fn standard_match(seed: u64) -> Match {
    Match::new(MatchConfig::with_seed(seed), UnitRoster::standard(), unlocked_stats())
}

/// A match with no enemy timer; units only appear when a test places them.
#[must_use]
pub fn quiet_match() -> Match {
    Match::new(quiet_config(), UnitRoster::standard(), unlocked_stats())
}

/// Place a unit by roster id without checks.
///
/// # Panics
///
/// Panics if the id is not in the match's roster.
pub fn place(game: &mut Match, team: Team, unit_id: &str) -> UnitId {
    let kind = game
        .state()
        .roster()
        .kind_of(unit_id)
        .unwrap_or_else(|| panic!("unknown unit '{unit_id}'"));
    game.spawn_unit(team, kind)
        .unwrap_or_else(|| panic!("failed to place '{unit_id}'"))
}

/// One notification received by [`RecordingHooks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// `on_unit_spawned`.
    Spawned(UnitId),
    /// `on_unit_state_changed`.
    StateChanged(StateTransition),
    /// `on_attack_started`.
    AttackStarted {
        /// Swinging unit.
        attacker: UnitId,
        /// What it swung at.
        target: HitTarget,
        /// Damage queued.
        damage: u32,
    },
    /// `on_damage_applied`.
    Damage(DamageContext),
    /// `on_base_damaged`.
    BaseDamaged {
        /// Base owner.
        team: Team,
        /// Health removed.
        damage: u32,
        /// Health left.
        remaining: u32,
    },
    /// `on_match_ended`.
    Ended(MatchResult),
}

/// One call received by a [`RecordingVisual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualCall {
    /// `set_position`.
    Position(I32F32, I32F32),
    /// `set_size`.
    Size(u32, u32),
    /// `set_tint`.
    Tint(Option<u32>),
    /// `set_visible`.
    Visible(bool),
}

/// Shared log readable after the hooks move into a [`Match`].
pub type SharedLog<T> = Arc<Mutex<Vec<T>>>;

fn push<T>(log: &SharedLog<T>, entry: T) {
    if let Ok(mut entries) = log.lock() {
        entries.push(entry);
    }
}

/// Read a shared log.
#[must_use]
pub fn entries<T: Clone>(log: &SharedLog<T>) -> Vec<T> {
    log.lock().map(|entries| entries.clone()).unwrap_or_default()
}

/// Sprite that records every call it receives.
#[derive(Debug, Clone)]
pub struct RecordingVisual {
    unit: UnitId,
    log: SharedLog<(UnitId, VisualCall)>,
}

impl UnitVisual for RecordingVisual {
    fn set_position(&mut self, x: I32F32, y: I32F32) {
        push(&self.log, (self.unit, VisualCall::Position(x, y)));
    }

    fn set_size(&mut self, width: u32, height: u32) {
        push(&self.log, (self.unit, VisualCall::Size(width, height)));
    }

    fn set_tint(&mut self, tint: Option<u32>) {
        push(&self.log, (self.unit, VisualCall::Tint(tint)));
    }

    fn set_visible(&mut self, visible: bool) {
        push(&self.log, (self.unit, VisualCall::Visible(visible)));
    }
}

/// Presentation hooks that record every notification.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    /// Notifications in arrival order.
    pub events: SharedLog<HookEvent>,
    /// Sprite calls in arrival order.
    pub visual_calls: SharedLog<(UnitId, VisualCall)>,
    attach_visuals: bool,
}

impl RecordingHooks {
    /// Hooks that record notifications only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks that also attach a [`RecordingVisual`] to every unit.
    #[must_use]
    pub fn with_visuals() -> Self {
        Self {
            attach_visuals: true,
            ..Self::default()
        }
    }

    /// Recorded notifications.
    #[must_use]
    pub fn events(&self) -> Vec<HookEvent> {
        entries(&self.events)
    }

    /// Recorded damage notifications.
    #[must_use]
    pub fn damage(&self) -> Vec<DamageContext> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HookEvent::Damage(context) => Some(context),
                _ => None,
            })
            .collect()
    }

    /// Recorded sprite calls for one unit.
    #[must_use]
    pub fn visual_calls_for(&self, unit: UnitId) -> Vec<VisualCall> {
        entries(&self.visual_calls)
            .into_iter()
            .filter(|(id, _)| *id == unit)
            .map(|(_, call)| call)
            .collect()
    }
}

impl PresentationHooks for RecordingHooks {
    fn attach_visual(&mut self, unit: &Unit) -> Option<Box<dyn UnitVisual + Send>> {
        self.attach_visuals.then(|| {
            Box::new(RecordingVisual {
                unit: unit.id(),
                log: Arc::clone(&self.visual_calls),
            }) as Box<dyn UnitVisual + Send>
        })
    }

    fn on_unit_spawned(&mut self, unit: &Unit) {
        push(&self.events, HookEvent::Spawned(unit.id()));
    }

    fn on_unit_state_changed(&mut self, change: &StateTransition) {
        push(&self.events, HookEvent::StateChanged(*change));
    }

    fn on_attack_started(&mut self, attacker: UnitId, target: HitTarget, damage: u32) {
        push(
            &self.events,
            HookEvent::AttackStarted {
                attacker,
                target,
                damage,
            },
        );
    }

    fn on_damage_applied(&mut self, context: &DamageContext) {
        push(&self.events, HookEvent::Damage(*context));
    }

    fn on_base_damaged(&mut self, team: Team, damage: u32, remaining: u32) {
        push(
            &self.events,
            HookEvent::BaseDamaged {
                team,
                damage,
                remaining,
            },
        );
    }

    fn on_match_ended(&mut self, result: &MatchResult) {
        push(&self.events, HookEvent::Ended(*result));
    }
}
