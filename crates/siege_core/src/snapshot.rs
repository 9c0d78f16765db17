//! Reduced state for network observers.
//!
//! Observers get just enough to draw the lane: where every unit stands,
//! how healthy it is, and both base health bars. Snapshots are never fed
//! back into a simulation.

use serde::{Deserialize, Serialize};

use crate::simulation::{BattleState, MatchPhase};
use crate::team::Team;
use crate::unit::Unit;

/// One unit as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorUnit {
    /// Unit identifier.
    pub id: u64,
    /// Owning team.
    pub team: Team,
    /// Lane coordinate, rounded to whole units.
    pub x: i32,
    /// Current health.
    pub hp: u32,
}

impl From<&Unit> for MirrorUnit {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id().0,
            team: unit.team(),
            x: unit.x().round().to_num::<i32>(),
            hp: unit.hp(),
        }
    }
}

/// Observer view of a whole match at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSnapshot {
    /// Simulation tick the snapshot was taken at.
    pub tick: u64,
    /// Elapsed match time.
    pub elapsed_ms: u64,
    /// Every unit still on the field, left team first.
    pub units: Vec<MirrorUnit>,
    /// Player base health.
    pub left_base_hp: u32,
    /// Enemy base health.
    pub right_base_hp: u32,
    /// Whether the match is over.
    pub ended: bool,
}

impl MirrorSnapshot {
    /// Capture a snapshot of `state`.
    #[must_use]
    pub fn capture(state: &BattleState) -> Self {
        Self {
            tick: state.tick(),
            elapsed_ms: state.elapsed_ms(),
            units: state
                .units(Team::Left)
                .iter()
                .chain(state.units(Team::Right))
                .map(MirrorUnit::from)
                .collect(),
            left_base_hp: state.base(Team::Left).hp(),
            right_base_hp: state.base(Team::Right).hp(),
            ended: state.phase() == MatchPhase::Ended,
        }
    }
}
