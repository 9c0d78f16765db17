//! # Siege Core
//!
//! Deterministic lane battle simulation core for Lane Siege.
//!
//! This crate contains **only** simulation logic:
//! - No rendering (visuals are reached through [`hooks`] capability traits)
//! - No system randomness (seeded [`rng::SimRng`])
//! - No floating-point simulation math (uses fixed-point)
//! - Time is integer milliseconds supplied by the host
//!
//! This separation enables:
//! - Headless batch runs for balance testing
//! - A network mirror that replays the same state
//! - Determinism testing via [`simulation::Match::state_hash`]
//!
//! ## Crate Structure
//!
//! - [`economy`] - Regenerating gold and the upgrade ladder
//! - [`unit`] - Combatant state machine and pending hits
//! - [`structure`] - Team bases
//! - [`combat`] - Per-team targeting, movement and damage formula
//! - [`simulation`] - The match controller and tick loop
//! - [`scheduler`] - Cancellable deferred events
//! - [`stats`] - Persisted player profile and stores
//! - [`results`] - Match results and reward tiers
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod config;
pub mod data;
pub mod economy;
pub mod error;
pub mod hooks;
pub mod math;
pub mod results;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod structure;
pub mod team;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MatchConfig;
    pub use crate::data::{UnitDefinition, UnitRoster};
    pub use crate::economy::Economy;
    pub use crate::error::{GameError, Result};
    pub use crate::hooks::{DamageContext, HitTarget, NullHooks, PresentationHooks, UnitVisual};
    pub use crate::math::Fixed;
    pub use crate::results::{EndReason, MatchResult};
    pub use crate::simulation::{
        Match, MatchPhase, PurchaseRejection, SpawnRejection, UpgradeRejection,
    };
    pub use crate::snapshot::MirrorSnapshot;
    pub use crate::stats::{MemoryStore, PlayerStats, RonFileStore, StatsStore};
    pub use crate::structure::Base;
    pub use crate::team::Team;
    pub use crate::unit::{Unit, UnitId, UnitState};
}
