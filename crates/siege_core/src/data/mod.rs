//! Data structures for unit configuration.
//!
//! This module contains pure data structures that define the unit
//! roster shared by both teams. All structs are designed to be
//! deserialized from RON files.

mod roster;
mod unit_data;

pub use roster::{UnitKind, UnitRoster};
pub use unit_data::{CombatProfile, UnitDefinition};
