//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical
//! state given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, balance batches and the network mirror all assume that a seed
//! and an input script fully determine a match. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: positions and gold use
//!   [`siege_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: units live in `Vec`s and timers in
//!   `BTreeMap`s, so iteration order is insertion or key order.
//!
//! - **System randomness**: every roll goes through the seeded
//!   [`siege_core::rng::SimRng`] stored in the state.
//!
//! - **Wall-clock time**: the host supplies time; the core never reads a
//!   clock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use siege_core::simulation::{BattleState, Match};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of frames simulated.
    pub frames: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the match was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Frames: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `frames` - Number of frames to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one frame; receives the frame index
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    frames: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for frame in 0..frames {
            step(&mut state, frame);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Run a match twice with fixed-length frames and compare final hashes.
pub fn verify_match_determinism<F>(setup_fn: F, frames: u64, delta_ms: u32) -> bool
where
    F: Fn() -> Match,
{
    verify_determinism(
        2,
        frames,
        &setup_fn,
        |game, _| game.step(delta_ms),
        Match::state_hash,
    )
    .is_deterministic
}

/// Find the first frame where two identically-seeded matches diverge.
///
/// # Returns
///
/// `None` if the matches stay identical, `Some(frame)` otherwise.
pub fn find_first_divergence<F>(setup_fn: F, frames: u64, delta_ms: u32) -> Option<u64>
where
    F: Fn() -> Match,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for frame in 1..=frames {
        first.step(delta_ms);
        second.step(delta_ms);

        if first.state_hash() != second.state_hash() {
            return Some(frame);
        }
    }

    None
}

/// Verify that a bincode round-trip preserves the state exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, frames: u64, delta_ms: u32) -> bool
where
    F: Fn() -> Match,
{
    let mut game = setup_fn();
    for _ in 0..frames {
        game.step(delta_ms);
    }

    let hash_before = game.state_hash();

    let Ok(bytes) = game.state().serialize() else {
        return false;
    };
    let Ok(restored) = BattleState::deserialize(&bytes) else {
        return false;
    };

    hash_before == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for match inputs.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;

    use siege_core::data::UnitRoster;

    /// A scripted player input, applied before a frame.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PlayerAction {
        /// Do nothing this frame.
        Wait,
        /// Try to produce a unit.
        Spawn(String),
        /// Try to buy an economy upgrade.
        Upgrade,
    }

    /// Any match seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Frame lengths from a fast monitor up to a long hitch.
    pub fn arb_delta_ms() -> impl Strategy<Value = u32> {
        1_u32..=250
    }

    /// Identifier of a unit in the standard roster.
    pub fn arb_unit_id() -> impl Strategy<Value = String> {
        let ids: Vec<String> = UnitRoster::standard()
            .iter()
            .map(|(_, def)| def.id.clone())
            .collect();
        proptest::sample::select(ids)
    }

    /// A single player action, mostly waiting.
    pub fn arb_player_action() -> impl Strategy<Value = PlayerAction> {
        prop_oneof![
            6 => Just(PlayerAction::Wait),
            3 => arb_unit_id().prop_map(PlayerAction::Spawn),
            1 => Just(PlayerAction::Upgrade),
        ]
    }

    /// A script of frames: each frame's action and length.
    pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<(PlayerAction, u32)>> {
        proptest::collection::vec((arb_player_action(), arb_delta_ms()), 1..max_len)
    }

    /// Damage amounts, including lethal overkill.
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0_u32..2000
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{quiet_config, standard_match, unlocked_stats};
    use proptest::prelude::*;
    use siege_core::data::UnitRoster;
    use siege_core::team::Team;

    fn busy_match(seed: u64) -> Match {
        let mut game = standard_match(seed);
        for kind in ["recruit", "longbowman", "armored_knight"] {
            game.request_spawn(kind).ok();
        }
        game
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let result = verify_determinism(
            4,
            600,
            || busy_match(42),
            |game, frame| {
                if frame % 40 == 0 {
                    game.request_spawn("recruit").ok();
                }
                game.step(50);
            },
            Match::state_hash,
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = {
            let mut game = busy_match(1);
            for _ in 0..400 {
                game.step(50);
            }
            game.state_hash()
        };
        let b = {
            let mut game = busy_match(2);
            for _ in 0..400 {
                game.step(50);
            }
            game.state_hash()
        };
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_divergence_frame() {
        assert_eq!(find_first_divergence(|| busy_match(7), 500, 33), None);
        assert!(verify_match_determinism(|| busy_match(8), 500, 16));
    }

    #[test]
    fn test_serialization_keeps_hash() {
        assert!(verify_serialization_determinism(|| busy_match(9), 300, 50));
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1_u32, "a")), compute_hash(&(1_u32, "a")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_scripts_replay_identically(seed in arb_seed(), script in arb_script(200)) {
            let play = || {
                let mut game = Match::new(
                    siege_core::config::MatchConfig::with_seed(seed),
                    UnitRoster::standard(),
                    unlocked_stats(),
                );
                for (action, delta) in &script {
                    match action {
                        PlayerAction::Wait => {}
                        PlayerAction::Spawn(id) => {
                            game.request_spawn(id).ok();
                        }
                        PlayerAction::Upgrade => {
                            game.request_upgrade().ok();
                        }
                    }
                    game.step(*delta);
                }
                game.state_hash()
            };
            prop_assert_eq!(play(), play());
        }

        #[test]
        fn prop_quiet_match_only_moves_left(delta in arb_delta_ms()) {
            let mut game = Match::new(quiet_config(), UnitRoster::standard(), unlocked_stats());
            game.request_spawn("recruit").ok();
            let before = game.state().units(Team::Left)[0].x();
            game.step(delta);
            let after = game.state().units(Team::Left)[0].x();
            prop_assert!(after > before);
        }
    }
}
