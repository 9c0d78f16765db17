//! Determinism tests.
//!
//! Identical seeds and inputs must give identical states, whatever the
//! frame pacing of the host.

use siege_core::prelude::*;
use siege_core::simulation::BattleState;
use siege_test_utils::determinism::{find_first_divergence, verify_determinism};
use siege_test_utils::fixtures::{standard_match, unlocked_stats};

fn scripted_step(game: &mut Match, frame: u64) {
    match frame % 60 {
        0 => {
            game.request_spawn("recruit").ok();
        }
        15 => {
            game.request_spawn("longbowman").ok();
        }
        30 => {
            game.request_spawn("cavalry").ok();
        }
        45 => {
            game.request_upgrade().ok();
        }
        _ => {}
    }
    game.step(33);
}

#[test]
fn full_match_is_deterministic() {
    let result = verify_determinism(
        3,
        6000,
        || standard_match(1234),
        scripted_step,
        Match::state_hash,
    );
    result.assert_deterministic();
}

#[test]
fn identical_matches_never_diverge() {
    assert_eq!(find_first_divergence(|| standard_match(99), 3000, 16), None);
}

#[test]
fn restored_state_continues_identically() {
    let mut original = standard_match(77);
    for frame in 0..900 {
        scripted_step(&mut original, frame);
    }

    let bytes = original.state().serialize().unwrap();
    let mut resumed = Match::restore(BattleState::deserialize(&bytes).unwrap(), unlocked_stats());

    for frame in 900..1800 {
        scripted_step(&mut original, frame);
        scripted_step(&mut resumed, frame);
        assert_eq!(original.state_hash(), resumed.state_hash(), "diverged at frame {frame}");
    }
}

#[test]
fn host_timestamps_drive_cooldowns_not_the_match_clock() {
    let mut game = Match::new(MatchConfig::with_seed(5), UnitRoster::standard(), unlocked_stats());
    // A host clock that started long before the match.
    game.update(1_000_000, 16);
    assert_eq!(game.state().now_ms(), 1_000_000);
    assert_eq!(game.state().elapsed_ms(), 16);

    // A stale timestamp never rewinds the clock.
    game.update(999_000, 16);
    assert_eq!(game.state().now_ms(), 1_000_000);
    assert_eq!(game.state().elapsed_ms(), 32);
}
