//! Headless runner tests against real matches.

use siege_core::config::{EnemySpawnConfig, MatchConfig};
use siege_core::data::UnitRoster;
use siege_core::stats::{PlayerStats, RonFileStore, StatsStore};
use siege_headless::{run_batch, run_match, BatchConfig, BatchResults, Profile, RunConfig, Strategy};
use siege_test_utils::fixtures::quiet_config;

fn undefended(strategy: Strategy) -> RunConfig {
    RunConfig {
        match_config: quiet_config(),
        strategy,
        ..RunConfig::default()
    }
}

#[test]
fn rush_against_an_empty_lane_wins_fast() {
    let metrics = run_match(
        &undefended(Strategy::rush()),
        UnitRoster::standard(),
        Profile::Detached(PlayerStats::default()),
    );

    assert!(metrics.result.victory);
    assert_eq!(metrics.result.stars, 3);
    assert_eq!(metrics.enemy.units_spawned, 0);
    assert_eq!(metrics.enemy.base_damage_taken, 500);
    assert_eq!(metrics.player.base_damage_taken, 0);
}

#[test]
fn victory_is_written_to_the_stats_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.ron");

    run_match(
        &undefended(Strategy::rush()),
        UnitRoster::standard(),
        Profile::Stored(Box::new(RonFileStore::new(&path))),
    );

    let saved = RonFileStore::new(&path).load();
    assert_eq!(saved.total_gold, PlayerStats::default().total_gold + 1000);
    assert_eq!(saved.total_diamonds, PlayerStats::default().total_diamonds + 50);
}

#[test]
fn stored_unlocks_reach_the_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.ron");
    let strategy = Strategy {
        name: "Muskets".to_string(),
        description: String::new(),
        build_order: vec!["musketeer".to_string()],
        economy_target: 0,
    };

    // A fresh profile has musketeers locked.
    let locked = run_match(
        &undefended(strategy.clone()),
        UnitRoster::standard(),
        Profile::Stored(Box::new(RonFileStore::new(&path))),
    );
    assert_eq!(locked.player.units_spawned, 0);
    assert!(locked.skipped > 0);

    let mut store = RonFileStore::new(&path);
    store
        .save(&PlayerStats::default().with_unlocked(["musketeer"]))
        .unwrap();

    let unlocked = run_match(
        &undefended(strategy),
        UnitRoster::standard(),
        Profile::Stored(Box::new(RonFileStore::new(&path))),
    );
    assert!(unlocked.player.units_spawned > 0);
    assert_eq!(unlocked.skipped, 0);
}

#[test]
fn batch_results_survive_a_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = BatchConfig {
        match_config: MatchConfig {
            enemy_spawn: EnemySpawnConfig {
                min_delay_ms: 2000,
                max_delay_ms: 4000,
                ..EnemySpawnConfig::default()
            },
            ..MatchConfig::default()
        },
        ..BatchConfig::new(Strategy::economy(), 4)
    }
    .with_seed(9)
    .with_output(dir.path().to_path_buf());

    let results = run_batch(config, &UnitRoster::standard(), &PlayerStats::default());
    let path = results.save_to_output().unwrap();
    assert_eq!(path, dir.path().join("batch_results.json"));

    let loaded = BatchResults::load(&path).unwrap();
    assert_eq!(loaded.games, results.games);
    assert_eq!(loaded.summary.total_games, 4);
}
