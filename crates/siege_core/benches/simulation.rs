//! Simulation benchmarks for siege_core.
//!
//! Run with: `cargo bench -p siege_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use siege_core::prelude::*;
use siege_core::team::Team;

fn crowded_match() -> Match {
    let stats = PlayerStats::default().with_unlocked(["cavalry", "musketeer"]);
    let mut game = Match::new(MatchConfig::with_seed(42), UnitRoster::standard(), stats);
    let kinds: Vec<_> = game.state().roster().iter().map(|(kind, _)| kind).collect();
    for &kind in kinds.iter().cycle().take(40) {
        game.spawn_unit(Team::Left, kind);
        game.spawn_unit(Team::Right, kind);
    }
    game
}

/// Runs simulation benchmarks for the siege_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_80_units", |b| {
        b.iter_batched(
            crowded_match,
            |mut game| {
                game.step(black_box(16));
                game
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("full_match_60s", |b| {
        b.iter_batched(
            || Match::new(MatchConfig::with_seed(7), UnitRoster::standard(), PlayerStats::default()),
            |mut game| {
                for frame in 0..3750_u32 {
                    if frame % 50 == 0 {
                        game.request_spawn("recruit").ok();
                    }
                    game.step(16);
                }
                game.state_hash()
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("state_hash", |b| {
        let game = crowded_match();
        b.iter(|| black_box(game.state_hash()));
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
