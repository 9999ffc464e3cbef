//! Combat and decision benchmarks for warband_core.
//!
//! Run with: `cargo bench -p warband_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use warband_core::prelude::*;
use warband_test_utils::balance::plain_odds;
use warband_test_utils::determinism::play_ai_turn;
use warband_test_utils::fixtures::{melee_unit, promotion_table, skirmish_game};

/// Closed-form odds for a promoted attacker on a fortified tile.
pub fn odds_benchmark(c: &mut Criterion) {
    let table = promotion_table();
    let model = CombatModel::new(&table);
    let mut attacker = melee_unit(OwnerId(0), 1, 6);
    attacker.promotions = vec!["combat1".into(), "combat2".into(), "shock".into()];
    let defender = melee_unit(OwnerId::BARBARIAN, 2, 5);
    let tile = TileFeatures {
        features: vec![Feature::Hills, Feature::Forest],
        city: true,
        ..TileFeatures::open()
    };

    c.bench_function("combat_odds", |b| {
        b.iter(|| {
            let ctx = BattleContext::new(&attacker, &defender, tile.clone());
            black_box(model.evaluate(black_box(&ctx)))
        })
    });
}

/// One full simulated fight at even odds.
pub fn battle_benchmark(c: &mut Criterion) {
    let odds = plain_odds(4, 4);
    let simulator = BattleSimulator::new();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    c.bench_function("battle_even", |b| {
        b.iter(|| black_box(simulator.run(black_box(&odds), &mut rng)))
    });
}

/// Ten AI turns of the skirmish fixture.
pub fn ai_turn_benchmark(c: &mut Criterion) {
    c.bench_function("skirmish_ten_turns", |b| {
        b.iter(|| {
            let mut game = skirmish_game(7);
            for _ in 0..10 {
                play_ai_turn(&mut game);
            }
            black_box(game.units().len())
        })
    });
}

criterion_group!(benches, odds_benchmark, battle_benchmark, ai_turn_benchmark);
criterion_main!(benches);
