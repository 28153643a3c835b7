//! Simulation benchmarks for td_core.
//!
//! Run with: `cargo bench -p td_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use td_core::math::Vec3Fixed;
use td_core::pool::{PoolKey, Poolable};
use td_core::targeting::{select_target, ScoreAttribute};
use td_test_utils::fixtures::{
    defended_simulation, fixed, group, simulation, wave, SimulationExt, GRUNT, GUN,
};

/// Full defended scenario, 600 ticks from the start.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("defended_scenario_600_ticks", |b| {
        b.iter_batched(
            defended_simulation,
            |mut sim| {
                sim.run_ticks(600);
                black_box(sim.state_hash())
            },
            BatchSize::SmallInput,
        );
    });
}

/// Target selection over a crowded registry.
pub fn targeting_benchmark(c: &mut Criterion) {
    let mut sim = simulation(vec![wave(vec![group(GRUNT, 16, 0.0625)])]);
    sim.start_all_waves();
    sim.run_ticks(24);

    c.bench_function("select_target_16_enemies", |b| {
        b.iter(|| {
            select_target(
                black_box(Vec3Fixed::ZERO),
                black_box(fixed(6)),
                ScoreAttribute::MoveProgress,
                sim.enemies().iter(),
            )
        });
    });
}

/// Acquire/release cycle on a warm pool.
pub fn pool_benchmark(c: &mut Criterion) {
    let mut sim = simulation(Vec::new());
    let gun = PoolKey::new(GUN);
    let site = sim.tower_sites()[0];
    sim.build_turret(&gun, site).ok();
    sim.recycle_turret(site).ok();

    c.bench_function("turret_build_recycle", |b| {
        b.iter(|| {
            let id = sim.build_turret(&gun, site).ok();
            let active = sim.turrets().first().is_some_and(|placed| placed.turret.is_active());
            sim.recycle_turret(site).ok();
            black_box((id, active))
        });
    });
}

criterion_group!(benches, simulation_benchmark, targeting_benchmark, pool_benchmark);
criterion_main!(benches);
