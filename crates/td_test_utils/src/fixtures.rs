//! Test fixtures and helpers.
//!
//! Canned layouts, archetypes, waves and scenarios for consistent testing.
//! Tick lengths are binary fractions so timing expectations stay exact.

use fixed::types::I32F32;
use td_core::data::{EnemyData, ScenarioData, TurretData};
use td_core::enemy::EnemyStats;
use td_core::pool::{PoolConfig, PoolKey};
use td_core::route::{GridPos, MapLayout};
use td_core::simulation::{Command, Simulation};
use td_core::spawner::{GroupConfig, StartTiming, WaveConfig};
use td_core::targeting::ScoreAttribute;
use td_core::turret::TurretStats;

/// Enemy kind registered by [`scenario`].
pub const GRUNT: &str = "grunt";

/// Faster, weaker enemy kind registered by [`scenario`].
pub const RUNNER: &str = "runner";

/// Turret kind registered by [`scenario`].
pub const GUN: &str = "gun";

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// One tick of 1/16 s.
#[must_use]
pub fn dt() -> I32F32 {
    I32F32::from_num(0.0625)
}

/// 8x6 grid of unit cells with no spacing, centred on the origin.
#[must_use]
pub fn layout() -> MapLayout {
    MapLayout {
        cols: 8,
        rows: 6,
        cell_width: fixed(1),
        cell_height: fixed(1),
        hor_space: I32F32::ZERO,
        ver_space: I32F32::ZERO,
        thickness: fixed_f(0.25),
    }
}

/// Route for [`layout`]: east along row 2, north up column 5, out the top.
#[must_use]
pub fn waypoints() -> Vec<GridPos> {
    vec![GridPos::new(0, 2), GridPos::new(5, 2), GridPos::new(5, 5)]
}

/// Default grunt numbers: 20 health, 2 units per second.
#[must_use]
pub fn grunt_stats() -> EnemyStats {
    EnemyStats {
        max_health: fixed(20),
        speed: fixed(2),
        body_height: fixed_f(0.5),
    }
}

/// Default gun numbers: range 2.5, 5 damage at 4 shots per second.
#[must_use]
pub fn gun_stats() -> TurretStats {
    TurretStats {
        range: fixed_f(2.5),
        focus: ScoreAttribute::MoveProgress,
        damage: fixed(5),
        attack_rate: fixed(4),
        rotate_speed: fixed(8),
        reset_after_last_fire: fixed(1),
        fire_effect_duration: fixed_f(0.125),
        head_height: fixed_f(0.5),
    }
}

/// A group of `count` enemies of `kind`, one every `interval` seconds.
#[must_use]
pub fn group(kind: &str, count: u32, interval: f64) -> GroupConfig {
    GroupConfig {
        kind: PoolKey::new(kind),
        count,
        spawn_interval: fixed_f(interval),
        start_delay: I32F32::ZERO,
        start_timing: StartTiming::WithPrevious,
    }
}

/// [`group`] that waits for the previous group to finish.
#[must_use]
pub fn chained_group(kind: &str, count: u32, interval: f64) -> GroupConfig {
    GroupConfig {
        start_timing: StartTiming::AfterPrevious,
        ..group(kind, count, interval)
    }
}

/// A wave with no start delay.
#[must_use]
pub fn wave(groups: Vec<GroupConfig>) -> WaveConfig {
    WaveConfig {
        start_delay: I32F32::ZERO,
        groups,
    }
}

/// Scenario on [`layout`] with grunts, runners, a gun and the given waves.
#[must_use]
pub fn scenario(waves: Vec<WaveConfig>) -> ScenarioData {
    let grunt = grunt_stats();
    let gun = gun_stats();
    ScenarioData {
        name: "fixture".to_string(),
        map: layout(),
        waypoints: waypoints(),
        enemies: vec![
            EnemyData {
                id: PoolKey::new(GRUNT),
                max_health: grunt.max_health,
                speed: grunt.speed,
                body_height: grunt.body_height,
                pool: PoolConfig::with_capacity(16),
            },
            EnemyData {
                id: PoolKey::new(RUNNER),
                max_health: fixed(5),
                speed: fixed(4),
                body_height: fixed_f(0.25),
                pool: PoolConfig::with_capacity(16),
            },
        ],
        turrets: vec![TurretData {
            id: PoolKey::new(GUN),
            range: gun.range,
            focus: gun.focus,
            damage: gun.damage,
            attack_rate: gun.attack_rate,
            rotate_speed: gun.rotate_speed,
            reset_after_last_fire: gun.reset_after_last_fire,
            fire_effect_duration: gun.fire_effect_duration,
            head_height: gun.head_height,
            pool: PoolConfig::with_capacity(4),
        }],
        waves,
    }
}

/// Build a simulation from [`scenario`].
///
/// # Panics
///
/// Panics if the fixture scenario is invalid.
#[must_use]
pub fn simulation(waves: Vec<WaveConfig>) -> Simulation {
    Simulation::from_scenario(&scenario(waves)).expect("fixture scenario is valid")
}

/// Standard two-wave setup used by the determinism tests.
///
/// Wave 0: five grunts, then three runners once the grunts are out.
/// Wave 1: grunts and runners together.
#[must_use]
pub fn standard_waves() -> Vec<WaveConfig> {
    vec![
        wave(vec![group(GRUNT, 5, 0.5), chained_group(RUNNER, 3, 0.25)]),
        WaveConfig {
            start_delay: fixed(1),
            groups: vec![group(GRUNT, 4, 0.75), group(RUNNER, 4, 0.5)],
        },
    ]
}

/// [`simulation`] with [`standard_waves`], two guns along the route and
/// both waves started.
///
/// # Panics
///
/// Panics if the fixture setup is rejected.
#[must_use]
pub fn defended_simulation() -> Simulation {
    let mut sim = simulation(standard_waves());
    let gun = PoolKey::new(GUN);
    sim.build_turret(&gun, GridPos::new(2, 1)).expect("free site");
    sim.build_turret(&gun, GridPos::new(4, 3)).expect("free site");
    sim.start_all_waves();
    sim
}

/// Helpers on [`Simulation`] that only tests need.
pub trait SimulationExt {
    /// Start every configured wave.
    fn start_all_waves(&mut self);

    /// Run `ticks` ticks of [`dt`].
    fn run_ticks(&mut self, ticks: u64);
}

impl SimulationExt for Simulation {
    fn start_all_waves(&mut self) {
        while self.spawner().next_wave().is_some() {
            if self.apply(Command::StartNextWave).is_err() {
                break;
            }
        }
    }

    fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick(dt());
        }
    }
}
