//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Sources of non-determinism guarded against
//!
//! - **Floating-point math**: all simulation math uses
//!   [`td_core::math::Fixed`].
//! - **HashMap iteration order**: enemies and turrets are iterated in
//!   registration and build order, never hash order.
//! - **Wall-clock time**: the simulation only sees the `dt` passed to
//!   `tick`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use td_core::math::Fixed;
use td_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic,
            "Simulation is non-deterministic!\n\
             Runs: {}\n\
             Ticks: {}\n\
             Unique hashes: {} (expected 1)\n\
             All hashes: {:?}",
            self.hashes.len(),
            self.ticks,
            self.unique_hashes().len(),
            self.hashes
        );
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| {
            let mut state = setup();
            for tick in 0..ticks {
                step(&mut state, tick);
            }
            hash(&state)
        })
        .collect();

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run two simulations from `setup_fn` for `num_ticks` ticks of `dt` and
/// compare their final state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim, _| {
            sim.tick(dt);
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` for the first tick at
/// which their hashes differ (0 for the initial state).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick(dt);
        second.tick(dt);
        if first.state_hash() != second.state_hash() {
            tracing::debug!(tick, "Simulations diverged");
            return Some(tick);
        }
    }
    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies.
///
/// These generate random but reproducible inputs for property-based tests
/// of scheduling, pooling and determinism.
pub mod strategies {
    use proptest::prelude::*;
    use td_core::math::Fixed;
    use td_core::pool::PoolKey;
    use td_core::route::GridPos;
    use td_core::simulation::Command;
    use td_core::spawner::{GroupConfig, StartTiming, WaveConfig};

    use crate::fixtures::{GRUNT, GUN, RUNNER};

    /// Delay or interval in whole sixteenths of a second, 0 to 2 s.
    pub fn arb_delay() -> impl Strategy<Value = Fixed> {
        (0i32..=32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(16))
    }

    /// Start timing mode.
    pub fn arb_start_timing() -> impl Strategy<Value = StartTiming> {
        prop_oneof![Just(StartTiming::WithPrevious), Just(StartTiming::AfterPrevious)]
    }

    /// Group of a fixture enemy kind.
    pub fn arb_group() -> impl Strategy<Value = GroupConfig> {
        (
            prop_oneof![Just(GRUNT), Just(RUNNER)],
            0u32..5,
            arb_delay(),
            arb_delay(),
            arb_start_timing(),
        )
            .prop_map(|(kind, count, spawn_interval, start_delay, start_timing)| GroupConfig {
                kind: PoolKey::new(kind),
                count,
                spawn_interval,
                start_delay,
                start_timing,
            })
    }

    /// Wave of one to four groups.
    pub fn arb_wave() -> impl Strategy<Value = WaveConfig> {
        (arb_delay(), prop::collection::vec(arb_group(), 1..4))
            .prop_map(|(start_delay, groups)| WaveConfig { start_delay, groups })
    }

    /// Cell on the fixture layout.
    pub fn arb_site() -> impl Strategy<Value = GridPos> {
        (0i32..8, 0i32..6).prop_map(|(x, y)| GridPos::new(x, y))
    }

    /// Command against the fixture scenario, valid or not.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (0usize..3).prop_map(Command::StartWave),
            Just(Command::StartNextWave),
            arb_site().prop_map(|site| Command::BuildTurret {
                kind: PoolKey::new(GUN),
                site,
            }),
            arb_site().prop_map(|site| Command::RecycleTurret { site }),
        ]
    }

    /// Pool operation: `true` acquires, `false` releases the newest instance.
    pub fn arb_pool_ops() -> impl Strategy<Value = Vec<bool>> {
        prop::collection::vec(any::<bool>(), 0..64)
    }
}
