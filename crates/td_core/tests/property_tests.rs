use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use td_core::enemy::{Enemy, EnemyStats};
use td_core::math::{Fixed, Orientation, Vec3Fixed};
use td_core::movement::{MoveState, PathFollower, StepOutcome};
use td_core::pool::{Placement, Pool, PoolConfig, PoolKey, Poolable};
use td_core::route::{GridPos, MapLayout, Route};
use td_core::simulation::Simulation;
use td_test_utils::determinism::strategies::{arb_command, arb_pool_ops, arb_wave};
use td_test_utils::determinism::verify_determinism;
use td_test_utils::fixtures::{dt, layout, scenario, waypoints};

const CAPACITY: usize = 4;

fn enemy_pool() -> (Pool<PoolKey, Enemy>, PoolKey) {
    let key = PoolKey::new("grunt");
    let mut pool = Pool::new();
    let ids = Rc::new(Cell::new(0u64));
    let kind = key.clone();
    pool.register(
        key.clone(),
        PoolConfig::with_capacity(CAPACITY),
        Box::new(move |_placement: &Placement| {
            let id = ids.get();
            ids.set(id + 1);
            Enemy::new(id, kind.clone(), EnemyStats::default())
        }),
    )
    .unwrap();
    (pool, key)
}

proptest! {
    /// Releasing then acquiring with the same key hands back the instance
    /// just released, as long as the pool had room for it.
    #[test]
    fn pool_round_trip_returns_released_instance(ops in arb_pool_ops()) {
        let (mut pool, key) = enemy_pool();
        let mut out: Vec<Enemy> = Vec::new();
        let mut acquired = 0u64;

        for acquire in ops {
            if acquire {
                let enemy = pool
                    .acquire(&key, Vec3Fixed::ZERO, Orientation::IDENTITY, None)
                    .unwrap();
                prop_assert!(enemy.is_active());
                acquired += 1;
                out.push(enemy);
            } else if let Some(enemy) = out.pop() {
                let id = enemy.id();
                let had_room = pool.idle_count(&key) < CAPACITY;
                pool.release(&key, enemy).unwrap();
                if had_room {
                    let again = pool
                        .acquire(&key, Vec3Fixed::ZERO, Orientation::IDENTITY, None)
                        .unwrap();
                    prop_assert_eq!(again.id(), id);
                    acquired += 1;
                    out.push(again);
                }
            }
            prop_assert!(pool.idle_count(&key) <= CAPACITY);
        }

        let stats = pool.stats(&key).unwrap();
        prop_assert_eq!(stats.created + stats.reused, acquired);
    }

    /// Progress never decreases and never exceeds the segment count.
    #[test]
    fn progress_is_monotonic(speed in 1i32..64, ticks in 1usize..400) {
        let built = layout().build_route(&waypoints()).unwrap();
        let segments = Fixed::from_num(built.route.segment_count());
        let mut mover = PathFollower::new(Fixed::from_num(speed) / Fixed::from_num(8));
        mover.set_route(Rc::new(built.route));

        let mut last = mover.progress();
        for _ in 0..ticks {
            let outcome = mover.update(dt());
            prop_assert!(mover.progress() >= last);
            prop_assert!(mover.progress() <= segments);
            last = mover.progress();
            if outcome == StepOutcome::Arrived {
                prop_assert_eq!(mover.progress(), segments);
                prop_assert_eq!(mover.state(), MoveState::Arrived);
                break;
            }
        }
    }

    /// Any axis-aligned route between edge cells validates, and its
    /// covered cells never overlap the tower sites.
    #[test]
    fn tower_sites_complement_route(row in 0i32..10, turn in 1i32..9) {
        let map = MapLayout::default();
        let points = [GridPos::new(0, row), GridPos::new(turn, row), GridPos::new(turn, 9)];
        let built = map.build_route(&points).unwrap();
        let sites = map.tower_sites(&built.cells);
        prop_assert!(built.cells.iter().all(|cell| !sites.contains(cell)));
        let distinct: std::collections::HashSet<_> = built.cells.iter().collect();
        prop_assert_eq!(sites.len() + distinct.len(), 100);
    }

    /// The same command stream always produces the same state, valid
    /// commands or not.
    #[test]
    fn command_streams_are_deterministic(
        waves in prop::collection::vec(arb_wave(), 1..3),
        commands in prop::collection::vec((arb_command(), 0u64..20), 0..12),
    ) {
        let data = scenario(waves);
        let result = verify_determinism(
            2,
            1,
            || Simulation::from_scenario(&data).unwrap(),
            |sim, _| {
                for (command, ticks) in &commands {
                    let _ = sim.apply(command.clone());
                    for _ in 0..*ticks {
                        sim.tick(dt());
                    }
                }
            },
            Simulation::state_hash,
        );
        prop_assert!(result.is_deterministic);
    }
}

#[test]
fn released_instances_are_parked_inactive() {
    let (mut pool, key) = enemy_pool();
    let enemy = pool
        .acquire(&key, Vec3Fixed::from_ints(1, 0, 1), Orientation::IDENTITY, None)
        .unwrap();
    pool.release(&key, enemy).unwrap();
    let idle = pool.peek_idle(&key).unwrap();
    assert!(!idle.is_active());
    assert!(!idle.is_alive());
}
