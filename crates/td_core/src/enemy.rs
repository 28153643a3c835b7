//! Mobile entities walking the route.
//!
//! An [`Enemy`] composes [`Health`] and a [`PathFollower`]. It leaves play
//! (a *departure*) either when killed or when it reaches the final
//! waypoint; in both cases it announces itself once through
//! [`Enemy::on_departed`] and is then unregistered and pooled by the
//! simulation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::health::Health;
use crate::math::{Fixed, Orientation, Vec3Fixed};
use crate::movement::{PathFollower, StepOutcome};
use crate::pool::{ParentScope, Placement, PoolKey, Poolable};
use crate::route::Route;
use crate::signal::{Property, Signal};
use crate::targeting::{ScoreAttribute, Scorable};

/// Identifier of a pooled enemy instance.
///
/// Stable for the lifetime of the instance, across reuses.
pub type EntityId = u64;

/// Why an enemy left play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepartureCause {
    /// Health reached zero.
    Killed,
    /// Final waypoint reached.
    ReachedGoal,
}

/// Notification that an enemy left play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Instance that left.
    pub id: EntityId,
    /// Pool the instance returns to.
    pub kind: PoolKey,
    /// Why it left.
    pub cause: DepartureCause,
}

/// Static numbers for one enemy archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyStats {
    /// Maximum health.
    pub max_health: Fixed,
    /// Movement speed in units per second.
    pub speed: Fixed,
    /// Height of the body above the ground position; turrets aim here.
    pub body_height: Fixed,
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            max_health: Fixed::from_num(100),
            speed: Fixed::ONE,
            body_height: Fixed::from_num(0.5),
        }
    }
}

/// One enemy instance.
#[derive(Debug)]
pub struct Enemy {
    id: EntityId,
    kind: PoolKey,
    stats: EnemyStats,
    position: Vec3Fixed,
    orientation: Orientation,
    parent: ParentScope,
    active: bool,
    alive: bool,
    health: Health,
    mover: PathFollower,
    /// Fired once per life-cycle when the enemy leaves play.
    pub on_departed: Signal<Departure>,
}

impl Enemy {
    /// Create an inactive enemy.
    #[must_use]
    pub fn new(id: EntityId, kind: PoolKey, stats: EnemyStats) -> Self {
        Self {
            id,
            kind,
            stats,
            position: Vec3Fixed::ZERO,
            orientation: Orientation::IDENTITY,
            parent: ParentScope::default(),
            active: false,
            alive: false,
            health: Health::new(stats.max_health),
            mover: PathFollower::new(stats.speed),
            on_departed: Signal::new(),
        }
    }

    /// Instance id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Pool key this instance belongs to.
    #[must_use]
    pub fn kind(&self) -> &PoolKey {
        &self.kind
    }

    /// Archetype numbers.
    #[must_use]
    pub const fn stats(&self) -> &EnemyStats {
        &self.stats
    }

    /// Ground position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.position
    }

    /// Aim point above the ground position.
    #[must_use]
    pub fn body_position(&self) -> Vec3Fixed {
        self.position + Vec3Fixed::UP.scale(self.stats.body_height)
    }

    /// Current facing.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Presentation scope.
    #[must_use]
    pub const fn parent(&self) -> ParentScope {
        self.parent
    }

    /// Whether the enemy is still in play this life-cycle.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Health state.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Health state, for attaching observers.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Movement state.
    #[must_use]
    pub const fn mover(&self) -> &PathFollower {
        &self.mover
    }

    /// Movement state, for attaching observers.
    pub fn mover_mut(&mut self) -> &mut PathFollower {
        &mut self.mover
    }

    /// Put the enemy on `route` and start a new life-cycle.
    pub fn spawn(&mut self, route: Rc<Route>) {
        self.alive = true;
        self.mover.set_route(route);
        self.sync_pose();
    }

    /// Advance movement by `dt`. Returns the departure if the goal was reached.
    pub fn update(&mut self, dt: Fixed) -> Option<Departure> {
        if !self.alive {
            return None;
        }
        match self.mover.update(dt) {
            StepOutcome::Moved => {
                self.sync_pose();
                None
            }
            StepOutcome::Arrived => self.depart(DepartureCause::ReachedGoal),
            StepOutcome::Idle | StepOutcome::Skipped => None,
        }
    }

    /// Apply damage. Returns the departure if this hit killed the enemy.
    pub fn take_damage(&mut self, amount: Fixed) -> Option<Departure> {
        if self.health.apply_damage(amount) {
            return self.depart(DepartureCause::Killed);
        }
        None
    }

    /// Restore health.
    pub fn heal(&mut self, amount: Fixed) {
        self.health.apply_heal(amount);
    }

    fn sync_pose(&mut self) {
        self.position = self.mover.position();
        self.orientation = self.mover.orientation();
    }

    fn depart(&mut self, cause: DepartureCause) -> Option<Departure> {
        if !self.alive {
            return None;
        }
        self.alive = false;
        let departure = Departure {
            id: self.id,
            kind: self.kind.clone(),
            cause,
        };
        tracing::debug!(id = self.id, kind = %self.kind, ?cause, "Enemy departed");
        self.on_departed.emit(&departure);
        Some(departure)
    }

    fn reset_properties(&mut self) {
        self.health.reset();
        self.mover.reset_value();
        self.mover.clear_observers();
        self.on_departed.clear();
        self.alive = false;
    }
}

impl Poolable for Enemy {
    fn activate(&mut self, placement: &Placement) {
        self.position = placement.position;
        self.orientation = placement.orientation;
        self.parent = placement.parent;
        self.active = true;
    }

    fn deactivate(&mut self, parent: ParentScope) {
        self.reset_properties();
        self.parent = parent;
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Scorable for Enemy {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn ground_position(&self) -> Vec3Fixed {
        self.position.ground()
    }

    fn score(&self, attribute: ScoreAttribute) -> Fixed {
        match attribute {
            ScoreAttribute::MoveProgress => self.mover.progress(),
            ScoreAttribute::HealthPoints => self.health.current(),
            ScoreAttribute::MoveSpeed => self.mover.speed(),
        }
    }
}

/// Shared inbox of departures, fed by listeners attached at spawn time.
///
/// Single-threaded by construction; clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct DepartureQueue {
    inner: Rc<RefCell<VecDeque<Departure>>>,
}

impl DepartureQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer that pushes every departure into this queue.
    pub fn listener(&self) -> impl FnMut(&Departure) + 'static {
        let inner = Rc::clone(&self.inner);
        move |departure| inner.borrow_mut().push_back(departure.clone())
    }

    /// Pop the oldest departure.
    pub fn pop(&self) -> Option<Departure> {
        self.inner.borrow_mut().pop_front()
    }

    /// Number of queued departures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MoveState;

    fn f(n: f64) -> Fixed {
        Fixed::from_num(n)
    }

    fn route() -> Rc<Route> {
        Rc::new(
            Route::from_points(vec![Vec3Fixed::from_ints(0, 0, 0), Vec3Fixed::from_ints(2, 0, 0)])
                .unwrap(),
        )
    }

    fn enemy() -> Enemy {
        let stats = EnemyStats {
            max_health: f(10.0),
            speed: f(1.0),
            body_height: f(0.5),
        };
        let mut enemy = Enemy::new(7, PoolKey::new("blue"), stats);
        enemy.activate(&Placement {
            position: Vec3Fixed::ZERO,
            orientation: Orientation::IDENTITY,
            parent: ParentScope(1),
        });
        enemy.spawn(route());
        enemy
    }

    #[test]
    fn test_spawn_places_on_route_start() {
        let enemy = enemy();
        assert!(enemy.is_alive());
        assert_eq!(enemy.position(), Vec3Fixed::ZERO);
        assert_eq!(
            enemy.orientation(),
            Orientation::look_rotation(Vec3Fixed::from_ints(1, 0, 0))
        );
        assert_eq!(enemy.body_position().y, f(0.5));
    }

    #[test]
    fn test_kill_departs_once() {
        let mut enemy = enemy();
        let queue = DepartureQueue::new();
        enemy.on_departed.subscribe(queue.listener());

        assert!(enemy.take_damage(f(4.0)).is_none());
        let departure = enemy.take_damage(f(6.0)).unwrap();
        assert_eq!(departure.cause, DepartureCause::Killed);
        assert!(enemy.take_damage(f(6.0)).is_none());

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().id, 7);
    }

    #[test]
    fn test_reaching_goal_departs() {
        let mut enemy = enemy();
        assert!(enemy.update(f(1.0)).is_none());
        let departure = enemy.update(f(1.0)).unwrap();
        assert_eq!(departure.cause, DepartureCause::ReachedGoal);
        assert!(!enemy.is_alive());
        assert!(enemy.update(f(1.0)).is_none());
    }

    #[test]
    fn test_dead_enemy_does_not_move() {
        let mut enemy = enemy();
        enemy.take_damage(f(100.0));
        enemy.update(f(1.0));
        assert_eq!(enemy.position(), Vec3Fixed::ZERO);
    }

    #[test]
    fn test_deactivate_resets_for_next_life() {
        let mut enemy = enemy();
        enemy.on_departed.subscribe(|_| {});
        enemy.health_mut().on_health_changed.subscribe(|_| {});
        enemy.mover_mut().on_move.subscribe(|_| {});
        enemy.update(f(0.5));
        enemy.take_damage(f(3.0));

        enemy.deactivate(ParentScope(9));

        assert!(!enemy.is_active());
        assert!(!enemy.is_alive());
        assert_eq!(enemy.parent(), ParentScope(9));
        assert_eq!(enemy.health().current(), f(10.0));
        assert_eq!(enemy.mover().state(), MoveState::Idle);
        assert!(enemy.on_departed.is_empty());
        assert!(enemy.health().on_health_changed.is_empty());
        assert!(enemy.mover().on_move.is_empty());
    }

    #[test]
    fn test_scores() {
        let mut enemy = enemy();
        enemy.update(f(0.5));
        enemy.take_damage(f(2.5));
        assert_eq!(enemy.score(ScoreAttribute::MoveProgress), f(0.25));
        assert_eq!(enemy.score(ScoreAttribute::HealthPoints), f(7.5));
        assert_eq!(enemy.score(ScoreAttribute::MoveSpeed), f(1.0));
    }
}
