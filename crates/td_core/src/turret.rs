//! Stationary turrets.
//!
//! Each tick a [`Turret`]:
//! 1. re-selects its target among enemies in range,
//! 2. turns its head toward the target, or back to rest once it has been
//!    idle for `reset_after_last_fire`,
//! 3. fires when at least `1 / attack_rate` has elapsed since the last shot
//!    and it has a target,
//! 4. switches its fire effect off once `fire_effect_duration` has elapsed.
//!
//! Damage is instant; there are no projectiles.

use serde::{Deserialize, Serialize};

use crate::enemy::EntityId;
use crate::math::{decimal_serde, time_reached, Fixed, Orientation, Vec3Fixed};
use crate::pool::{ParentScope, Placement, PoolKey, Poolable};
use crate::registry::EnemyRegistry;
use crate::signal::Signal;
use crate::targeting::{select_target, ScoreAttribute};

/// Identifier of a pooled turret instance.
pub type TurretId = u64;

/// Static numbers for one turret archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurretStats {
    /// Targeting radius on the ground plane.
    pub range: Fixed,
    /// Attribute used to rank candidates.
    pub focus: ScoreAttribute,
    /// Damage per shot.
    pub damage: Fixed,
    /// Shots per second.
    pub attack_rate: Fixed,
    /// Head turn interpolation factor per second.
    pub rotate_speed: Fixed,
    /// Idle time after which the head returns to rest.
    pub reset_after_last_fire: Fixed,
    /// How long the fire effect stays on after a shot.
    pub fire_effect_duration: Fixed,
    /// Height of the head above the base.
    pub head_height: Fixed,
}

impl TurretStats {
    /// Minimum time between shots, or `None` if the turret never fires.
    #[must_use]
    pub fn fire_interval(&self) -> Option<Fixed> {
        if self.attack_rate <= Fixed::ZERO {
            return None;
        }
        Fixed::ONE.checked_div(self.attack_rate)
    }
}

impl Default for TurretStats {
    fn default() -> Self {
        Self {
            range: Fixed::from_num(3),
            focus: ScoreAttribute::MoveProgress,
            damage: Fixed::from_num(10),
            attack_rate: Fixed::ONE,
            rotate_speed: Fixed::from_num(5),
            reset_after_last_fire: Fixed::from_num(2),
            fire_effect_duration: Fixed::from_num(0.25),
            head_height: Fixed::from_num(0.5),
        }
    }
}

/// State change of a turret's fire effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireEffect {
    /// Effect shown between the two points.
    On {
        /// Turret head.
        from: Vec3Fixed,
        /// Target body.
        to: Vec3Fixed,
    },
    /// Effect hidden.
    Off,
}

/// Report of one shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    /// Turret that fired.
    pub turret: TurretId,
    /// Enemy hit.
    pub target: EntityId,
    /// Damage dealt.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Whether this shot killed the target.
    pub killed: bool,
}

/// One turret instance.
#[derive(Debug)]
pub struct Turret {
    id: TurretId,
    kind: PoolKey,
    stats: TurretStats,
    position: Vec3Fixed,
    parent: ParentScope,
    active: bool,
    head: Orientation,
    wait_since_fire: Fixed,
    target: Option<EntityId>,
    effect_on: bool,
    /// Fired with the head orientation whenever it changes.
    pub on_rotate: Signal<Orientation>,
    /// Fired when the fire effect switches on or off.
    pub on_fire_effect: Signal<FireEffect>,
    /// Fired when the selected target changes.
    pub on_target_changed: Signal<Option<EntityId>>,
}

impl Turret {
    /// Create an inactive turret.
    #[must_use]
    pub fn new(id: TurretId, kind: PoolKey, stats: TurretStats) -> Self {
        Self {
            id,
            kind,
            stats,
            position: Vec3Fixed::ZERO,
            parent: ParentScope::default(),
            active: false,
            head: Orientation::IDENTITY,
            wait_since_fire: Fixed::ZERO,
            target: None,
            effect_on: false,
            on_rotate: Signal::new(),
            on_fire_effect: Signal::new(),
            on_target_changed: Signal::new(),
        }
    }

    /// Instance id.
    #[must_use]
    pub const fn id(&self) -> TurretId {
        self.id
    }

    /// Pool key this instance belongs to.
    #[must_use]
    pub fn kind(&self) -> &PoolKey {
        &self.kind
    }

    /// Archetype numbers.
    #[must_use]
    pub const fn stats(&self) -> &TurretStats {
        &self.stats
    }

    /// Base position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.position
    }

    /// Head position, where shots originate.
    #[must_use]
    pub fn head_position(&self) -> Vec3Fixed {
        self.position + Vec3Fixed::UP.scale(self.stats.head_height)
    }

    /// Head orientation.
    #[must_use]
    pub const fn head(&self) -> Orientation {
        self.head
    }

    /// Time since the last shot.
    #[must_use]
    pub const fn wait_since_fire(&self) -> Fixed {
        self.wait_since_fire
    }

    /// Currently selected target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether the fire effect is showing.
    #[must_use]
    pub const fn is_effect_on(&self) -> bool {
        self.effect_on
    }

    /// Presentation scope.
    #[must_use]
    pub const fn parent(&self) -> ParentScope {
        self.parent
    }

    /// Reset timers, target and head to their initial values.
    pub fn init_params(&mut self) {
        self.wait_since_fire = Fixed::ZERO;
        self.target = None;
        self.head = Orientation::IDENTITY;
        self.effect_on = false;
    }

    /// Run one tick against the enemies in `registry`.
    ///
    /// Returns the shot fired this tick, if any. A killing shot queues the
    /// target's departure through its own observers; the caller is
    /// responsible for draining it.
    pub fn update(&mut self, dt: Fixed, registry: &mut EnemyRegistry) -> Option<Shot> {
        self.find_target(registry);

        let aim = self
            .target
            .and_then(|id| registry.get(id))
            .map(crate::enemy::Enemy::body_position);

        if let Some(aim) = aim {
            let desired = Orientation::look_rotation(aim - self.head_position());
            self.turn_toward(desired, dt);
        } else if time_reached(self.wait_since_fire, self.stats.reset_after_last_fire) {
            self.turn_toward(Orientation::IDENTITY, dt);
        }

        self.wait_since_fire += dt;

        let mut shot = None;
        let ready = self
            .stats
            .fire_interval()
            .is_some_and(|interval| time_reached(self.wait_since_fire, interval));
        if let (true, Some(target), Some(aim)) = (ready, self.target, aim) {
            self.wait_since_fire = Fixed::ZERO;
            self.set_effect(FireEffect::On {
                from: self.head_position(),
                to: aim,
            });
            let killed = registry
                .get_mut(target)
                .and_then(|enemy| enemy.take_damage(self.stats.damage))
                .is_some();
            tracing::trace!(turret = self.id, target, killed, "Turret fired");
            shot = Some(Shot {
                turret: self.id,
                target,
                damage: self.stats.damage,
                killed,
            });
        }

        if time_reached(self.wait_since_fire, self.stats.fire_effect_duration) {
            self.set_effect(FireEffect::Off);
        }
        shot
    }

    fn find_target(&mut self, registry: &EnemyRegistry) {
        let target = select_target(
            self.position,
            self.stats.range,
            self.stats.focus,
            registry.iter().filter(|enemy| enemy.is_alive()),
        );
        if target != self.target {
            self.target = target;
            self.on_target_changed.emit(&target);
        }
    }

    fn turn_toward(&mut self, desired: Orientation, dt: Fixed) {
        let next = self.head.lerp(desired, dt.saturating_mul(self.stats.rotate_speed));
        if next != self.head {
            self.head = next;
            self.on_rotate.emit(&next);
        }
    }

    fn set_effect(&mut self, effect: FireEffect) {
        let on = matches!(effect, FireEffect::On { .. });
        // Off is only reported on a transition; every shot reports On.
        if !on && !self.effect_on {
            return;
        }
        self.effect_on = on;
        self.on_fire_effect.emit(&effect);
    }

    fn clear_observers(&mut self) {
        self.on_rotate.clear();
        self.on_fire_effect.clear();
        self.on_target_changed.clear();
    }
}

impl Poolable for Turret {
    fn activate(&mut self, placement: &Placement) {
        self.position = placement.position;
        self.parent = placement.parent;
        self.init_params();
        self.head = placement.orientation;
        self.active = true;
    }

    fn deactivate(&mut self, parent: ParentScope) {
        self.init_params();
        self.clear_observers();
        self.parent = parent;
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::enemy::{Enemy, EnemyStats};
    use crate::route::Route;

    fn f(n: f64) -> Fixed {
        Fixed::from_num(n)
    }

    const DT: f64 = 0.0625;

    fn stats() -> TurretStats {
        TurretStats {
            range: f(4.0),
            focus: ScoreAttribute::MoveProgress,
            damage: f(1.0),
            attack_rate: f(2.0),
            rotate_speed: f(4.0),
            reset_after_last_fire: f(1.0),
            fire_effect_duration: f(0.25),
            head_height: f(0.5),
        }
    }

    fn turret() -> Turret {
        let mut turret = Turret::new(1, PoolKey::new("gun"), stats());
        turret.activate(&Placement {
            position: Vec3Fixed::ZERO,
            orientation: Orientation::IDENTITY,
            parent: ParentScope::default(),
        });
        turret
    }

    fn registry_with(ids: &[(EntityId, i32)]) -> EnemyRegistry {
        let mut registry = EnemyRegistry::new();
        for &(id, x) in ids {
            let route = Route::from_points(vec![
                Vec3Fixed::from_ints(x, 0, 1),
                Vec3Fixed::from_ints(x, 0, 20),
            ])
            .unwrap();
            let stats = EnemyStats {
                max_health: f(100.0),
                speed: Fixed::ZERO,
                body_height: f(0.5),
            };
            let mut enemy = Enemy::new(id, PoolKey::new("grunt"), stats);
            enemy.spawn(Rc::new(route));
            registry.register(enemy);
        }
        registry
    }

    #[test]
    fn test_fires_at_attack_rate() {
        let mut turret = turret();
        let mut registry = registry_with(&[(10, 1)]);

        let shots: Vec<usize> = (1..=16)
            .filter(|_| turret.update(f(DT), &mut registry).is_some())
            .collect();

        // 2 shots per second; 16 ticks of 1/16 s.
        assert_eq!(shots, vec![8, 16]);
        let health = registry.get(10).unwrap().health().current();
        assert_eq!(health, f(98.0));
    }

    #[test]
    fn test_fire_rate_holds_at_common_tick_rates() {
        for rate in [16_u32, 20, 30, 60] {
            let mut turret = turret();
            let mut registry = registry_with(&[(10, 1)]);
            let dt = crate::simulation::tick_duration(rate);
            let shots: Vec<u32> = (1..=rate)
                .filter(|_| turret.update(dt, &mut registry).is_some())
                .collect();
            assert_eq!(shots, vec![rate / 2, rate], "tick rate {rate}");
        }
    }

    #[test]
    fn test_never_fires_without_target() {
        let mut turret = turret();
        let mut registry = EnemyRegistry::new();
        for _ in 0..40 {
            assert!(turret.update(f(DT), &mut registry).is_none());
        }
        assert!(turret.target().is_none());
        assert_eq!(turret.head(), Orientation::IDENTITY);
    }

    #[test]
    fn test_first_candidate_wins_ties() {
        let mut turret = turret();
        let mut registry = registry_with(&[(3, 1), (2, -1)]);
        turret.update(f(DT), &mut registry);
        assert_eq!(turret.target(), Some(3));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut turret = turret();
        let mut registry = registry_with(&[(3, 9)]);
        turret.update(f(DT), &mut registry);
        assert_eq!(turret.target(), None);
    }

    #[test]
    fn test_fire_effect_transitions() {
        let mut turret = turret();
        let mut registry = registry_with(&[(10, 1)]);
        let effects = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&effects);
        turret
            .on_fire_effect
            .subscribe(move |e| sink.borrow_mut().push(matches!(e, FireEffect::On { .. })));

        for _ in 0..16 {
            turret.update(f(DT), &mut registry);
        }

        // On at tick 8, off at tick 12, on again at tick 16.
        assert_eq!(*effects.borrow(), vec![true, false, true]);
        assert!(turret.is_effect_on());
    }

    #[test]
    fn test_head_turns_toward_target() {
        let mut turret = turret();
        let mut registry = registry_with(&[(10, 2)]);
        let before = turret.head().alignment(Orientation::look_rotation(Vec3Fixed::from_ints(1, 0, 0)));
        turret.update(f(DT), &mut registry);
        let after = turret.head().alignment(Orientation::look_rotation(Vec3Fixed::from_ints(1, 0, 0)));
        assert!(after > before);
    }

    #[test]
    fn test_returns_to_rest_after_idle() {
        let mut turret = turret();
        let mut registry = registry_with(&[(10, 2)]);
        for _ in 0..4 {
            turret.update(f(DT), &mut registry);
        }
        assert_ne!(turret.head(), Orientation::IDENTITY);

        registry.unregister(10);
        for _ in 0..64 {
            turret.update(f(DT), &mut registry);
        }
        let rest = turret.head().alignment(Orientation::IDENTITY);
        assert!(rest > f(0.99));
    }

    #[test]
    fn test_zero_attack_rate_never_fires() {
        let mut turret = Turret::new(
            2,
            PoolKey::new("gun"),
            TurretStats {
                attack_rate: Fixed::ZERO,
                ..stats()
            },
        );
        let mut registry = registry_with(&[(10, 1)]);
        for _ in 0..64 {
            assert!(turret.update(f(DT), &mut registry).is_none());
        }
    }

    #[test]
    fn test_deactivate_resets() {
        let mut turret = turret();
        let mut registry = registry_with(&[(10, 1)]);
        turret.on_rotate.subscribe(|_| {});
        for _ in 0..8 {
            turret.update(f(DT), &mut registry);
        }
        turret.deactivate(ParentScope(4));
        assert!(!turret.is_active());
        assert!(turret.target().is_none());
        assert_eq!(turret.wait_since_fire(), Fixed::ZERO);
        assert_eq!(turret.head(), Orientation::IDENTITY);
        assert!(turret.on_rotate.is_empty());
    }
}
