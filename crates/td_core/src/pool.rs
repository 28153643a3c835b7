//! Keyed object recycling.
//!
//! Enemies and turrets are never constructed or dropped directly by the
//! simulation. They are taken from a [`Pool`] and handed back to it, which
//! keeps allocation flat during long waves.
//!
//! Each key owns a bounded stack of idle instances and a factory:
//! - `acquire` reuses the most recently released idle instance, or asks
//!   the factory for a fresh one when none is idle;
//! - `release` parks the instance unless the key is already holding
//!   `capacity` idle instances, in which case the instance is dropped.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TdError};
use crate::math::{Orientation, Vec3Fixed};

/// Identifier of a pooled entity type (e.g. `"enemy_blue_sphere"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolKey(String);

impl PoolKey {
    /// Create a key from its string form.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// String form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Presentation container an instance is attached to.
///
/// The core never interprets it; it is carried so the presentation layer
/// can group instances (all enemies under one node, idle ones elsewhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ParentScope(pub u32);

/// Where an acquired instance is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// World position.
    pub position: Vec3Fixed,
    /// Facing.
    pub orientation: Orientation,
    /// Container scope.
    pub parent: ParentScope,
}

/// Anything that can live in a [`Pool`].
pub trait Poolable {
    /// Bring the instance into play at `placement`.
    fn activate(&mut self, placement: &Placement);

    /// Take the instance out of play and park it under `parent`.
    fn deactivate(&mut self, parent: ParentScope);

    /// Whether the instance is currently in play.
    fn is_active(&self) -> bool;
}

/// Factory used when a key has no idle instance.
pub type Factory<T> = Box<dyn FnMut(&Placement) -> T>;

/// Per-key pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of idle instances kept.
    pub capacity: usize,
    /// Fill the pool to capacity at registration.
    #[serde(default)]
    pub prewarm: bool,
    /// Scope idle instances are parked under, and the default scope for
    /// acquisitions that do not name one.
    #[serde(default)]
    pub parent: ParentScope,
}

impl PoolConfig {
    /// Create a config with the given capacity and no prewarming.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            prewarm: false,
            parent: ParentScope(0),
        }
    }
}

/// Counters kept per key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Instances produced by the factory.
    pub created: u64,
    /// Acquisitions served from the idle stack.
    pub reused: u64,
    /// Releases that parked the instance.
    pub recycled: u64,
    /// Releases that dropped the instance because the pool was full.
    pub discarded: u64,
}

/// What happened to a released instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Instance parked for reuse.
    Recycled,
    /// Pool was full; instance dropped.
    Discarded,
}

struct PoolEntry<T> {
    idle: Vec<T>,
    config: PoolConfig,
    factory: Factory<T>,
    stats: PoolStats,
}

/// Keyed pool of reusable instances.
pub struct Pool<K, T> {
    entries: HashMap<K, PoolEntry<T>>,
}

impl<K, T> Pool<K, T>
where
    K: Eq + Hash + Clone + fmt::Display,
    T: Poolable,
{
    /// Create a pool with no registered keys.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a key with its factory.
    ///
    /// With [`PoolConfig::prewarm`] set, `capacity` idle instances are
    /// created immediately.
    pub fn register(&mut self, key: K, config: PoolConfig, factory: Factory<T>) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(TdError::DuplicatePoolKey(key.to_string()));
        }

        let mut entry = PoolEntry {
            idle: Vec::with_capacity(config.capacity),
            config,
            factory,
            stats: PoolStats::default(),
        };

        if config.prewarm {
            let placement = Placement {
                position: Vec3Fixed::ZERO,
                orientation: Orientation::IDENTITY,
                parent: config.parent,
            };
            for _ in 0..config.capacity {
                let mut instance = (entry.factory)(&placement);
                instance.deactivate(config.parent);
                entry.idle.push(instance);
            }
            entry.stats.created += config.capacity as u64;
        }

        tracing::debug!(
            key = %key,
            capacity = config.capacity,
            prewarmed = entry.idle.len(),
            "Registered pool"
        );
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Take an instance for `key`, placed and active.
    ///
    /// `parent = None` uses the key's configured scope.
    pub fn acquire(
        &mut self,
        key: &K,
        position: Vec3Fixed,
        orientation: Orientation,
        parent: Option<ParentScope>,
    ) -> Result<T> {
        let Some(entry) = self.entries.get_mut(key) else {
            tracing::error!(key = %key, "No such pool");
            return Err(TdError::UnknownPoolKey(key.to_string()));
        };

        let placement = Placement {
            position,
            orientation,
            parent: parent.unwrap_or(entry.config.parent),
        };

        let mut instance = match entry.idle.pop() {
            Some(instance) => {
                entry.stats.reused += 1;
                instance
            }
            None => {
                entry.stats.created += 1;
                (entry.factory)(&placement)
            }
        };
        instance.activate(&placement);
        Ok(instance)
    }

    /// Hand an instance back.
    ///
    /// A full pool drops the instance; that is reported through the
    /// returned [`ReleaseOutcome`], not as an error.
    pub fn release(&mut self, key: &K, mut instance: T) -> Result<ReleaseOutcome> {
        let Some(entry) = self.entries.get_mut(key) else {
            tracing::error!(key = %key, "No such pool");
            return Err(TdError::UnknownPoolKey(key.to_string()));
        };

        if entry.idle.len() >= entry.config.capacity {
            tracing::debug!(key = %key, "Pool is full, discarding instance");
            entry.stats.discarded += 1;
            return Ok(ReleaseOutcome::Discarded);
        }

        instance.deactivate(entry.config.parent);
        entry.idle.push(instance);
        entry.stats.recycled += 1;
        Ok(ReleaseOutcome::Recycled)
    }

    /// Check if a key is registered.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of idle instances for `key` (0 if unregistered).
    #[must_use]
    pub fn idle_count(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.idle.len())
    }

    /// Configured capacity for `key`.
    #[must_use]
    pub fn capacity(&self, key: &K) -> Option<usize> {
        self.entries.get(key).map(|entry| entry.config.capacity)
    }

    /// Counters for `key`.
    #[must_use]
    pub fn stats(&self, key: &K) -> Option<PoolStats> {
        self.entries.get(key).map(|entry| entry.stats)
    }

    /// Peek at the idle instance that the next `acquire` would return.
    #[must_use]
    pub fn peek_idle(&self, key: &K) -> Option<&T> {
        self.entries.get(key).and_then(|entry| entry.idle.last())
    }
}

impl<K, T> Default for Pool<K, T>
where
    K: Eq + Hash + Clone + fmt::Display,
    T: Poolable,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, T> fmt::Debug for Pool<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, entry) in &self.entries {
            map.entry(key, &(entry.idle.len(), entry.config.capacity));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    #[derive(Debug)]
    struct Crate {
        serial: u32,
        active: bool,
        placement: Option<Placement>,
        parent: ParentScope,
    }

    impl Poolable for Crate {
        fn activate(&mut self, placement: &Placement) {
            self.active = true;
            self.placement = Some(*placement);
            self.parent = placement.parent;
        }

        fn deactivate(&mut self, parent: ParentScope) {
            self.active = false;
            self.parent = parent;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn counting_factory() -> Factory<Crate> {
        let mut serial = 0;
        Box::new(move |_placement: &Placement| {
            serial += 1;
            Crate {
                serial,
                active: true,
                placement: None,
                parent: ParentScope::default(),
            }
        })
    }

    fn key() -> PoolKey {
        PoolKey::new("crate")
    }

    fn pool(capacity: usize) -> Pool<PoolKey, Crate> {
        let mut pool = Pool::new();
        pool.register(key(), PoolConfig::with_capacity(capacity), counting_factory())
            .unwrap();
        pool
    }

    fn at(x: i32) -> Vec3Fixed {
        Vec3Fixed::from_ints(x, 0, 0)
    }

    #[test]
    fn test_acquire_unknown_key_fails() {
        let mut pool = pool(2);
        let result = pool.acquire(&PoolKey::new("nope"), at(0), Orientation::IDENTITY, None);
        assert!(matches!(result, Err(TdError::UnknownPoolKey(k)) if k == "nope"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut pool = pool(2);
        let result = pool.register(key(), PoolConfig::with_capacity(1), counting_factory());
        assert!(matches!(result, Err(TdError::DuplicatePoolKey(_))));
    }

    #[test]
    fn test_empty_pool_creates_fresh_instances() {
        let mut pool = pool(2);
        let a = pool.acquire(&key(), at(1), Orientation::IDENTITY, None).unwrap();
        let b = pool.acquire(&key(), at(2), Orientation::IDENTITY, None).unwrap();

        assert_ne!(a.serial, b.serial);
        assert!(a.is_active());
        assert_eq!(pool.stats(&key()).unwrap().created, 2);
    }

    #[test]
    fn test_round_trip_returns_latest_release() {
        let mut pool = pool(4);
        let a = pool.acquire(&key(), at(1), Orientation::IDENTITY, None).unwrap();
        let b = pool.acquire(&key(), at(2), Orientation::IDENTITY, None).unwrap();
        let b_serial = b.serial;

        pool.release(&key(), a).unwrap();
        pool.release(&key(), b).unwrap();

        let facing = Orientation::look_rotation(at(1));
        let again = pool.acquire(&key(), at(9), facing, None).unwrap();
        assert_eq!(again.serial, b_serial);
        assert!(again.is_active());
        let placement = again.placement.unwrap();
        assert_eq!(placement.position, at(9));
        assert_eq!(placement.orientation, facing);
    }

    #[test]
    fn test_release_beyond_capacity_discards() {
        let mut pool = pool(2);
        let instances: Vec<_> = (0..5)
            .map(|i| pool.acquire(&key(), at(i), Orientation::IDENTITY, None).unwrap())
            .collect();

        let outcomes: Vec<_> = instances
            .into_iter()
            .map(|c| pool.release(&key(), c).unwrap())
            .collect();

        assert_eq!(
            outcomes,
            vec![
                ReleaseOutcome::Recycled,
                ReleaseOutcome::Recycled,
                ReleaseOutcome::Discarded,
                ReleaseOutcome::Discarded,
                ReleaseOutcome::Discarded,
            ]
        );
        assert_eq!(pool.idle_count(&key()), 2);
        assert_eq!(pool.stats(&key()).unwrap().discarded, 3);
    }

    #[test]
    fn test_released_instances_are_inactive() {
        let mut pool = pool(2);
        let c = pool.acquire(&key(), at(0), Orientation::IDENTITY, None).unwrap();
        pool.release(&key(), c).unwrap();
        assert!(!pool.peek_idle(&key()).unwrap().is_active());
    }

    #[test]
    fn test_prewarm_fills_to_capacity() {
        let mut pool: Pool<PoolKey, Crate> = Pool::new();
        let config = PoolConfig {
            capacity: 3,
            prewarm: true,
            parent: ParentScope(7),
        };
        pool.register(key(), config, counting_factory()).unwrap();

        assert_eq!(pool.idle_count(&key()), 3);
        assert_eq!(pool.peek_idle(&key()).unwrap().parent, ParentScope(7));

        let c = pool.acquire(&key(), at(0), Orientation::IDENTITY, None).unwrap();
        assert_eq!(c.parent, ParentScope(7));
        assert_eq!(pool.stats(&key()).unwrap().reused, 1);
    }

    #[test]
    fn test_explicit_parent_overrides_default() {
        let mut pool = pool(1);
        let c = pool
            .acquire(&key(), at(0), Orientation::IDENTITY, Some(ParentScope(3)))
            .unwrap();
        assert_eq!(c.parent, ParentScope(3));
        assert_eq!(c.placement.unwrap().position.x, Fixed::ZERO);
    }

    #[test]
    fn test_release_unknown_key_fails() {
        let mut pool = pool(1);
        let c = pool.acquire(&key(), at(0), Orientation::IDENTITY, None).unwrap();
        assert!(pool.release(&PoolKey::new("other"), c).is_err());
    }
}
