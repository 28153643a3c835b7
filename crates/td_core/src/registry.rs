//! Ordered collection of enemies currently in play.
//!
//! Iteration order is registration order. Targeting relies on it to break
//! score ties deterministically, so removal preserves the order of the
//! remaining entries.

use crate::enemy::{EntityId, Enemy};

/// Enemies in play, in spawn order.
#[derive(Debug, Default)]
pub struct EnemyRegistry {
    enemies: Vec<Enemy>,
}

impl EnemyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an enemy. An instance with the same id is replaced in place.
    pub fn register(&mut self, enemy: Enemy) {
        if let Some(slot) = self.enemies.iter_mut().find(|e| e.id() == enemy.id()) {
            tracing::warn!(id = enemy.id(), "Enemy registered twice, replacing");
            *slot = enemy;
            return;
        }
        self.enemies.push(enemy);
    }

    /// Remove and return the enemy with `id`.
    pub fn unregister(&mut self, id: EntityId) -> Option<Enemy> {
        let index = self.enemies.iter().position(|e| e.id() == id)?;
        Some(self.enemies.remove(index))
    }

    /// Look up an enemy.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id() == id)
    }

    /// Look up an enemy mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id() == id)
    }

    /// Check whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter()
    }

    /// Iterate mutably in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.enemies.iter_mut()
    }

    /// Registered ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.enemies.iter().map(Enemy::id).collect()
    }

    /// Number of registered enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Check if no enemy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyStats;
    use crate::pool::PoolKey;

    fn enemy(id: EntityId) -> Enemy {
        Enemy::new(id, PoolKey::new("grunt"), EnemyStats::default())
    }

    #[test]
    fn test_registration_order_is_kept_across_removal() {
        let mut registry = EnemyRegistry::new();
        for id in [4, 1, 9, 2] {
            registry.register(enemy(id));
        }

        let removed = registry.unregister(1).unwrap();
        assert_eq!(removed.id(), 1);
        assert_eq!(registry.ids(), vec![4, 9, 2]);
        assert!(registry.unregister(1).is_none());
    }

    #[test]
    fn test_double_register_replaces() {
        let mut registry = EnemyRegistry::new();
        registry.register(enemy(3));
        registry.register(enemy(5));
        registry.register(enemy(3));
        assert_eq!(registry.ids(), vec![3, 5]);
    }

    #[test]
    fn test_lookup() {
        let mut registry = EnemyRegistry::new();
        registry.register(enemy(8));
        assert!(registry.contains(8));
        assert!(registry.get_mut(8).is_some());
        assert!(registry.get(2).is_none());
        assert_eq!(registry.len(), 1);
    }
}
