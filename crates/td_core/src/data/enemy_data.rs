//! Enemy archetype definitions.

use serde::{Deserialize, Serialize};

use crate::enemy::EnemyStats;
use crate::error::Result;
use crate::math::{decimal_serde, Fixed};
use crate::pool::{PoolConfig, PoolKey};

use super::{require_non_negative, require_positive};

/// Data-driven enemy archetype.
///
/// # Example RON
///
/// ```ron
/// EnemyData(
///     id: "enemy_blue_sphere",
///     max_health: 100.0,
///     speed: 1.5,
///     body_height: 0.5,
///     pool: PoolConfig(capacity: 20, prewarm: true),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Pool key, referenced by wave groups.
    pub id: PoolKey,

    /// Maximum health.
    #[serde(with = "decimal_serde")]
    pub max_health: Fixed,

    /// Movement speed in units per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,

    /// Aim point height above the ground.
    #[serde(with = "decimal_serde", default = "default_body_height")]
    pub body_height: Fixed,

    /// Pool sizing.
    #[serde(default = "default_pool")]
    pub pool: PoolConfig,
}

fn default_body_height() -> Fixed {
    Fixed::from_num(0.5)
}

const fn default_pool() -> PoolConfig {
    PoolConfig::with_capacity(20)
}

impl EnemyData {
    /// Runtime numbers for this archetype.
    #[must_use]
    pub fn stats(&self) -> EnemyStats {
        EnemyStats {
            max_health: self.max_health,
            speed: self.speed,
            body_height: self.body_height,
        }
    }

    /// Check that the numbers describe an enemy that can reach the exit.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::InvalidConfig`](crate::error::TdError::InvalidConfig)
    /// naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        require_positive(id, "max_health", self.max_health)?;
        require_positive(id, "speed", self.speed)?;
        require_non_negative(id, "body_height", self.body_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TdError;

    #[test]
    fn test_parse_with_defaults() {
        let data: EnemyData =
            ron::from_str(r#"EnemyData(id: "grunt", max_health: 40.0, speed: 2.5)"#).unwrap();
        assert_eq!(data.id, PoolKey::new("grunt"));
        assert_eq!(data.stats().speed, Fixed::from_num(2.5));
        assert_eq!(data.body_height, Fixed::from_num(0.5));
        assert_eq!(data.pool.capacity, 20);
        assert!(!data.pool.prewarm);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let base: EnemyData =
            ron::from_str(r#"EnemyData(id: "grunt", max_health: 40.0, speed: 2.5)"#).unwrap();

        for speed in [-2.0, 0.0] {
            let data = EnemyData {
                speed: Fixed::from_num(speed),
                ..base.clone()
            };
            let err = data.validate().unwrap_err();
            assert!(err.to_string().contains("speed"), "{err}");
        }
        for health in [-1.0, 0.0] {
            let data = EnemyData {
                max_health: Fixed::from_num(health),
                ..base.clone()
            };
            assert!(matches!(data.validate(), Err(TdError::InvalidConfig(_))));
        }
        let sunk = EnemyData {
            body_height: Fixed::from_num(-0.5),
            ..base
        };
        assert!(matches!(sunk.validate(), Err(TdError::InvalidConfig(_))));
    }
}
