//! Turret archetype definitions.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{decimal_serde, Fixed};
use crate::pool::{PoolConfig, PoolKey};
use crate::targeting::ScoreAttribute;
use crate::turret::TurretStats;

use super::{require_non_negative, require_positive};

/// Data-driven turret archetype.
///
/// # Example RON
///
/// ```ron
/// TurretData(
///     id: "turret_laser",
///     range: 3.0,
///     focus: MoveProgress,
///     damage: 20.0,
///     attack_rate: 2.0,
///     rotate_speed: 8.0,
///     reset_after_last_fire: 1.5,
///     fire_effect_duration: 0.1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurretData {
    /// Pool key, used by build commands.
    pub id: PoolKey,

    /// Targeting radius.
    #[serde(with = "decimal_serde")]
    pub range: Fixed,

    /// Ranking attribute.
    #[serde(default)]
    pub focus: ScoreAttribute,

    /// Damage per shot.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,

    /// Shots per second.
    #[serde(with = "decimal_serde")]
    pub attack_rate: Fixed,

    /// Head turn factor per second.
    #[serde(with = "decimal_serde")]
    pub rotate_speed: Fixed,

    /// Idle time before the head returns to rest.
    #[serde(with = "decimal_serde")]
    pub reset_after_last_fire: Fixed,

    /// Fire effect visibility after a shot.
    #[serde(with = "decimal_serde")]
    pub fire_effect_duration: Fixed,

    /// Head height above the base.
    #[serde(with = "decimal_serde", default = "default_head_height")]
    pub head_height: Fixed,

    /// Pool sizing.
    #[serde(default = "default_pool")]
    pub pool: PoolConfig,
}

fn default_head_height() -> Fixed {
    Fixed::from_num(0.5)
}

const fn default_pool() -> PoolConfig {
    PoolConfig::with_capacity(8)
}

impl TurretData {
    /// Runtime numbers for this archetype.
    #[must_use]
    pub fn stats(&self) -> TurretStats {
        TurretStats {
            range: self.range,
            focus: self.focus,
            damage: self.damage,
            attack_rate: self.attack_rate,
            rotate_speed: self.rotate_speed,
            reset_after_last_fire: self.reset_after_last_fire,
            fire_effect_duration: self.fire_effect_duration,
            head_height: self.head_height,
        }
    }

    /// Check that the numbers describe a usable turret.
    ///
    /// A zero attack rate is allowed and never fires.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::InvalidConfig`](crate::error::TdError::InvalidConfig)
    /// naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        require_positive(id, "range", self.range)?;
        require_non_negative(id, "damage", self.damage)?;
        require_non_negative(id, "attack_rate", self.attack_rate)?;
        require_non_negative(id, "rotate_speed", self.rotate_speed)?;
        require_non_negative(id, "reset_after_last_fire", self.reset_after_last_fire)?;
        require_non_negative(id, "fire_effect_duration", self.fire_effect_duration)?;
        require_non_negative(id, "head_height", self.head_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TdError;

    fn gun() -> TurretData {
        ron::from_str(
            r#"TurretData(id: "gun", range: 3.0, damage: 5.0, attack_rate: 2.0,
                          rotate_speed: 6.0, reset_after_last_fire: 1.0,
                          fire_effect_duration: 0.25)"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_with_defaults() {
        let data = gun();
        assert_eq!(data.focus, ScoreAttribute::default());
        assert_eq!(data.head_height, Fixed::from_num(0.5));
        assert_eq!(data.pool.capacity, 8);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_zero_attack_rate_is_valid() {
        let data = TurretData {
            attack_rate: Fixed::ZERO,
            ..gun()
        };
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let bad = [
            TurretData { range: Fixed::ZERO, ..gun() },
            TurretData { range: Fixed::from_num(-3), ..gun() },
            TurretData { damage: Fixed::from_num(-5), ..gun() },
            TurretData { attack_rate: Fixed::from_num(-2), ..gun() },
            TurretData { fire_effect_duration: Fixed::from_num(-0.25), ..gun() },
        ];
        for data in bad {
            assert!(matches!(data.validate(), Err(TdError::InvalidConfig(_))), "{data:?}");
        }
    }
}
