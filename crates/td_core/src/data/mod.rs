//! Data structures for scenario configuration.
//!
//! Pure data types deserialised from RON. Authored numbers are plain
//! decimals and are converted to [`Fixed`](crate::math::Fixed) once here.
//!
//! **Note:** This module performs no IO. [`ScenarioData::from_ron_str`]
//! parses text handed to it; file loading is the caller's job.

mod enemy_data;
mod scenario_data;
mod turret_data;

use crate::error::{Result, TdError};
use crate::math::Fixed;

pub use enemy_data::EnemyData;
pub use scenario_data::ScenarioData;
pub use turret_data::TurretData;

/// Reject `value` unless it is greater than zero.
fn require_positive(owner: &str, field: &str, value: Fixed) -> Result<()> {
    if value > Fixed::ZERO {
        Ok(())
    } else {
        Err(TdError::InvalidConfig(format!(
            "'{owner}' {field} must be greater than zero, got {value}"
        )))
    }
}

/// Reject `value` if it is negative.
fn require_non_negative(owner: &str, field: &str, value: Fixed) -> Result<()> {
    if value >= Fixed::ZERO {
        Ok(())
    } else {
        Err(TdError::InvalidConfig(format!(
            "'{owner}' {field} must not be negative, got {value}"
        )))
    }
}
