//! Complete scenario definition: map, route, archetypes and waves.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TdError};
use crate::math::Fixed;
use crate::route::{GridPos, MapLayout};
use crate::spawner::WaveConfig;

use super::{EnemyData, TurretData};

/// Data-driven scenario.
///
/// # Example RON
///
/// ```ron
/// ScenarioData(
///     name: "meadow",
///     map: MapLayout(cols: 10, rows: 10, cell_width: 1.0, cell_height: 1.0,
///                    hor_space: 0.5, ver_space: 0.5, thickness: 0.25),
///     waypoints: [(0, 5), (4, 5), (4, 9)],
///     enemies: [EnemyData(id: "grunt", max_health: 50.0, speed: 1.0)],
///     turrets: [],
///     waves: [WaveConfig(groups: [GroupConfig(kind: "grunt", count: 5, spawn_interval: 1.0)])],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// Display name.
    pub name: String,

    /// Grid dimensions and spacing.
    #[serde(default)]
    pub map: MapLayout,

    /// Route corners as grid cells, start first.
    pub waypoints: Vec<GridPos>,

    /// Enemy archetypes.
    #[serde(default)]
    pub enemies: Vec<EnemyData>,

    /// Turret archetypes.
    #[serde(default)]
    pub turrets: Vec<TurretData>,

    /// Waves in order.
    #[serde(default)]
    pub waves: Vec<WaveConfig>,
}

impl ScenarioData {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::DataParseError`] if the text is not a valid
    /// scenario.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| TdError::DataParseError(e.to_string()))
    }

    /// Check cross references and value ranges that parsing cannot.
    ///
    /// Route geometry is checked separately when the route is built.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.map.cols <= 0 || self.map.rows <= 0 {
            return Err(TdError::InvalidConfig(format!(
                "map must have at least one cell, got {}x{}",
                self.map.cols, self.map.rows
            )));
        }

        let mut enemy_ids = HashSet::new();
        for enemy in &self.enemies {
            if !enemy_ids.insert(enemy.id.as_str()) {
                return Err(TdError::InvalidConfig(format!("duplicate enemy '{}'", enemy.id)));
            }
            enemy.validate()?;
        }
        let mut turret_ids = HashSet::new();
        for turret in &self.turrets {
            if !turret_ids.insert(turret.id.as_str()) {
                return Err(TdError::InvalidConfig(format!("duplicate turret '{}'", turret.id)));
            }
            turret.validate()?;
        }

        // An unknown kind in a wave is tolerated at runtime (the group is
        // aborted), but a data file naming one is a mistake.
        for (w, wave) in self.waves.iter().enumerate() {
            if wave.start_delay < Fixed::ZERO {
                return Err(TdError::InvalidConfig(format!(
                    "wave {w} start_delay must not be negative, got {}",
                    wave.start_delay
                )));
            }
            for (g, group) in wave.groups.iter().enumerate() {
                if self.enemy(group.kind.as_str()).is_none() {
                    return Err(TdError::InvalidConfig(format!(
                        "wave {w} group {g} references unknown enemy '{}'",
                        group.kind
                    )));
                }
                if group.start_delay < Fixed::ZERO || group.spawn_interval < Fixed::ZERO {
                    return Err(TdError::InvalidConfig(format!(
                        "wave {w} group {g} delays must not be negative"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up an enemy archetype.
    #[must_use]
    pub fn enemy(&self, id: &str) -> Option<&EnemyData> {
        self.enemies.iter().find(|e| e.id.as_str() == id)
    }

    /// Look up a turret archetype.
    #[must_use]
    pub fn turret(&self, id: &str) -> Option<&TurretData> {
        self.turrets.iter().find(|t| t.id.as_str() == id)
    }
}
