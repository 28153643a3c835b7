//! # TD Core
//!
//! Deterministic simulation core for a tower-defense game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! Presentation layers observe the core through [`signal::Signal`]s and
//! the per-tick [`simulation::TickEvents`]; they drive it through
//! [`simulation::Command`]s.
//!
//! ## Crate Structure
//!
//! - [`math`] - Fixed-point vectors and orientations
//! - [`signal`] - Observer lists and resettable properties
//! - [`pool`] - Keyed object recycling
//! - [`health`] - Damage, healing and death
//! - [`route`] - Grid layout, route validation and tower sites
//! - [`movement`] - Path following
//! - [`enemy`] - Mobile entities
//! - [`registry`] - Enemies in play
//! - [`targeting`] - Best-candidate target selection
//! - [`turret`] - Stationary attackers
//! - [`spawner`] - Wave and group scheduling
//! - [`data`] - RON scenario definitions
//! - [`simulation`] - Tick orchestrator

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod data;
pub mod enemy;
pub mod error;
pub mod health;
pub mod math;
pub mod movement;
pub mod pool;
pub mod registry;
pub mod route;
pub mod signal;
pub mod simulation;
pub mod spawner;
pub mod targeting;
pub mod turret;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::data::{EnemyData, ScenarioData, TurretData};
    pub use crate::enemy::{Departure, DepartureCause, Enemy, EnemyStats, EntityId};
    pub use crate::error::{Result, TdError};
    pub use crate::health::Health;
    pub use crate::math::{Fixed, Orientation, Vec3Fixed};
    pub use crate::movement::{MoveState, PathFollower};
    pub use crate::pool::{ParentScope, Pool, PoolConfig, PoolKey, Poolable};
    pub use crate::registry::EnemyRegistry;
    pub use crate::route::{GridPos, MapLayout, Route, RouteError};
    pub use crate::signal::{Property, Signal};
    pub use crate::simulation::{tick_duration, Command, Simulation, TickEvents, TICK_RATE};
    pub use crate::spawner::{GroupConfig, SpawnerEvent, StartTiming, WaveConfig};
    pub use crate::targeting::{select_target, ScoreAttribute, Scorable};
    pub use crate::turret::{FireEffect, Turret, TurretStats};
}
