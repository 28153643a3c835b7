//! Tick orchestrator.
//!
//! The [`Simulation`] owns every piece of game state and advances it in a
//! fixed order each tick, so that identical command streams always produce
//! identical states.
//!
//! # System Execution Order
//!
//! 1. **Movement** - every registered enemy walks its route
//! 2. **Departures** - enemies that arrived are unregistered and pooled
//! 3. **Combat** - turrets in build order scan, turn and fire; a kill is
//!    processed before the next turret scans
//! 4. **Spawning** - wave and group tasks advance; new enemies first move
//!    on the next tick

use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::data::ScenarioData;
use crate::enemy::{Departure, DepartureCause, DepartureQueue, Enemy, EnemyStats, EntityId};
use crate::error::{Result, TdError};
use crate::math::{Fixed, Orientation, Vec3Fixed};
use crate::pool::{ParentScope, Placement, Pool, PoolConfig, PoolKey};
use crate::registry::EnemyRegistry;
use crate::route::{GridPos, MapLayout, Route};
use crate::spawner::{SpawnContext, Spawner, SpawnerEvent, WaveConfig};
use crate::turret::{Shot, Turret, TurretId, TurretStats};

/// Default simulation ticks per second.
pub const TICK_RATE: u32 = 16;

/// Scope active enemies are attached to.
pub const ENEMY_SCOPE: ParentScope = ParentScope(1);

/// Scope active turrets are attached to.
pub const TURRET_SCOPE: ParentScope = ParentScope(2);

/// Highest supported tick rate.
pub const MAX_TICK_RATE: u32 = 1000;

/// Duration of one tick at `rate` ticks per second.
///
/// The rate is clamped to `1..=MAX_TICK_RATE`.
#[must_use]
pub fn tick_duration(rate: u32) -> Fixed {
    Fixed::ONE / Fixed::from_num(rate.clamp(1, MAX_TICK_RATE))
}

/// External command applied between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Start wave `n`.
    StartWave(usize),
    /// Start the lowest wave not yet started.
    StartNextWave,
    /// Place a turret of `kind` on a tower site.
    BuildTurret {
        /// Turret pool key.
        kind: PoolKey,
        /// Target cell.
        site: GridPos,
    },
    /// Remove the turret on a tower site.
    RecycleTurret {
        /// Occupied cell.
        site: GridPos,
    },
    /// Stop the run.
    Quit,
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickEvents {
    /// Tick number after this step.
    pub tick: u64,
    /// Spawner lifecycle events.
    pub spawner: Vec<SpawnerEvent>,
    /// Enemies that entered play.
    pub spawned: Vec<EntityId>,
    /// Shots fired.
    pub shots: Vec<Shot>,
    /// Enemies that left play.
    pub departures: Vec<Departure>,
}

impl TickEvents {
    /// Check if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawner.is_empty()
            && self.spawned.is_empty()
            && self.shots.is_empty()
            && self.departures.is_empty()
    }
}

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SimStats {
    /// Enemies spawned.
    pub spawned: u64,
    /// Enemies killed by turrets.
    pub killed: u64,
    /// Enemies that reached the final waypoint.
    pub leaked: u64,
    /// Shots fired.
    pub shots: u64,
}

/// A turret standing on a tower site.
#[derive(Debug)]
pub struct PlacedTurret {
    /// Occupied cell.
    pub site: GridPos,
    /// The turret.
    pub turret: Turret,
}

/// The tower-defense simulation.
pub struct Simulation {
    tick: u64,
    elapsed: Fixed,
    layout: MapLayout,
    route: Rc<Route>,
    route_cells: Vec<GridPos>,
    tower_sites: Vec<GridPos>,
    enemy_pool: Pool<PoolKey, Enemy>,
    turret_pool: Pool<PoolKey, Turret>,
    registry: EnemyRegistry,
    turrets: Vec<PlacedTurret>,
    spawner: Spawner,
    departures: DepartureQueue,
    next_enemy_id: Rc<Cell<EntityId>>,
    next_turret_id: Rc<Cell<TurretId>>,
    stats: SimStats,
    quit_requested: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("enemies", &self.registry.len())
            .field("turrets", &self.turrets.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create a simulation on `layout` with a route through `waypoints`.
    ///
    /// No enemy or turret kind is registered yet.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::InvalidRoute`] if the waypoints do not form a
    /// valid route on the grid.
    pub fn new(layout: MapLayout, waypoints: &[GridPos], waves: Vec<WaveConfig>) -> Result<Self> {
        let built = layout.build_route(waypoints)?;
        let tower_sites = layout.tower_sites(&built.cells);
        tracing::info!(
            waypoints = built.waypoints.len(),
            route_cells = built.cells.len(),
            tower_sites = tower_sites.len(),
            waves = waves.len(),
            "Simulation created"
        );
        Ok(Self {
            tick: 0,
            elapsed: Fixed::ZERO,
            layout,
            route: Rc::new(built.route),
            route_cells: built.cells,
            tower_sites,
            enemy_pool: Pool::new(),
            turret_pool: Pool::new(),
            registry: EnemyRegistry::new(),
            turrets: Vec::new(),
            spawner: Spawner::new(waves),
            departures: DepartureQueue::new(),
            next_enemy_id: Rc::new(Cell::new(0)),
            next_turret_id: Rc::new(Cell::new(0)),
            stats: SimStats::default(),
            quit_requested: false,
        })
    }

    /// Build a simulation with every archetype of `data` registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is inconsistent, the route is invalid or
    /// an archetype is declared twice.
    pub fn from_scenario(data: &ScenarioData) -> Result<Self> {
        data.validate()?;
        let mut sim = Self::new(data.map, &data.waypoints, data.waves.clone())?;
        for enemy in &data.enemies {
            sim.register_enemy(enemy.id.clone(), enemy.stats(), enemy.pool)?;
        }
        for turret in &data.turrets {
            sim.register_turret(turret.id.clone(), turret.stats(), turret.pool)?;
        }
        tracing::info!(scenario = %data.name, "Scenario loaded");
        Ok(sim)
    }

    /// Register an enemy kind with its pool.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::DuplicatePoolKey`] if the kind is already known.
    pub fn register_enemy(&mut self, kind: PoolKey, stats: EnemyStats, config: PoolConfig) -> Result<()> {
        let ids = Rc::clone(&self.next_enemy_id);
        let factory_kind = kind.clone();
        self.enemy_pool.register(
            kind,
            config,
            Box::new(move |_placement: &Placement| {
                let id = ids.get();
                ids.set(id + 1);
                Enemy::new(id, factory_kind.clone(), stats)
            }),
        )
    }

    /// Register a turret kind with its pool.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::DuplicatePoolKey`] if the kind is already known.
    pub fn register_turret(&mut self, kind: PoolKey, stats: TurretStats, config: PoolConfig) -> Result<()> {
        let ids = Rc::clone(&self.next_turret_id);
        let factory_kind = kind.clone();
        self.turret_pool.register(
            kind,
            config,
            Box::new(move |_placement: &Placement| {
                let id = ids.get();
                ids.set(id + 1);
                Turret::new(id, factory_kind.clone(), stats)
            }),
        )
    }

    /// Current tick.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Grid layout.
    #[must_use]
    pub const fn layout(&self) -> &MapLayout {
        &self.layout
    }

    /// World-space route.
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Cells covered by the route.
    #[must_use]
    pub fn route_cells(&self) -> &[GridPos] {
        &self.route_cells
    }

    /// Cells where turrets may be built.
    #[must_use]
    pub fn tower_sites(&self) -> &[GridPos] {
        &self.tower_sites
    }

    /// Enemies in play.
    #[must_use]
    pub const fn enemies(&self) -> &EnemyRegistry {
        &self.registry
    }

    /// Enemies in play, for attaching observers.
    pub fn enemies_mut(&mut self) -> &mut EnemyRegistry {
        &mut self.registry
    }

    /// Turrets in build order.
    #[must_use]
    pub fn turrets(&self) -> &[PlacedTurret] {
        &self.turrets
    }

    /// Turret on `site`, if any.
    pub fn turret_at_mut(&mut self, site: GridPos) -> Option<&mut Turret> {
        self.turrets
            .iter_mut()
            .find(|placed| placed.site == site)
            .map(|placed| &mut placed.turret)
    }

    /// Wave scheduler.
    #[must_use]
    pub const fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    /// Enemy pool.
    #[must_use]
    pub const fn enemy_pool(&self) -> &Pool<PoolKey, Enemy> {
        &self.enemy_pool
    }

    /// Turret pool.
    #[must_use]
    pub const fn turret_pool(&self) -> &Pool<PoolKey, Turret> {
        &self.turret_pool
    }

    /// Running totals.
    #[must_use]
    pub const fn stats(&self) -> SimStats {
        self.stats
    }

    /// Whether a [`Command::Quit`] has been applied.
    #[must_use]
    pub const fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Whether every wave was started, has finished spawning, and no enemy
    /// remains in play.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.spawner.next_wave().is_none() && self.spawner.is_idle() && self.registry.is_empty()
    }

    /// Apply an external command.
    ///
    /// # Errors
    ///
    /// Returns the reason a command was rejected. The simulation state is
    /// unchanged in that case.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        let result = match command {
            Command::StartWave(index) => self.spawner.start_wave(index),
            Command::StartNextWave => self.spawner.start_next_wave().map(|_| ()),
            Command::BuildTurret { kind, site } => self.build_turret(&kind, site).map(|_| ()),
            Command::RecycleTurret { site } => self.recycle_turret(site),
            Command::Quit => {
                tracing::info!(tick = self.tick, "Quit requested");
                self.quit_requested = true;
                Ok(())
            }
        };
        if let Err(err) = &result {
            tracing::warn!(tick = self.tick, error = %err, "Command rejected");
        }
        result
    }

    /// Place a turret of `kind` on tower site `site`.
    ///
    /// # Errors
    ///
    /// Fails if `site` is not a tower site, is already occupied, or `kind`
    /// has no registered pool.
    pub fn build_turret(&mut self, kind: &PoolKey, site: GridPos) -> Result<TurretId> {
        if !self.tower_sites.contains(&site) {
            return Err(TdError::NotATowerSite { x: site.x, y: site.y });
        }
        if self.turrets.iter().any(|placed| placed.site == site) {
            return Err(TdError::SiteOccupied { x: site.x, y: site.y });
        }

        let position =
            self.layout.cell_center(site) + Vec3Fixed::UP.scale(self.layout.thickness);
        let turret =
            self.turret_pool
                .acquire(kind, position, Orientation::IDENTITY, Some(TURRET_SCOPE))?;
        let id = turret.id();
        tracing::debug!(id, kind = %kind, x = site.x, y = site.y, "Turret built");
        self.turrets.push(PlacedTurret { site, turret });
        Ok(id)
    }

    /// Remove the turret on `site` and return it to its pool.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::SiteEmpty`] if no turret stands on `site`.
    pub fn recycle_turret(&mut self, site: GridPos) -> Result<()> {
        let index = self
            .turrets
            .iter()
            .position(|placed| placed.site == site)
            .ok_or(TdError::SiteEmpty { x: site.x, y: site.y })?;
        let PlacedTurret { turret, .. } = self.turrets.remove(index);
        let kind = turret.kind().clone();
        tracing::debug!(id = turret.id(), kind = %kind, x = site.x, y = site.y, "Turret recycled");
        self.turret_pool.release(&kind, turret)?;
        Ok(())
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut events = TickEvents::default();

        // 1. Movement
        for enemy in self.registry.iter_mut() {
            enemy.update(dt);
        }

        // 2. Departures from arrival
        process_departures(
            &self.departures,
            &mut self.registry,
            &mut self.enemy_pool,
            &mut self.stats,
            &mut events,
        );

        // 3. Combat
        for placed in &mut self.turrets {
            if let Some(shot) = placed.turret.update(dt, &mut self.registry) {
                self.stats.shots += 1;
                events.shots.push(shot);
                process_departures(
                    &self.departures,
                    &mut self.registry,
                    &mut self.enemy_pool,
                    &mut self.stats,
                    &mut events,
                );
            }
        }

        // 4. Spawning
        let mut ctx = SpawnContext {
            pool: &mut self.enemy_pool,
            registry: &mut self.registry,
            route: &self.route,
            departures: &self.departures,
            parent: Some(ENEMY_SCOPE),
        };
        events.spawner = self.spawner.update(dt, &mut ctx);
        for event in &events.spawner {
            if let SpawnerEvent::EntitySpawned { id, .. } = event {
                events.spawned.push(*id);
            }
        }
        self.stats.spawned += events.spawned.len() as u64;

        self.tick += 1;
        self.elapsed += dt;
        events.tick = self.tick;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Hash of the simulation state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed.to_bits().hash(&mut hasher);

        self.registry.len().hash(&mut hasher);
        for enemy in self.registry.iter() {
            enemy.id().hash(&mut hasher);
            enemy.kind().hash(&mut hasher);
            enemy.position().hash(&mut hasher);
            enemy.orientation().hash(&mut hasher);
            enemy.health().current().to_bits().hash(&mut hasher);
            enemy.mover().progress().to_bits().hash(&mut hasher);
        }

        self.turrets.len().hash(&mut hasher);
        for placed in &self.turrets {
            placed.site.hash(&mut hasher);
            placed.turret.id().hash(&mut hasher);
            placed.turret.head().hash(&mut hasher);
            placed.turret.wait_since_fire().to_bits().hash(&mut hasher);
            placed.turret.target().hash(&mut hasher);
        }

        self.stats.hash(&mut hasher);
        hasher.finish()
    }

    /// Positions and facings of everything in play.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            elapsed: self.elapsed,
            enemies: self
                .registry
                .iter()
                .map(|enemy| EnemySnapshot {
                    id: enemy.id(),
                    kind: enemy.kind().clone(),
                    position: enemy.position(),
                    facing: enemy.orientation().forward(),
                    health_percent: enemy.health().percent(),
                    progress: enemy.mover().progress(),
                })
                .collect(),
            turrets: self
                .turrets
                .iter()
                .map(|placed| TurretSnapshot {
                    id: placed.turret.id(),
                    kind: placed.turret.kind().clone(),
                    site: placed.site,
                    facing: placed.turret.head().forward(),
                    target: placed.turret.target(),
                    firing: placed.turret.is_effect_on(),
                })
                .collect(),
            stats: self.stats,
        }
    }
}

/// Unregister and pool every queued departure.
fn process_departures(
    queue: &DepartureQueue,
    registry: &mut EnemyRegistry,
    pool: &mut Pool<PoolKey, Enemy>,
    stats: &mut SimStats,
    events: &mut TickEvents,
) {
    while let Some(departure) = queue.pop() {
        match departure.cause {
            DepartureCause::Killed => stats.killed += 1,
            DepartureCause::ReachedGoal => stats.leaked += 1,
        }
        if let Some(enemy) = registry.unregister(departure.id) {
            if let Err(err) = pool.release(&departure.kind, enemy) {
                tracing::error!(id = departure.id, error = %err, "Failed to pool departed enemy");
            }
        }
        events.departures.push(departure);
    }
}

/// Presentation view of one enemy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemySnapshot {
    /// Instance id.
    pub id: EntityId,
    /// Pool key.
    pub kind: PoolKey,
    /// Ground position.
    pub position: Vec3Fixed,
    /// Unit facing vector.
    pub facing: Vec3Fixed,
    /// Health fraction.
    pub health_percent: Fixed,
    /// Route progress in segments.
    pub progress: Fixed,
}

/// Presentation view of one turret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurretSnapshot {
    /// Instance id.
    pub id: TurretId,
    /// Pool key.
    pub kind: PoolKey,
    /// Occupied cell.
    pub site: GridPos,
    /// Head facing vector.
    pub facing: Vec3Fixed,
    /// Current target.
    pub target: Option<EntityId>,
    /// Whether the fire effect is showing.
    pub firing: bool,
}

/// Presentation view of the whole simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Tick count.
    pub tick: u64,
    /// Simulated seconds.
    pub elapsed: Fixed,
    /// Enemies in registry order.
    pub enemies: Vec<EnemySnapshot>,
    /// Turrets in build order.
    pub turrets: Vec<TurretSnapshot>,
    /// Running totals.
    pub stats: SimStats,
}
