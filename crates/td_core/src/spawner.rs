//! Wave and group spawning.
//!
//! Spawning is a two-level schedule of timed tasks, advanced cooperatively
//! by [`Spawner::update`] once per tick:
//!
//! - a **wave task** waits for the wave's start delay, then launches its
//!   groups in order. Before launching a group configured
//!   [`StartTiming::AfterPrevious`] it suspends until the previous group's
//!   task has finished;
//! - a **group task** waits for the group's start delay, then spawns
//!   `count` entities, waiting `spawn_interval` after each one.
//!
//! Suspensions are pure elapsed-time countdowns. Surplus time is not
//! carried into the next step. A countdown ends once it is within
//! [`TIME_EPSILON`] of zero, so a non-positive delay does not suspend.
//!
//! Per tick, running group tasks advance first; wave tasks then resume and
//! may launch new groups, which take their first step immediately with no
//! elapsed time.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::enemy::{DepartureQueue, Enemy, EntityId};
use crate::error::{Result, TdError};
use crate::math::{decimal_serde, Fixed, Orientation, TIME_EPSILON};
use crate::pool::{ParentScope, Pool, PoolKey};
use crate::registry::EnemyRegistry;
use crate::route::Route;

/// When a group starts relative to the group before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StartTiming {
    /// Start together with the previous group.
    #[default]
    WithPrevious,
    /// Start once the previous group has finished spawning.
    AfterPrevious,
}

/// One group of identical enemies within a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Enemy pool key.
    pub kind: PoolKey,
    /// Number of enemies to spawn.
    pub count: u32,
    /// Wait after each spawn.
    #[serde(with = "decimal_serde", default)]
    pub spawn_interval: Fixed,
    /// Wait before the first spawn.
    #[serde(with = "decimal_serde", default)]
    pub start_delay: Fixed,
    /// Relation to the previous group.
    #[serde(default)]
    pub start_timing: StartTiming,
}

/// Ordered groups making up one wave.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Wait between starting the wave and launching its first group.
    #[serde(with = "decimal_serde", default)]
    pub start_delay: Fixed,
    /// Groups in launch order.
    pub groups: Vec<GroupConfig>,
}

/// Spawner lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SpawnerEvent {
    /// Wave accepted; its start delay begins.
    WaveStarted {
        /// Wave index.
        wave: usize,
    },
    /// Wave start delay elapsed; groups are being launched.
    WaveSpawning {
        /// Wave index.
        wave: usize,
    },
    /// Group task launched; its start delay begins.
    GroupStarted {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
    },
    /// Group start delay elapsed; spawning begins.
    GroupSpawning {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
    },
    /// An enemy entered play.
    EntitySpawned {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
        /// New enemy.
        id: EntityId,
        /// Its pool key.
        kind: PoolKey,
    },
    /// Group spawned all its enemies.
    GroupFinished {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
        /// Enemies spawned.
        spawned: u32,
    },
    /// Group stopped on a configuration error.
    GroupAborted {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
        /// Error description.
        reason: String,
    },
    /// Every group of the wave has finished.
    WaveFinished {
        /// Wave index.
        wave: usize,
    },
}

/// Everything a group task touches when it spawns.
pub struct SpawnContext<'a> {
    /// Enemy pool.
    pub pool: &'a mut Pool<PoolKey, Enemy>,
    /// Live enemies.
    pub registry: &'a mut EnemyRegistry,
    /// Route new enemies walk.
    pub route: &'a Rc<Route>,
    /// Inbox for departure notifications.
    pub departures: &'a DepartureQueue,
    /// Scope new enemies are attached to; `None` uses the pool default.
    pub parent: Option<ParentScope>,
}

type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupPhase {
    Delay(Fixed),
    Spawning(Fixed),
    Finished,
}

#[derive(Debug)]
struct GroupTask {
    id: TaskId,
    wave: usize,
    group: usize,
    config: GroupConfig,
    phase: GroupPhase,
    spawned: u32,
}

impl GroupTask {
    fn new(id: TaskId, wave: usize, group: usize, config: GroupConfig) -> Self {
        let phase = GroupPhase::Delay(config.start_delay);
        Self {
            id,
            wave,
            group,
            config,
            phase,
            spawned: 0,
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == GroupPhase::Finished
    }

    fn poll(&mut self, elapsed: Fixed, ctx: &mut SpawnContext<'_>, events: &mut Vec<SpawnerEvent>) {
        let mut elapsed = elapsed;
        loop {
            match self.phase {
                GroupPhase::Finished => return,
                GroupPhase::Delay(remaining) => {
                    let remaining = remaining - elapsed;
                    elapsed = Fixed::ZERO;
                    if remaining > TIME_EPSILON {
                        self.phase = GroupPhase::Delay(remaining);
                        return;
                    }
                    tracing::info!(wave = self.wave, group = self.group, kind = %self.config.kind, "Group spawning");
                    events.push(SpawnerEvent::GroupSpawning {
                        wave: self.wave,
                        group: self.group,
                    });
                    self.phase = GroupPhase::Spawning(Fixed::ZERO);
                }
                GroupPhase::Spawning(remaining) => {
                    let remaining = remaining - elapsed;
                    elapsed = Fixed::ZERO;
                    if remaining > TIME_EPSILON {
                        self.phase = GroupPhase::Spawning(remaining);
                        return;
                    }
                    if self.spawned >= self.config.count {
                        self.finish(events);
                        return;
                    }
                    match self.spawn_one(ctx) {
                        Ok(id) => {
                            self.spawned += 1;
                            events.push(SpawnerEvent::EntitySpawned {
                                wave: self.wave,
                                group: self.group,
                                id,
                                kind: self.config.kind.clone(),
                            });
                            self.phase = GroupPhase::Spawning(self.config.spawn_interval);
                        }
                        Err(err) => {
                            tracing::error!(wave = self.wave, group = self.group, error = %err, "Group aborted");
                            events.push(SpawnerEvent::GroupAborted {
                                wave: self.wave,
                                group: self.group,
                                reason: err.to_string(),
                            });
                            self.phase = GroupPhase::Finished;
                            return;
                        }
                    }
                }
            }
        }
    }

    fn spawn_one(&self, ctx: &mut SpawnContext<'_>) -> Result<EntityId> {
        let start = ctx.route.first();
        let facing = Orientation::look_rotation(ctx.route.point(1) - start);
        let mut enemy = ctx.pool.acquire(&self.config.kind, start, facing, ctx.parent)?;
        enemy.on_departed.subscribe(ctx.departures.listener());
        enemy.spawn(Rc::clone(ctx.route));
        let id = enemy.id();
        tracing::debug!(id, kind = %self.config.kind, "Enemy spawned");
        ctx.registry.register(enemy);
        Ok(id)
    }

    fn finish(&mut self, events: &mut Vec<SpawnerEvent>) {
        tracing::info!(wave = self.wave, group = self.group, spawned = self.spawned, "Group finished");
        events.push(SpawnerEvent::GroupFinished {
            wave: self.wave,
            group: self.group,
            spawned: self.spawned,
        });
        self.phase = GroupPhase::Finished;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WavePhase {
    Delay(Fixed),
    Launching {
        next_group: usize,
        awaiting: Option<TaskId>,
    },
    Draining,
    Finished,
}

#[derive(Debug)]
struct WaveTask {
    wave: usize,
    phase: WavePhase,
}

/// Group task bookkeeping shared by the wave tasks during one update.
struct GroupSlots<'s> {
    running: &'s mut Vec<GroupTask>,
    next_id: &'s mut TaskId,
}

impl WaveTask {
    fn poll(
        &mut self,
        elapsed: Fixed,
        config: &WaveConfig,
        slots: &mut GroupSlots<'_>,
        ctx: &mut SpawnContext<'_>,
        events: &mut Vec<SpawnerEvent>,
    ) {
        if let WavePhase::Delay(remaining) = self.phase {
            let remaining = remaining - elapsed;
            if remaining > TIME_EPSILON {
                self.phase = WavePhase::Delay(remaining);
                return;
            }
            tracing::info!(wave = self.wave, "Wave spawning");
            events.push(SpawnerEvent::WaveSpawning { wave: self.wave });
            self.phase = WavePhase::Launching {
                next_group: 0,
                awaiting: None,
            };
        }

        if let WavePhase::Launching {
            mut next_group,
            awaiting,
        } = self.phase
        {
            if let Some(task) = awaiting {
                if slots.running.iter().any(|t| t.id == task) {
                    return;
                }
            }
            while next_group < config.groups.len() {
                let group = next_group;
                next_group += 1;

                let id = *slots.next_id;
                *slots.next_id += 1;
                let mut task = GroupTask::new(id, self.wave, group, config.groups[group].clone());
                tracing::info!(wave = self.wave, group, "Group started");
                events.push(SpawnerEvent::GroupStarted {
                    wave: self.wave,
                    group,
                });
                task.poll(Fixed::ZERO, ctx, events);

                let finished = task.is_finished();
                if !finished {
                    slots.running.push(task);
                }
                let chained = config
                    .groups
                    .get(next_group)
                    .is_some_and(|next| next.start_timing == StartTiming::AfterPrevious);
                if chained && !finished {
                    self.phase = WavePhase::Launching {
                        next_group,
                        awaiting: Some(id),
                    };
                    return;
                }
            }
            self.phase = WavePhase::Draining;
        }

        if self.phase == WavePhase::Draining && !slots.running.iter().any(|t| t.wave == self.wave) {
            tracing::info!(wave = self.wave, "Wave finished");
            events.push(SpawnerEvent::WaveFinished { wave: self.wave });
            self.phase = WavePhase::Finished;
        }
    }
}

/// Wave scheduler.
#[derive(Debug, Default)]
pub struct Spawner {
    waves: Vec<WaveConfig>,
    started: Vec<bool>,
    wave_tasks: Vec<WaveTask>,
    group_tasks: Vec<GroupTask>,
    next_task_id: TaskId,
    pending: Vec<SpawnerEvent>,
}

impl Spawner {
    /// Create a spawner for `waves`. No wave is started.
    #[must_use]
    pub fn new(waves: Vec<WaveConfig>) -> Self {
        let started = vec![false; waves.len()];
        Self {
            waves,
            started,
            ..Self::default()
        }
    }

    /// Configured waves.
    #[must_use]
    pub fn waves(&self) -> &[WaveConfig] {
        &self.waves
    }

    /// Number of configured waves.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Whether wave `index` has been started.
    #[must_use]
    pub fn is_started(&self, index: usize) -> bool {
        self.started.get(index).copied().unwrap_or(false)
    }

    /// Lowest wave index not yet started.
    #[must_use]
    pub fn next_wave(&self) -> Option<usize> {
        self.started.iter().position(|started| !started)
    }

    /// Number of group tasks still running.
    #[must_use]
    pub fn running_groups(&self) -> usize {
        self.group_tasks.len()
    }

    /// Number of wave tasks still running.
    #[must_use]
    pub fn running_waves(&self) -> usize {
        self.wave_tasks.len()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.wave_tasks.is_empty() && self.group_tasks.is_empty()
    }

    /// Start wave `index`. Its start delay counts from the next update.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the wave was
    /// already started.
    pub fn start_wave(&mut self, index: usize) -> Result<()> {
        let count = self.waves.len();
        let Some(started) = self.started.get_mut(index) else {
            return Err(TdError::WaveOutOfRange { index, count });
        };
        if *started {
            return Err(TdError::WaveAlreadyStarted(index));
        }
        *started = true;

        let delay = self.waves[index].start_delay;
        tracing::info!(wave = index, delay = %delay, "Wave started");
        self.pending.push(SpawnerEvent::WaveStarted { wave: index });
        self.wave_tasks.push(WaveTask {
            wave: index,
            phase: WavePhase::Delay(delay),
        });
        Ok(())
    }

    /// Start the lowest-index wave not yet started and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::WaveOutOfRange`] when every wave has been started.
    pub fn start_next_wave(&mut self) -> Result<usize> {
        let count = self.waves.len();
        let index = self
            .next_wave()
            .ok_or(TdError::WaveOutOfRange { index: count, count })?;
        self.start_wave(index)?;
        Ok(index)
    }

    /// Advance every task by `dt` and return the events produced, including
    /// those queued by `start_wave` since the last update.
    pub fn update(&mut self, dt: Fixed, ctx: &mut SpawnContext<'_>) -> Vec<SpawnerEvent> {
        let mut events = std::mem::take(&mut self.pending);

        for task in &mut self.group_tasks {
            task.poll(dt, ctx, &mut events);
        }
        self.group_tasks.retain(|task| !task.is_finished());

        let mut slots = GroupSlots {
            running: &mut self.group_tasks,
            next_id: &mut self.next_task_id,
        };
        for wave in &mut self.wave_tasks {
            let config = &self.waves[wave.wave];
            wave.poll(dt, config, &mut slots, ctx, &mut events);
        }
        self.wave_tasks.retain(|wave| wave.phase != WavePhase::Finished);

        events
    }
}
