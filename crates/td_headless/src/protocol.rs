//! Line protocol for the headless runner.
//!
//! **Input (stdin):** one command per line, whitespace separated
//! **Output (stdout):** one JSON object per line
//!
//! # Commands
//!
//! | Line               | Effect                                  |
//! |--------------------|-----------------------------------------|
//! | `start N`          | start wave `N`                          |
//! | `next`             | start the lowest wave not yet started   |
//! | `build KIND X Y`   | place a turret of `KIND` on cell (X, Y) |
//! | `recycle X Y`      | remove the turret on cell (X, Y)        |
//! | `tick [N]`         | advance `N` ticks (default 1)           |
//! | `status`           | report the current state                |
//! | `quit`             | stop the runner                         |
//!
//! Blank lines and lines starting with `#` are ignored.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","scenario":"meadow","tick":0,"tick_rate":16,"waves":2,"tower_sites":74}
//! -> build gun 2 1
//! <- {"type":"ack","cmd":"build"}
//! -> next
//! <- {"type":"ack","cmd":"next"}
//! -> tick 16
//! <- {"type":"tick","tick":1,"spawner":[...],"spawned":[0],"shots":[],"departures":[]}
//! <- {"type":"ticked","tick":16,"cleared":false}
//! ```

use serde::Serialize;
use thiserror::Error;

use td_core::pool::PoolKey;
use td_core::route::GridPos;
use td_core::simulation::{Command, SimStats, Snapshot, TickEvents};

// ============================================================================
// Input Commands
// ============================================================================

const COMMANDS: [&str; 7] = ["start", "next", "build", "recycle", "tick", "status", "quit"];

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    /// Forward a command to the simulation.
    Sim(Command),
    /// Advance by this many ticks.
    Tick(u32),
    /// Report the current state.
    Status,
}

/// Error parsing an input line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// First word is not a known command.
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    /// Required argument absent.
    #[error("'{cmd}' is missing argument <{arg}>")]
    MissingArgument {
        /// Command name.
        cmd: &'static str,
        /// Argument name.
        arg: &'static str,
    },
    /// Argument present but not a number of the right kind.
    #[error("'{cmd}' argument <{arg}> is not a valid number: '{value}'")]
    InvalidNumber {
        /// Command name.
        cmd: &'static str,
        /// Argument name.
        arg: &'static str,
        /// Text as given.
        value: String,
    },
    /// More words than the command takes.
    #[error("'{0}' given too many arguments")]
    TooManyArguments(&'static str),
}

impl LineCommand {
    /// Parse one input line.
    ///
    /// Returns `Ok(None)` for blank and comment lines.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let cmd = COMMANDS
            .iter()
            .find(|known| **known == name)
            .copied()
            .ok_or_else(|| ParseError::UnknownCommand(name.to_string()))?;
        let mut args = Args { cmd, words };

        let command = match cmd {
            "start" => Self::Sim(Command::StartWave(args.number("wave")?)),
            "next" => Self::Sim(Command::StartNextWave),
            "build" => {
                let kind = PoolKey::new(args.word("kind")?);
                let site = args.cell()?;
                Self::Sim(Command::BuildTurret { kind, site })
            }
            "recycle" => Self::Sim(Command::RecycleTurret { site: args.cell()? }),
            "tick" => Self::Tick(args.optional_number("count")?.unwrap_or(1)),
            "status" => Self::Status,
            "quit" => Self::Sim(Command::Quit),
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };

        args.finish()?;
        Ok(Some(command))
    }

    /// Command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sim(Command::StartWave(_)) => "start",
            Self::Sim(Command::StartNextWave) => "next",
            Self::Sim(Command::BuildTurret { .. }) => "build",
            Self::Sim(Command::RecycleTurret { .. }) => "recycle",
            Self::Sim(Command::Quit) => "quit",
            Self::Tick(_) => "tick",
            Self::Status => "status",
        }
    }
}

/// Argument cursor over the rest of a line.
struct Args<'a> {
    cmd: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, arg: &'static str) -> Result<&'a str, ParseError> {
        self.words.next().ok_or(ParseError::MissingArgument {
            cmd: self.cmd,
            arg,
        })
    }

    fn number<N: std::str::FromStr>(&mut self, arg: &'static str) -> Result<N, ParseError> {
        let word = self.word(arg)?;
        self.parse_number(arg, word)
    }

    fn optional_number<N: std::str::FromStr>(
        &mut self,
        arg: &'static str,
    ) -> Result<Option<N>, ParseError> {
        match self.words.next() {
            Some(word) => self.parse_number(arg, word).map(Some),
            None => Ok(None),
        }
    }

    fn parse_number<N: std::str::FromStr>(
        &self,
        arg: &'static str,
        word: &str,
    ) -> Result<N, ParseError> {
        word.parse().map_err(|_| ParseError::InvalidNumber {
            cmd: self.cmd,
            arg,
            value: word.to_string(),
        })
    }

    fn cell(&mut self) -> Result<GridPos, ParseError> {
        let x = self.number("x")?;
        let y = self.number("y")?;
        Ok(GridPos::new(x, y))
    }

    fn finish(mut self) -> Result<(), ParseError> {
        match self.words.next() {
            Some(_) => Err(ParseError::TooManyArguments(self.cmd)),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Output Responses
// ============================================================================

/// Records written to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Scenario name.
        scenario: String,
        /// Current tick.
        tick: u64,
        /// Ticks per simulated second.
        tick_rate: u32,
        /// Configured waves.
        waves: usize,
        /// Cells that can hold a turret.
        tower_sites: usize,
    },

    /// Command accepted.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Command rejected or line malformed.
    Error {
        /// What went wrong.
        message: String,
        /// Offending command, when the line parsed.
        #[serde(skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Everything that happened during one tick that produced events.
    Tick(TickEvents),

    /// A `tick` command has finished stepping.
    Ticked {
        /// Tick count after stepping.
        tick: u64,
        /// Every wave done and the field empty.
        cleared: bool,
    },

    /// Current state.
    Status(StatusReport),

    /// Runner is stopping.
    Bye {
        /// Final tick count.
        tick: u64,
        /// Run totals.
        stats: SimStats,
        /// Final state hash.
        hash: u64,
    },
}

impl Response {
    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

// ============================================================================
// State Types
// ============================================================================

/// Simulation state in plain numbers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Current tick.
    pub tick: u64,
    /// Simulated seconds.
    pub elapsed: f64,
    /// Every wave done and the field empty.
    pub cleared: bool,
    /// Next wave `next` would start.
    pub next_wave: Option<usize>,
    /// Determinism hash of the current state.
    pub hash: u64,
    /// Enemies on the field.
    pub enemies: Vec<EnemyState>,
    /// Placed turrets.
    pub turrets: Vec<TurretState>,
    /// Run totals.
    pub stats: SimStats,
}

/// State of one enemy.
#[derive(Debug, Clone, Serialize)]
pub struct EnemyState {
    pub id: u64,
    pub kind: String,
    pub x: f64,
    pub z: f64,
    pub health_percent: f64,
    pub progress: f64,
}

/// State of one turret.
#[derive(Debug, Clone, Serialize)]
pub struct TurretState {
    pub id: u64,
    pub kind: String,
    pub site: (i32, i32),
    /// Head facing on the ground plane.
    pub facing: (f64, f64),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
    pub firing: bool,
}

impl StatusReport {
    /// Convert a simulation snapshot.
    pub fn from_snapshot(snapshot: Snapshot, next_wave: Option<usize>, cleared: bool, hash: u64) -> Self {
        Self {
            tick: snapshot.tick,
            elapsed: snapshot.elapsed.to_num(),
            cleared,
            next_wave,
            hash,
            enemies: snapshot
                .enemies
                .into_iter()
                .map(|e| EnemyState {
                    id: e.id,
                    kind: e.kind.to_string(),
                    x: e.position.x.to_num(),
                    z: e.position.z.to_num(),
                    health_percent: e.health_percent.to_num(),
                    progress: e.progress.to_num(),
                })
                .collect(),
            turrets: snapshot
                .turrets
                .into_iter()
                .map(|t| TurretState {
                    id: t.id,
                    kind: t.kind.to_string(),
                    site: (t.site.x, t.site.y),
                    facing: (t.facing.x.to_num(), t.facing.z.to_num()),
                    target: t.target,
                    firing: t.firing,
                })
                .collect(),
            stats: snapshot.stats,
        }
    }
}
