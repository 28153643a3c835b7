//! Headless runner implementation.

use std::io::{self, BufRead, Write};

use td_core::math::Fixed;
use td_core::simulation::{tick_duration, Simulation, TICK_RATE};

use crate::protocol::{LineCommand, Response, StatusReport};

/// Headless runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Ticks per simulated second.
    pub tick_rate: u32,
    /// Ticks to keep running after input ends, stopping early once the
    /// field is cleared. Zero stops at end of input.
    pub auto_ticks: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            auto_ticks: 0,
        }
    }
}

/// Drives a [`Simulation`] from line commands.
#[derive(Debug)]
pub struct HeadlessRunner {
    name: String,
    sim: Simulation,
    config: HeadlessConfig,
    dt: Fixed,
}

impl HeadlessRunner {
    /// Create a runner around a built simulation.
    pub fn new(name: impl Into<String>, sim: Simulation, config: HeadlessConfig) -> Self {
        Self {
            name: name.into(),
            sim,
            dt: tick_duration(config.tick_rate),
            config,
        }
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Run the command loop until `quit` or end of input.
    ///
    /// Every response is written to `output` as a JSON line.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        tracing::info!(
            scenario = %self.name,
            tick_rate = self.config.tick_rate,
            "Starting headless session"
        );
        write_response(&mut output, &self.ready())?;

        for line in input.lines() {
            let line = line?;
            for response in self.handle_line(&line) {
                write_response(&mut output, &response)?;
            }
            if self.sim.quit_requested() {
                break;
            }
        }

        if !self.sim.quit_requested() && self.config.auto_ticks > 0 {
            for response in self.auto_run() {
                write_response(&mut output, &response)?;
            }
        }

        write_response(&mut output, &self.bye())?;
        output.flush()
    }

    /// Process one input line and return the responses it produces.
    pub fn handle_line(&mut self, line: &str) -> Vec<Response> {
        let command = match LineCommand::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(line = %line.trim(), error = %e, "Malformed command line");
                return vec![Response::error(e.to_string(), None)];
            }
        };

        let name = command.name();
        match command {
            LineCommand::Sim(command) => match self.sim.apply(command) {
                Ok(()) => vec![Response::ack(name)],
                Err(e) => vec![Response::error(e.to_string(), Some(name))],
            },
            LineCommand::Tick(count) => self.step(u64::from(count)),
            LineCommand::Status => vec![Response::Status(self.status())],
        }
    }

    /// Advance `count` ticks, reporting every tick that produced events.
    fn step(&mut self, count: u64) -> Vec<Response> {
        let mut responses = Vec::new();
        for _ in 0..count {
            let events = self.sim.tick(self.dt);
            if !events.is_empty() {
                responses.push(Response::Tick(events));
            }
        }
        responses.push(self.ticked());
        responses
    }

    fn auto_run(&mut self) -> Vec<Response> {
        tracing::debug!(limit = self.config.auto_ticks, "Input ended, auto-running");
        let mut responses = Vec::new();
        let mut ran = 0;
        while ran < self.config.auto_ticks && !self.sim.is_cleared() {
            let events = self.sim.tick(self.dt);
            if !events.is_empty() {
                responses.push(Response::Tick(events));
            }
            ran += 1;
        }
        if !self.sim.is_cleared() {
            tracing::warn!(ticks = ran, "Auto-run limit reached before the field cleared");
        }
        responses.push(self.ticked());
        responses
    }

    /// Current state in plain numbers.
    pub fn status(&self) -> StatusReport {
        StatusReport::from_snapshot(
            self.sim.snapshot(),
            self.sim.spawner().next_wave(),
            self.sim.is_cleared(),
            self.sim.state_hash(),
        )
    }

    fn ready(&self) -> Response {
        Response::Ready {
            scenario: self.name.clone(),
            tick: self.sim.tick_count(),
            tick_rate: self.config.tick_rate,
            waves: self.sim.spawner().wave_count(),
            tower_sites: self.sim.tower_sites().len(),
        }
    }

    fn ticked(&self) -> Response {
        Response::Ticked {
            tick: self.sim.tick_count(),
            cleared: self.sim.is_cleared(),
        }
    }

    fn bye(&self) -> Response {
        let stats = self.sim.stats();
        tracing::info!(
            tick = self.sim.tick_count(),
            spawned = stats.spawned,
            killed = stats.killed,
            leaked = stats.leaked,
            "Session finished"
        );
        Response::Bye {
            tick: self.sim.tick_count(),
            stats,
            hash: self.sim.state_hash(),
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())
}
