//! Headless tower-defense runner.
//!
//! Loads a scenario file, reads line commands on stdin and writes the
//! resulting simulation events to stdout, one JSON object per line:
//!
//! - **stdin**: commands from a controller (`start`, `build`, `tick`, ...)
//! - **stdout**: acknowledgments, tick reports and status (JSON)
//! - **stderr**: logs (human-readable)
//!
//! See the [`protocol`] module for the command and response format.
//!
//! # Example
//!
//! ```bash
//! printf 'build gun 2 1\nnext\ntick 200\nstatus\n' \
//!     | cargo run -p td_headless -- run --scenario scenarios/meadow.ron
//! ```

pub mod loader;
pub mod protocol;
pub mod runner;

pub use loader::{load_scenario, load_simulation, LoadError};
pub use protocol::{LineCommand, ParseError, Response, StatusReport};
pub use runner::{HeadlessConfig, HeadlessRunner};
