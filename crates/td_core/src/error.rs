//! Error types for the tower-defense simulation.

use thiserror::Error;

use crate::route::RouteError;

/// Result type alias using [`TdError`].
pub type Result<T> = std::result::Result<T, TdError>;

/// Top-level error type for all simulation errors.
///
/// Every variant is a configuration or command error: the offending
/// operation is abandoned and the simulation carries on.
#[derive(Debug, Error)]
pub enum TdError {
    /// No pool was registered for the requested key.
    #[error("No pool registered for key '{0}'")]
    UnknownPoolKey(String),

    /// A pool was registered twice for the same key.
    #[error("Pool for key '{0}' is already registered")]
    DuplicatePoolKey(String),

    /// The waypoint list could not be turned into a route.
    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    /// Wave index outside the configured wave list.
    #[error("Wave {index} does not exist ({count} waves configured)")]
    WaveOutOfRange {
        /// Requested wave index.
        index: usize,
        /// Number of configured waves.
        count: usize,
    },

    /// Wave has already been started once.
    #[error("Wave {0} has already been started")]
    WaveAlreadyStarted(usize),

    /// Grid cell cannot hold a turret.
    #[error("Cell ({x}, {y}) is not a tower site")]
    NotATowerSite {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// Tower site already holds a turret.
    #[error("Tower site ({x}, {y}) is already occupied")]
    SiteOccupied {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// Tower site holds no turret.
    #[error("Tower site ({x}, {y}) has no turret")]
    SiteEmpty {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// Data file parsing error.
    #[error("Failed to parse scenario data: {0}")]
    DataParseError(String),

    /// Data parsed but describes an unusable configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
