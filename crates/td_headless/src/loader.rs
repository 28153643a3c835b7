//! Scenario file loading.
//!
//! `td_core` parses scenario text without touching the filesystem; this
//! module owns the file IO and turns a path into a ready simulation.

use std::path::Path;

use td_core::data::ScenarioData;
use td_core::error::TdError;
use td_core::simulation::Simulation;
use thiserror::Error;

/// Error type for scenario loading.
#[derive(Error, Debug)]
pub enum LoadError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// File read but the scenario is unusable.
    #[error(transparent)]
    Scenario(#[from] TdError),
}

/// Read and parse a scenario file without building it.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioData, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let data = ScenarioData::from_ron_str(&contents)?;
    tracing::debug!(
        path = %path.display(),
        name = %data.name,
        waves = data.waves.len(),
        "Scenario parsed"
    );
    Ok(data)
}

/// Load a scenario file and build the simulation it describes.
pub fn load_simulation<P: AsRef<Path>>(path: P) -> Result<(ScenarioData, Simulation), LoadError> {
    let data = load_scenario(path)?;
    let sim = Simulation::from_scenario(&data)?;
    Ok((data, sim))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const CORRIDOR: &str = r#"
ScenarioData(
    name: "corridor",
    map: MapLayout(cols: 5, rows: 3, cell_width: 1.0, cell_height: 1.0,
                   hor_space: 0.0, ver_space: 0.0, thickness: 0.25),
    waypoints: [(0, 1), (4, 1)],
    enemies: [EnemyData(id: "grunt", max_health: 10.0, speed: 4.0)],
    waves: [WaveConfig(groups: [GroupConfig(kind: "grunt", count: 2, spawn_interval: 0.5)])],
)
"#;

    fn write_temp(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write scenario");
        file
    }

    #[test]
    fn test_load_simulation_from_file() {
        let file = write_temp(CORRIDOR);
        let (data, sim) = load_simulation(file.path()).unwrap();
        assert_eq!(data.name, "corridor");
        assert_eq!(sim.spawner().wave_count(), 1);
        assert_eq!(sim.tower_sites().len(), 10);
    }

    #[test]
    fn test_missing_file() {
        let result = load_scenario("does/not/exist.ron");
        assert!(matches!(result, Err(LoadError::FileNotFound(_))));
    }

    #[test]
    fn test_malformed_text() {
        let file = write_temp("ScenarioData(name: ");
        assert!(matches!(
            load_scenario(file.path()),
            Err(LoadError::Scenario(TdError::DataParseError(_)))
        ));
    }

    #[test]
    fn test_unknown_wave_kind_is_rejected_at_build() {
        let file = write_temp(&CORRIDOR.replace(r#"kind: "grunt""#, r#"kind: "ghost""#));
        assert!(load_scenario(file.path()).is_ok());
        assert!(matches!(
            load_simulation(file.path()),
            Err(LoadError::Scenario(TdError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_bundled_scenario_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/meadow.ron");
        let (data, sim) = load_simulation(path).unwrap();
        assert_eq!(data.enemies.len(), 3);
        assert_eq!(sim.spawner().wave_count(), 2);
    }
}
