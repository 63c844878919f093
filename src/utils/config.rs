//! Configuration file handling
//!
//! A JSON file lists the sensors (decimal degrees or DMS pairs), an optional
//! default propagation speed and the solver settings. Every field except the
//! sensor list has a default.

use crate::algorithms::dms::parse_dms_pair;
use crate::algorithms::tdoa::SolverOptions;
use crate::core::{GeodeticCoord, Sensor, SensorSet};
use crate::validation::data::validate_speed;
use crate::validation::error::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Sensor coordinates as written in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    /// Decimal degrees
    Decimal { lat: f64, lon: f64 },
    /// DMS pair such as `"28°36′50.04″N 77°12′32.40″E"`
    Dms(String),
}

impl CoordinateInput {
    /// Resolve to validated decimal degrees
    pub fn to_geodetic(&self) -> Result<GeodeticCoord> {
        match self {
            CoordinateInput::Decimal { lat, lon } => {
                let coord = GeodeticCoord::new(*lat, *lon);
                coord.validate()?;
                Ok(coord)
            }
            CoordinateInput::Dms(text) => parse_dms_pair(text),
        }
    }
}

impl From<GeodeticCoord> for CoordinateInput {
    fn from(coord: GeodeticCoord) -> Self {
        CoordinateInput::Decimal { lat: coord.lat, lon: coord.lon }
    }
}

fn default_enabled() -> bool {
    true
}

/// One sensor entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: String,
    pub coords: CoordinateInput,
    /// Disabled sensors are kept in the file but left out of the solve
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SensorConfig {
    pub fn new(id: impl Into<String>, coords: impl Into<CoordinateInput>) -> Self {
        Self {
            id: id.into(),
            coords: coords.into(),
            enabled: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub sensors: Vec<SensorConfig>,
    /// Default propagation speed (m/s) used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation_speed: Option<f64>,
    #[serde(default)]
    pub solver: SolverOptions,
}

impl Default for LocatorConfig {
    /// Five sensors around Delhi, D1 first as the reference
    fn default() -> Self {
        let sensors = [
            ("D1", 28.6139, 77.2090),
            ("D2", 28.7041, 77.1025),
            ("D3", 28.5355, 77.3910),
            ("D4", 28.4089, 77.3178),
            ("D5", 28.4595, 77.0266),
        ]
        .into_iter()
        .map(|(id, lat, lon)| SensorConfig::new(id, GeodeticCoord::new(lat, lon)))
        .collect();

        Self {
            sensors,
            propagation_speed: None,
            solver: SolverOptions::default(),
        }
    }
}

impl LocatorConfig {
    /// Load and validate a configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| LocatorError::Config {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: LocatorConfig = serde_json::from_str(&content).map_err(|e| LocatorError::Config {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        config.validate()?;
        info!(path = %path_str, sensors = config.sensors.len(), "Loaded configuration");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| LocatorError::Config {
            message: format!("Failed to serialize configuration: {}", e),
        })?;
        fs::write(&path, json)?;
        debug!(path = %path.as_ref().display(), "Saved configuration");
        Ok(())
    }

    /// Check ids, coordinates, speed and solver settings
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.id.trim().is_empty() {
                return Err(LocatorError::Config {
                    message: "sensor id must not be empty".to_string(),
                });
            }
            if !seen.insert(sensor.id.as_str()) {
                return Err(LocatorError::DuplicateSensor { sensor_id: sensor.id.clone() });
            }
            sensor.coords.to_geodetic()?;
        }

        if let Some(speed) = self.propagation_speed {
            validate_speed(speed)?;
        }

        let buffer = self.solver.bounds_buffer_m;
        if !(buffer.is_finite() && buffer >= 0.0) {
            return Err(LocatorError::Config {
                message: format!("bounds_buffer_m must be a non-negative distance, got {}", buffer),
            });
        }

        let minimizer = &self.solver.minimizer;
        if minimizer.max_iterations == 0 || minimizer.max_evaluations == 0 || minimizer.history == 0 {
            return Err(LocatorError::Config {
                message: "minimizer iteration, evaluation and history limits must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Build the sensor set from the enabled sensors, in file order
    pub fn to_sensor_set(&self) -> Result<SensorSet> {
        let sensors = self
            .sensors
            .iter()
            .filter(|s| s.enabled)
            .map(|s| -> Result<Sensor> { Ok(Sensor::new(s.id.clone(), s.coords.to_geodetic()?)) })
            .collect::<Result<Vec<_>>>()?;
        SensorSet::new(sensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::tdoa::Objective;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LocatorConfig::default();
        assert_eq!(config.sensors.len(), 5);
        assert_eq!(config.sensors[0].id, "D1");
        config.validate().unwrap();

        let set = config.to_sensor_set().unwrap();
        assert_eq!(set.reference().position, GeodeticCoord::new(28.6139, 77.2090));
    }

    #[test]
    fn test_mixed_coordinate_formats() {
        let json = r#"{
            "sensors": [
                {"id": "A", "coords": {"lat": 28.6139, "lon": 77.2090}},
                {"id": "B", "coords": "28°42′14.76″N 77°06′09.00″E"},
                {"id": "C", "coords": "28°32'07.80\"N 77°23'27.60\"E", "enabled": true}
            ],
            "propagation_speed": 343.0,
            "solver": {"objective": "absolute_range"}
        }"#;
        let config: LocatorConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.solver.objective, Objective::AbsoluteRange);
        assert_eq!(config.solver.bounds_buffer_m, SolverOptions::default().bounds_buffer_m);

        let set = config.to_sensor_set().unwrap();
        let b = set.sensors()[1].position;
        assert!((b.lat - 28.7041).abs() < 1e-6);
        assert!((b.lon - 77.1025).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_dms_rejected() {
        let mut config = LocatorConfig::default();
        config.sensors[2].coords = CoordinateInput::Dms("28°32′N 77°23′27.60″E".to_string());
        assert!(matches!(
            config.validate(),
            Err(LocatorError::InvalidCoordinateFormat { .. })
        ));
    }

    #[test]
    fn test_disabled_sensors_skipped() {
        let mut config = LocatorConfig::default();
        config.sensors[1].enabled = false;
        let set = config.to_sensor_set().unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.index_of("D2"), None);

        for sensor in config.sensors.iter_mut().skip(2) {
            sensor.enabled = false;
        }
        assert!(matches!(
            config.to_sensor_set(),
            Err(LocatorError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = LocatorConfig::default();
        config.propagation_speed = Some(0.0);
        assert!(matches!(config.validate(), Err(LocatorError::NonPositiveSpeed { .. })));

        let mut config = LocatorConfig::default();
        config.sensors[3].id = "D1".to_string();
        assert!(matches!(config.validate(), Err(LocatorError::DuplicateSensor { .. })));

        let mut config = LocatorConfig::default();
        config.solver.bounds_buffer_m = -1.0;
        assert!(matches!(config.validate(), Err(LocatorError::Config { .. })));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensors.json");

        let mut config = LocatorConfig::default();
        config.propagation_speed = Some(3500.0);
        config.save_to_file(&path).unwrap();

        let loaded = LocatorConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.sensors.len(), config.sensors.len());
        assert_eq!(loaded.sensors[4].id, "D5");
        assert_eq!(loaded.propagation_speed, Some(3500.0));
        assert_eq!(loaded.solver.objective, config.solver.objective);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            LocatorConfig::load_from_file(dir.path().join("missing.json")),
            Err(LocatorError::Config { .. })
        ));

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LocatorConfig::load_from_file(&path),
            Err(LocatorError::Config { .. })
        ));
    }
}
