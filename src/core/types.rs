//! Core data types for the crack location system

use crate::algorithms::tdoa::Objective;
use crate::core::constants::MIN_SENSORS;
use crate::validation::error::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Geographic axis of a coordinate component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Largest magnitude allowed on this axis (degrees)
    pub fn limit_deg(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// Position in geodetic coordinates (decimal degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GeodeticCoord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that both components are finite and inside their axis range
    pub fn validate(&self) -> Result<()> {
        for (axis, value) in [(Axis::Latitude, self.lat), (Axis::Longitude, self.lon)] {
            if !value.is_finite() || value.abs() > axis.limit_deg() {
                return Err(LocatorError::CoordinateOutOfRange { axis, value });
            }
        }
        Ok(())
    }
}

impl fmt::Display for GeodeticCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Position on the local tangent plane, meters east (`x`) and north (`y`)
/// of the reference sensor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarPosition {
    pub x: f64,
    pub y: f64,
}

impl PlanarPosition {
    pub const ORIGIN: PlanarPosition = PlanarPosition { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another planar position
    pub fn distance_to(&self, other: &PlanarPosition) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A fixed vibration sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub position: GeodeticCoord,
}

impl Sensor {
    pub fn new(id: impl Into<String>, position: GeodeticCoord) -> Self {
        Self { id: id.into(), position }
    }
}

/// Ordered, validated set of sensors. The first sensor is the reference
/// for the planar frame and for arrival-time offsets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSet {
    sensors: Vec<Sensor>,
}

impl SensorSet {
    /// Build a sensor set, rejecting sets that cannot support a 2-D solve
    /// (fewer than three sensors), repeated ids and invalid coordinates.
    pub fn new(sensors: Vec<Sensor>) -> Result<Self> {
        if sensors.len() < MIN_SENSORS {
            return Err(LocatorError::DegenerateGeometry {
                reason: format!(
                    "{} sensor(s) supplied, at least {} required for a 2-D solve",
                    sensors.len(),
                    MIN_SENSORS
                ),
            });
        }

        let mut seen = HashSet::with_capacity(sensors.len());
        for sensor in &sensors {
            if !seen.insert(sensor.id.as_str()) {
                return Err(LocatorError::DuplicateSensor { sensor_id: sensor.id.clone() });
            }
            sensor.position.validate()?;
        }

        Ok(Self { sensors })
    }

    /// Reference sensor (always the first entry)
    pub fn reference(&self) -> &Sensor {
        &self.sensors[0]
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sensor> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Always false for a constructed set; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Position of the sensor with the given id in the set
    pub fn index_of(&self, sensor_id: &str) -> Option<usize> {
        self.sensors.iter().position(|s| s.id == sensor_id)
    }
}

impl<'a> IntoIterator for &'a SensorSet {
    type Item = &'a Sensor;
    type IntoIter = std::slice::Iter<'a, Sensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.sensors.iter()
    }
}

/// Arrival-time offset of the signal at one sensor (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub sensor_id: String,
    pub time_offset: f64,
}

impl Observation {
    pub fn new(sensor_id: impl Into<String>, time_offset: f64) -> Self {
        Self { sensor_id: sensor_id.into(), time_offset }
    }
}

/// Solver diagnostics returned alongside every estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    /// Objective that was minimized
    pub objective: Objective,
    /// Quasi-Newton iterations performed
    pub iterations: usize,
    /// Objective/gradient evaluations performed
    pub evaluations: usize,
    /// Final objective value (seconds² for pairwise, meters² for absolute range)
    pub cost: f64,
    /// Termination message
    pub message: String,
}

/// Result of a successful location solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEstimate {
    /// Estimated crack position on the local plane
    pub planar: PlanarPosition,
    /// Estimated crack position in decimal degrees
    pub geodetic: GeodeticCoord,
    /// Estimated crack position as a (latitude, longitude) DMS pair, when requested
    pub dms: Option<(String, String)>,
    /// Planar sensor positions the solve was run against, in sensor-set order
    pub sensor_positions: Vec<PlanarPosition>,
    /// Solver diagnostics
    pub report: SolverReport,
}
