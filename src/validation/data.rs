//! Input validation for observations and propagation speed
//!
//! Everything here runs before any geometry or solver work so that bad input
//! is reported against the field that caused it.

use crate::core::{Observation, SensorSet};
use crate::validation::error::{LocatorError, Result};
use tracing::warn;

/// Check that the propagation speed is a positive, finite number of m/s
pub fn validate_speed(speed: f64) -> Result<f64> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        warn!(speed, "Rejected propagation speed");
        Err(LocatorError::NonPositiveSpeed { speed })
    }
}

/// Match observations to sensors and return the raw time offsets in sensor
/// order.
///
/// Every observation must name a known sensor at most once and carry a finite
/// value; every sensor must have an observation.
pub fn collect_offsets(sensors: &SensorSet, observations: &[Observation]) -> Result<Vec<f64>> {
    let mut offsets: Vec<Option<f64>> = vec![None; sensors.len()];

    for observation in observations {
        let index = sensors.index_of(&observation.sensor_id).ok_or_else(|| {
            warn!(sensor_id = %observation.sensor_id, "Observation for unknown sensor");
            LocatorError::UnknownSensor { sensor_id: observation.sensor_id.clone() }
        })?;

        if !observation.time_offset.is_finite() {
            warn!(sensor_id = %observation.sensor_id, "Non-finite time offset");
            return Err(LocatorError::InvalidObservation {
                sensor_id: observation.sensor_id.clone(),
                reason: format!("time offset {} is not a finite number", observation.time_offset),
            });
        }

        if offsets[index].replace(observation.time_offset).is_some() {
            warn!(sensor_id = %observation.sensor_id, "Duplicate observation");
            return Err(LocatorError::DuplicateObservation { sensor_id: observation.sensor_id.clone() });
        }
    }

    sensors
        .iter()
        .zip(offsets)
        .map(|(sensor, offset)| {
            offset.ok_or_else(|| {
                warn!(sensor_id = %sensor.id, "Missing time for sensor");
                LocatorError::MissingObservation { field: format!("time for sensor {}", sensor.id) }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GeodeticCoord, Sensor};

    fn sensor_set() -> SensorSet {
        SensorSet::new(vec![
            Sensor::new("D1", GeodeticCoord::new(28.6139, 77.2090)),
            Sensor::new("D2", GeodeticCoord::new(28.7041, 77.1025)),
            Sensor::new("D3", GeodeticCoord::new(28.5355, 77.3910)),
        ])
        .unwrap()
    }

    #[test]
    fn test_validate_speed() {
        assert_eq!(validate_speed(343.0).unwrap(), 343.0);
        assert!(matches!(validate_speed(0.0), Err(LocatorError::NonPositiveSpeed { .. })));
        assert!(matches!(validate_speed(-5.0), Err(LocatorError::NonPositiveSpeed { .. })));
        assert!(validate_speed(f64::NAN).is_err());
        assert!(validate_speed(f64::INFINITY).is_err());
    }

    #[test]
    fn test_collect_offsets_in_sensor_order() {
        let observations = vec![
            Observation::new("D3", 0.3),
            Observation::new("D1", 0.1),
            Observation::new("D2", 0.2),
        ];
        assert_eq!(collect_offsets(&sensor_set(), &observations).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_missing_observation() {
        let observations = vec![Observation::new("D1", 0.0), Observation::new("D3", 0.3)];
        match collect_offsets(&sensor_set(), &observations) {
            Err(LocatorError::MissingObservation { field }) => assert!(field.contains("D2")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_duplicate_observations() {
        let unknown = vec![
            Observation::new("D1", 0.0),
            Observation::new("D2", 0.1),
            Observation::new("D7", 0.2),
        ];
        assert!(matches!(
            collect_offsets(&sensor_set(), &unknown),
            Err(LocatorError::UnknownSensor { .. })
        ));

        let duplicate = vec![
            Observation::new("D1", 0.0),
            Observation::new("D2", 0.1),
            Observation::new("D2", 0.2),
            Observation::new("D3", 0.3),
        ];
        assert!(matches!(
            collect_offsets(&sensor_set(), &duplicate),
            Err(LocatorError::DuplicateObservation { .. })
        ));
    }

    #[test]
    fn test_non_finite_offset_rejected() {
        let observations = vec![
            Observation::new("D1", 0.0),
            Observation::new("D2", f64::NAN),
            Observation::new("D3", 0.3),
        ];
        assert!(matches!(
            collect_offsets(&sensor_set(), &observations),
            Err(LocatorError::InvalidObservation { .. })
        ));
    }
}
