//! Raw input parsing
//!
//! Turns text from a form, a command line or a console prompt into the
//! speed and observations the locator works with. Absent or blank fields are
//! reported as missing; anything else that does not parse as a number is
//! reported as invalid.

use crate::core::{Observation, SensorSet};
use crate::validation::data::validate_speed;
use crate::validation::error::{LocatorError, Result};
use std::collections::HashMap;

fn parse_number(field: &str, raw: Option<&str>) -> Result<f64> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(LocatorError::MissingObservation { field: field.to_string() });
    }

    let value: f64 = text.parse().map_err(|_| LocatorError::InvalidNumber {
        field: field.to_string(),
        input: text.to_string(),
    })?;

    if !value.is_finite() {
        return Err(LocatorError::InvalidNumber {
            field: field.to_string(),
            input: text.to_string(),
        });
    }
    Ok(value)
}

/// Parse the propagation speed (m/s)
pub fn parse_speed(raw: Option<&str>) -> Result<f64> {
    let speed = parse_number("propagation speed", raw)?;
    validate_speed(speed)
}

/// Parse one sensor's arrival-time offset (seconds)
pub fn parse_time(sensor_id: &str, raw: Option<&str>) -> Result<Observation> {
    let time_offset = parse_number(&format!("time for sensor {}", sensor_id), raw)?;
    Ok(Observation::new(sensor_id, time_offset))
}

/// Parse one time per sensor, in sensor-set order
pub fn parse_observations(sensors: &SensorSet, times: &HashMap<String, String>) -> Result<Vec<Observation>> {
    if let Some(unknown) = times.keys().find(|id| sensors.index_of(id).is_none()) {
        return Err(LocatorError::UnknownSensor { sensor_id: unknown.clone() });
    }

    sensors
        .iter()
        .map(|sensor| parse_time(&sensor.id, times.get(&sensor.id).map(String::as_str)))
        .collect()
}

/// Split an `ID=SECONDS` argument into its parts
pub fn split_time_assignment(text: &str) -> Result<(String, String)> {
    match text.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => Ok((id.trim().to_string(), value.trim().to_string())),
        _ => Err(LocatorError::InvalidNumber {
            field: "sensor time (expected ID=SECONDS)".to_string(),
            input: text.to_string(),
        }),
    }
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
    fn test_parse_speed() {
        assert_eq!(parse_speed(Some(" 343 ")).unwrap(), 343.0);
        assert!(matches!(parse_speed(None), Err(LocatorError::MissingObservation { .. })));
        assert!(matches!(parse_speed(Some("   ")), Err(LocatorError::MissingObservation { .. })));
        assert!(matches!(parse_speed(Some("fast")), Err(LocatorError::InvalidNumber { .. })));
        assert!(matches!(parse_speed(Some("0")), Err(LocatorError::NonPositiveSpeed { .. })));
        assert!(matches!(parse_speed(Some("-12.5")), Err(LocatorError::NonPositiveSpeed { .. })));
        assert!(matches!(parse_speed(Some("inf")), Err(LocatorError::InvalidNumber { .. })));
    }

    #[test]
    fn test_parse_time() {
        let observation = parse_time("D2", Some("0.125")).unwrap();
        assert_eq!(observation, Observation::new("D2", 0.125));

        match parse_time("D2", Some("abc")) {
            Err(LocatorError::InvalidNumber { field, input }) => {
                assert!(field.contains("D2"));
                assert_eq!(input, "abc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_observations() {
        let times: HashMap<String, String> = [("D3", "0.3"), ("D1", "0"), ("D2", "-0.2")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let observations = parse_observations(&sensor_set(), &times).unwrap();
        let ids: Vec<&str> = observations.iter().map(|o| o.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D2", "D3"]);
        assert_eq!(observations[1].time_offset, -0.2);
    }

    #[test]
    fn test_parse_observations_missing_and_unknown() {
        let mut times: HashMap<String, String> = HashMap::new();
        times.insert("D1".to_string(), "0".to_string());
        times.insert("D2".to_string(), "".to_string());
        times.insert("D3".to_string(), "0.1".to_string());
        match parse_observations(&sensor_set(), &times) {
            Err(LocatorError::MissingObservation { field }) => assert!(field.contains("D2")),
            other => panic!("unexpected result: {:?}", other),
        }

        times.insert("D2".to_string(), "0.2".to_string());
        times.insert("D9".to_string(), "0.2".to_string());
        assert!(matches!(
            parse_observations(&sensor_set(), &times),
            Err(LocatorError::UnknownSensor { .. })
        ));
    }

    #[test]
    fn test_split_time_assignment() {
        assert_eq!(
            split_time_assignment("D1=0.5").unwrap(),
            ("D1".to_string(), "0.5".to_string())
        );
        assert!(split_time_assignment("0.5").is_err());
        assert!(split_time_assignment("=0.5").is_err());
    }
}
