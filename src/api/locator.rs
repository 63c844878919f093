//! Location facade
//!
//! Runs the full pipeline for one request: validate the propagation speed,
//! match observations to sensors, normalize offsets to the reference sensor,
//! project onto the local plane, check the geometry, solve, and convert the
//! estimate back to geodetic coordinates.

use crate::algorithms::coordinates::project_sensors;
use crate::algorithms::dms::format_dms_pair;
use crate::algorithms::geometry::ensure_well_posed;
use crate::algorithms::tdoa::solve;
use crate::api::types::LocateOptions;
use crate::core::{LocationEstimate, Observation, SensorSet};
use crate::validation::data::{collect_offsets, validate_speed};
use crate::validation::error::Result;
use tracing::{debug, error, info, info_span};

/// Shift offsets so the first (reference) entry is exactly zero
pub fn normalize_offsets(offsets: &[f64]) -> Vec<f64> {
    let Some(&reference) = offsets.first() else {
        return Vec::new();
    };
    offsets.iter().map(|t| t - reference).collect()
}

/// Stateless crack locator
#[derive(Debug, Clone, Copy, Default)]
pub struct Locator {
    options: LocateOptions,
}

impl Locator {
    pub fn new(options: LocateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    /// Estimate the crack position from one arrival-time offset per sensor
    pub fn locate(
        &self,
        sensors: &SensorSet,
        observations: &[Observation],
        speed: f64,
    ) -> Result<LocationEstimate> {
        let span = info_span!(
            "locate",
            sensors = sensors.len(),
            speed,
            objective = %self.options.solver.objective
        );
        let _guard = span.enter();

        let result = self.run_pipeline(sensors, observations, speed);
        if let Err(e) = &result {
            error!(kind = ?e.kind(), error = %e, "Location failed");
        }
        result
    }

    fn run_pipeline(
        &self,
        sensors: &SensorSet,
        observations: &[Observation],
        speed: f64,
    ) -> Result<LocationEstimate> {
        let speed = validate_speed(speed)?;

        let raw_offsets = collect_offsets(sensors, observations)?;
        let offsets = normalize_offsets(&raw_offsets);
        debug!(stage = "normalize", ?offsets, reference = %sensors.reference().id, "Offsets normalized");

        let (frame, positions) = project_sensors(sensors);
        debug!(stage = "project", reference = %frame.reference(), "Sensors projected");

        let assessment = ensure_well_posed(&positions)?;
        debug!(
            stage = "geometry",
            spread_m = assessment.spread_m,
            axis_ratio = assessment.axis_ratio,
            "Geometry accepted"
        );

        let solution = solve(&positions, &offsets, speed, &self.options.solver)?;
        let geodetic = frame.to_geodetic(&solution.position);
        let dms = self.options.include_dms.then(|| format_dms_pair(&geodetic)).transpose()?;

        info!(
            stage = "solve",
            x = solution.position.x,
            y = solution.position.y,
            lat = geodetic.lat,
            lon = geodetic.lon,
            iterations = solution.report.iterations,
            cost = solution.report.cost,
            "Crack located"
        );

        Ok(LocationEstimate {
            planar: solution.position,
            geodetic,
            dms,
            sensor_positions: positions,
            report: solution.report,
        })
    }
}

/// Locate with default options
pub fn locate(sensors: &SensorSet, observations: &[Observation], speed: f64) -> Result<LocationEstimate> {
    Locator::default().locate(sensors, observations, speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::coordinates::LocalFrame;
    use crate::algorithms::tdoa::{predicted_offsets, Objective};
    use crate::core::{GeodeticCoord, PlanarPosition, Sensor};
    use crate::validation::error::LocatorError;

    const REFERENCE: GeodeticCoord = GeodeticCoord { lat: 28.6139, lon: 77.2090 };

    fn planar_sensor_set(points: &[(f64, f64)]) -> SensorSet {
        let frame = LocalFrame::new(REFERENCE);
        let sensors = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Sensor::new(format!("D{}", i + 1), frame.to_geodetic(&PlanarPosition::new(x, y)))
            })
            .collect();
        SensorSet::new(sensors).unwrap()
    }

    fn observations_for(sensors: &SensorSet, offsets: &[f64]) -> Vec<Observation> {
        sensors
            .iter()
            .zip(offsets)
            .map(|(sensor, &t)| Observation::new(sensor.id.clone(), t))
            .collect()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_locator_is_send_and_sync() {
        assert_send_sync::<Locator>();
        assert_send_sync::<SensorSet>();
        assert_send_sync::<LocationEstimate>();
    }

    #[test]
    fn test_concurrent_locates_share_one_locator() {
        let points = [(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)];
        let sensors = planar_sensor_set(&points);
        let planar: Vec<PlanarPosition> = points.iter().map(|&(x, y)| PlanarPosition::new(x, y)).collect();
        let locator = Locator::default();
        let emitters = [PlanarPosition::new(250.0, 720.0), PlanarPosition::new(640.0, 180.0)];

        let estimates: Vec<LocationEstimate> = std::thread::scope(|scope| {
            let handles: Vec<_> = emitters
                .iter()
                .map(|emitter| {
                    let observations = observations_for(&sensors, &predicted_offsets(&planar, emitter, 343.0));
                    let (locator, sensors) = (&locator, &sensors);
                    scope.spawn(move || locator.locate(sensors, &observations, 343.0).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (estimate, emitter) in estimates.iter().zip(&emitters) {
            assert!(estimate.planar.distance_to(emitter) < 1.0, "estimate {:?}", estimate.planar);
        }
    }

    #[test]
    fn test_locate_rejects_nearly_collinear_sensors() {
        let points = [(0.0, 0.0), (1000.0, 0.01), (2000.0, 0.0)];
        let sensors = planar_sensor_set(&points);
        let planar: Vec<PlanarPosition> = points.iter().map(|&(x, y)| PlanarPosition::new(x, y)).collect();
        let offsets = predicted_offsets(&planar, &PlanarPosition::new(1000.0, 500.0), 343.0);

        assert!(matches!(
            locate(&sensors, &observations_for(&sensors, &offsets), 343.0),
            Err(LocatorError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_normalize_offsets() {
        let normalized = normalize_offsets(&[0.125, 0.5, 0.0625]);
        assert_eq!(normalized[0], 0.0);
        assert_eq!(normalized, vec![0.0, 0.375, -0.0625]);
        assert!(normalize_offsets(&[]).is_empty());
    }

    #[test]
    fn test_locate_recovers_emitter() {
        let points = [(0.0, 0.0), (1000.0, 0.0), (0.0, 1000.0)];
        let sensors = planar_sensor_set(&points);
        let planar: Vec<PlanarPosition> = points.iter().map(|&(x, y)| PlanarPosition::new(x, y)).collect();
        let emitter = PlanarPosition::new(500.0, 500.0);
        let offsets = predicted_offsets(&planar, &emitter, 343.0);

        let estimate = locate(&sensors, &observations_for(&sensors, &offsets), 343.0).unwrap();

        assert!(estimate.planar.distance_to(&emitter) < 1.0, "estimate {:?}", estimate.planar);
        let expected = LocalFrame::new(REFERENCE).to_geodetic(&emitter);
        assert!((estimate.geodetic.lat - expected.lat).abs() < 1e-5);
        assert!((estimate.geodetic.lon - expected.lon).abs() < 1e-5);
        assert!(estimate.dms.is_some());
        assert_eq!(estimate.sensor_positions.len(), 3);
    }

    #[test]
    fn test_locate_ignores_reference_offset() {
        let points = [(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)];
        let sensors = planar_sensor_set(&points);
        let planar: Vec<PlanarPosition> = points.iter().map(|&(x, y)| PlanarPosition::new(x, y)).collect();
        let emitter = PlanarPosition::new(300.0, 650.0);
        let shifted: Vec<f64> = predicted_offsets(&planar, &emitter, 343.0)
            .iter()
            .map(|t| t + 1.25)
            .collect();

        let estimate = locate(&sensors, &observations_for(&sensors, &shifted), 343.0).unwrap();
        assert!(estimate.planar.distance_to(&emitter) < 1.0, "estimate {:?}", estimate.planar);
    }

    #[test]
    fn test_locate_rejects_non_positive_speed() {
        let sensors = planar_sensor_set(&[(0.0, 0.0), (1000.0, 0.0), (0.0, 1000.0)]);
        let observations = observations_for(&sensors, &[0.0, 0.1, 0.2]);

        for speed in [0.0, -343.0] {
            assert!(matches!(
                locate(&sensors, &observations, speed),
                Err(LocatorError::NonPositiveSpeed { .. })
            ));
        }
    }

    #[test]
    fn test_locate_rejects_collinear_sensors() {
        let sensors = planar_sensor_set(&[(0.0, 0.0), (500.0, 0.0), (1000.0, 0.0)]);
        let observations = observations_for(&sensors, &[0.0, 0.1, 0.2]);
        assert!(matches!(
            locate(&sensors, &observations, 343.0),
            Err(LocatorError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_locate_reports_missing_time() {
        let sensors = planar_sensor_set(&[(0.0, 0.0), (1000.0, 0.0), (0.0, 1000.0)]);
        let observations = vec![Observation::new("D1", 0.0), Observation::new("D2", 0.1)];
        match locate(&sensors, &observations, 343.0) {
            Err(LocatorError::MissingObservation { field }) => assert!(field.contains("D3")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_locator_without_dms() {
        let points = [(0.0, 0.0), (1000.0, 0.0), (0.0, 1000.0)];
        let sensors = planar_sensor_set(&points);
        let planar: Vec<PlanarPosition> = points.iter().map(|&(x, y)| PlanarPosition::new(x, y)).collect();
        let offsets = predicted_offsets(&planar, &PlanarPosition::new(400.0, 300.0), 343.0);

        let locator = Locator::new(LocateOptions::default().with_dms(false));
        let estimate = locator.locate(&sensors, &observations_for(&sensors, &offsets), 343.0).unwrap();
        assert!(estimate.dms.is_none());
        assert_eq!(estimate.report.objective, Objective::Pairwise);
    }
}
