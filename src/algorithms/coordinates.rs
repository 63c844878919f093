//! Local tangent-plane coordinate frame
//!
//! Equirectangular projection anchored at a reference sensor:
//!
//! ```text
//! x = R · rad(lon − lon0) · cos(rad(lat0))
//! y = R · rad(lat − lat0)
//! ```
//!
//! The patch is treated as flat and a single reference latitude sets the
//! longitude scale. Error stays at a few meters over spans of tens of
//! kilometers; it grows with the area and blows up towards the poles as
//! `cos(lat0)` approaches zero. This is a small-area model, not a geodesic one.

use crate::core::{GeodeticCoord, PlanarPosition, SensorSet, EARTH_RADIUS_M, HIGH_LATITUDE_WARNING_DEG};
use tracing::{debug, warn};

/// Planar frame anchored at a reference coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    reference: GeodeticCoord,
    /// Meters per radian of longitude at the reference latitude
    lon_scale: f64,
}

impl LocalFrame {
    pub fn new(reference: GeodeticCoord) -> Self {
        if reference.lat.abs() > HIGH_LATITUDE_WARNING_DEG {
            warn!(
                reference_lat = reference.lat,
                "Reference latitude is close to a pole; longitude scale is unreliable"
            );
        }
        Self {
            reference,
            lon_scale: EARTH_RADIUS_M * reference.lat.to_radians().cos(),
        }
    }

    pub fn reference(&self) -> &GeodeticCoord {
        &self.reference
    }

    /// Project a geodetic coordinate onto the plane
    pub fn to_planar(&self, coord: &GeodeticCoord) -> PlanarPosition {
        PlanarPosition {
            x: self.lon_scale * (coord.lon - self.reference.lon).to_radians(),
            y: EARTH_RADIUS_M * (coord.lat - self.reference.lat).to_radians(),
        }
    }

    /// Inverse of [`LocalFrame::to_planar`]
    pub fn to_geodetic(&self, position: &PlanarPosition) -> GeodeticCoord {
        GeodeticCoord {
            lat: self.reference.lat + (position.y / EARTH_RADIUS_M).to_degrees(),
            lon: self.reference.lon + (position.x / self.lon_scale).to_degrees(),
        }
    }
}

/// Project every sensor onto a frame anchored at the reference sensor.
/// The reference sensor lands exactly on the origin.
pub fn project_sensors(sensors: &SensorSet) -> (LocalFrame, Vec<PlanarPosition>) {
    let frame = LocalFrame::new(sensors.reference().position);
    let positions: Vec<PlanarPosition> = sensors
        .iter()
        .map(|sensor| frame.to_planar(&sensor.position))
        .collect();

    debug!(?positions, "Converted sensor coordinates to planar positions");
    (frame, positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sensor;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_reference_maps_to_origin() {
        for reference in [
            GeodeticCoord::new(28.6139, 77.2090),
            GeodeticCoord::new(-33.8688, 151.2093),
            GeodeticCoord::new(51.4778, -0.0015),
            GeodeticCoord::new(0.0, 0.0),
        ] {
            let frame = LocalFrame::new(reference);
            assert_eq!(frame.to_planar(&reference), PlanarPosition::ORIGIN);
            assert_eq!(frame.to_geodetic(&PlanarPosition::ORIGIN), reference);
        }
    }

    #[test]
    fn test_axis_scales() {
        let frame = LocalFrame::new(GeodeticCoord::new(0.0, 0.0));

        // One degree of latitude is R·π/180 meters north
        let north = frame.to_planar(&GeodeticCoord::new(1.0, 0.0));
        assert!(north.x.abs() < 1e-9);
        assert!((north.y - 111_194.926_644_558_73).abs() < 1e-6);

        // At 60° latitude a degree of longitude is half as long as at the equator
        let frame = LocalFrame::new(GeodeticCoord::new(60.0, 10.0));
        let east = frame.to_planar(&GeodeticCoord::new(60.0, 11.0));
        assert!((east.x - 111_194.926_644_558_73 * 0.5).abs() < 1e-6);
        assert!(east.y.abs() < 1e-9);
    }

    #[test]
    fn test_transform_inverse_random_points() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let reference = GeodeticCoord::new(rng.gen_range(-70.0..70.0), rng.gen_range(-179.0..179.0));
            let frame = LocalFrame::new(reference);
            let point = GeodeticCoord::new(
                reference.lat + rng.gen_range(-0.3..0.3),
                reference.lon + rng.gen_range(-0.3..0.3),
            );
            let back = frame.to_geodetic(&frame.to_planar(&point));
            assert!((back.lat - point.lat).abs() < 1e-9);
            assert!((back.lon - point.lon).abs() < 1e-9);
        }
    }

    #[test]
    fn test_project_sensors_anchors_first_sensor() {
        let set = SensorSet::new(vec![
            Sensor::new("D1", GeodeticCoord::new(28.6139, 77.2090)),
            Sensor::new("D2", GeodeticCoord::new(28.7041, 77.1025)),
            Sensor::new("D3", GeodeticCoord::new(28.5355, 77.3910)),
        ])
        .unwrap();

        let (frame, positions) = project_sensors(&set);
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[0], PlanarPosition::ORIGIN);
        assert_eq!(frame.reference(), &set.reference().position);

        // D2 lies north-west of D1, D3 south-east
        assert!(positions[1].x < 0.0 && positions[1].y > 0.0);
        assert!(positions[2].x > 0.0 && positions[2].y < 0.0);
    }
}
