//! Sensor geometry pre-check
//!
//! A 2-D TDoA solve is underdetermined when the sensors lie on a line: the
//! objective is flat along that line and the solver would wander. The check
//! uses the eigenvalues of the sensors' 2×2 scatter matrix; the ratio of the
//! minor to the major axis length measures how far the layout is from a line.

use crate::core::{PlanarPosition, MIN_SENSORS};
use crate::validation::error::{LocatorError, Result};
use nalgebra::{Matrix2, Vector2};

/// Minor/major axis ratio below which the layout is treated as collinear
pub const COLLINEARITY_TOLERANCE: f64 = 1e-2;

/// Major-axis RMS spread below which all sensors are treated as co-located (meters)
pub const MIN_SPREAD_M: f64 = 1e-6;

/// Minor-axis RMS spread below which the layout is treated as collinear (meters).
/// Above the rounding of two-decimal DMS seconds (about 0.15 m).
pub const MIN_MINOR_SPREAD_M: f64 = 1.0;

/// Shape summary of a planar sensor layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryAssessment {
    /// Mean sensor position
    pub centroid: PlanarPosition,
    /// RMS distance from the centroid along the major axis (meters)
    pub spread_m: f64,
    /// RMS distance from the centroid along the minor axis (meters)
    pub minor_spread_m: f64,
    /// Minor/major axis length ratio in [0, 1]; 0 for a perfect line
    pub axis_ratio: f64,
    /// Unit vector along the major axis
    pub major_axis: Vector2<f64>,
}

impl GeometryAssessment {
    pub fn is_collinear(&self) -> bool {
        self.axis_ratio < COLLINEARITY_TOLERANCE || self.minor_spread_m < MIN_MINOR_SPREAD_M
    }

    /// Mirror image of `point` across the major axis through the centroid
    pub fn reflect(&self, point: &PlanarPosition) -> PlanarPosition {
        let offset = Vector2::new(point.x - self.centroid.x, point.y - self.centroid.y);
        let along = self.major_axis * offset.dot(&self.major_axis);
        let mirrored = along * 2.0 - offset;
        PlanarPosition::new(self.centroid.x + mirrored.x, self.centroid.y + mirrored.y)
    }
}

/// Mean of a set of planar positions
pub fn centroid(positions: &[PlanarPosition]) -> PlanarPosition {
    if positions.is_empty() {
        return PlanarPosition::ORIGIN;
    }
    let sum = positions
        .iter()
        .fold(Vector2::<f64>::zeros(), |acc, p| acc + Vector2::new(p.x, p.y));
    let mean = sum / positions.len() as f64;
    PlanarPosition::new(mean.x, mean.y)
}

/// Compute centroid, spread and axis ratio of a layout
pub fn assess_geometry(positions: &[PlanarPosition]) -> GeometryAssessment {
    let center = centroid(positions);
    let n = positions.len().max(1) as f64;

    let scatter = positions.iter().fold(Matrix2::<f64>::zeros(), |acc, p| {
        let d = Vector2::new(p.x - center.x, p.y - center.y);
        acc + d * d.transpose()
    }) / n;

    let eigen = scatter.symmetric_eigen();
    let major = eigen.eigenvalues.max().max(0.0);
    let minor = eigen.eigenvalues.min().max(0.0);
    let major_axis: Vector2<f64> = eigen.eigenvectors.column(eigen.eigenvalues.imax()).into_owned();

    let axis_ratio = if major > 0.0 { (minor / major).sqrt() } else { 0.0 };

    GeometryAssessment {
        centroid: center,
        spread_m: major.sqrt(),
        minor_spread_m: minor.sqrt(),
        axis_ratio,
        major_axis,
    }
}

/// Reject layouts that cannot support a 2-D solve
pub fn ensure_well_posed(positions: &[PlanarPosition]) -> Result<GeometryAssessment> {
    if positions.len() < MIN_SENSORS {
        return Err(LocatorError::DegenerateGeometry {
            reason: format!(
                "{} sensor(s) supplied, at least {} required for a 2-D solve",
                positions.len(),
                MIN_SENSORS
            ),
        });
    }

    let assessment = assess_geometry(positions);

    if assessment.spread_m < MIN_SPREAD_M {
        return Err(LocatorError::DegenerateGeometry {
            reason: "all sensors are at the same position".to_string(),
        });
    }

    if assessment.is_collinear() {
        return Err(LocatorError::DegenerateGeometry {
            reason: format!(
                "sensors are collinear (minor/major axis ratio {:.2e}, minor-axis spread {:.2} m)",
                assessment.axis_ratio, assessment.minor_spread_m
            ),
        });
    }

    Ok(assessment)
}
