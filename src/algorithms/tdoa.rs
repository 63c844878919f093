//! Time-difference-of-arrival solver
//!
//! Recovers the planar emitter position from sensor positions, a propagation
//! speed and per-sensor arrival-time offsets by bounded nonlinear least
//! squares.
//!
//! Two objectives are available:
//!
//! - [`Objective::Pairwise`] (default): for every unordered sensor pair
//!   `(i, j)` the predicted delay `(‖x−p_j‖ − ‖x−p_i‖)/v` is compared with the
//!   observed delay `t_j − t_i`. Only relative arrival times enter, so adding a
//!   constant to every offset leaves the solution unchanged.
//! - [`Objective::AbsoluteRange`] (legacy): every offset is taken as an
//!   absolute travel time and `‖x−p_i‖` is compared with `v·t_i`. This only
//!   agrees with the pairwise model when the reference sensor's true travel
//!   time is zero.
//!
//! The pairwise sum is minimized in range units (multiplied by `v²`) so the
//! minimizer's tolerances are in meters; the reported cost is converted back
//! to seconds².

use crate::algorithms::geometry::{assess_geometry, centroid};
use crate::algorithms::minimizer::{minimize, MinimizeOutcome, MinimizerOptions, ObjectiveFunction};
use crate::core::{PlanarPosition, SolverReport, DEFAULT_BOUNDS_BUFFER_M};
use crate::validation::error::{LocatorError, Result};
use nalgebra::{DVector, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Distances below this are treated as "on the sensor" when forming unit vectors (meters)
const COINCIDENCE_EPS_M: f64 = 1e-9;

/// Axis ratio below which the solve is repeated from the mirrored first solution
pub const THIN_LAYOUT_RATIO: f64 = 0.1;

/// Two solutions further apart than this are distinct (meters)
const DISTINCT_SOLUTION_M: f64 = 1.0;

/// Minimized cost at or below which a fit is exact (meters²)
const EXACT_FIT_COST_M2: f64 = 1e-4;

/// RMS residual per objective term above which a converged fit is reported as inconsistent (meters)
pub const INCONSISTENT_FIT_RMS_M: f64 = 10.0;

/// Least-squares objective used by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Pairwise time differences (canonical TDoA model)
    #[default]
    Pairwise,
    /// Per-sensor absolute ranges `v·t_i`
    AbsoluteRange,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Pairwise => write!(f, "pairwise"),
            Objective::AbsoluteRange => write!(f, "absolute-range"),
        }
    }
}

/// Solver configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub objective: Objective,
    /// Padding around the sensor bounding box for the search box (meters)
    pub bounds_buffer_m: f64,
    pub minimizer: MinimizerOptions,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            objective: Objective::Pairwise,
            bounds_buffer_m: DEFAULT_BOUNDS_BUFFER_M,
            minimizer: MinimizerOptions::default(),
        }
    }
}

/// Planar solution with its diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct TdoaSolution {
    pub position: PlanarPosition,
    pub report: SolverReport,
}

/// Distance from `x` to `p` and the unit vector pointing from `p` to `x`
fn range_and_unit(x: &Vector2<f64>, p: &PlanarPosition) -> (f64, Vector2<f64>) {
    let diff = x - Vector2::new(p.x, p.y);
    let range = diff.norm();
    if range > COINCIDENCE_EPS_M {
        (range, diff / range)
    } else {
        (range, Vector2::zeros())
    }
}

/// Pairwise range-difference residuals, `Σ ((d_j − d_i) − v(t_j − t_i))²`
struct PairwiseObjective<'a> {
    positions: &'a [PlanarPosition],
    /// `v · t_k` per sensor (meters)
    range_offsets: Vec<f64>,
}

impl ObjectiveFunction for PairwiseObjective<'_> {
    fn evaluate(&self, x: &DVector<f64>) -> (f64, DVector<f64>) {
        let point = Vector2::new(x[0], x[1]);
        let ranges: Vec<(f64, Vector2<f64>)> = self
            .positions
            .iter()
            .map(|p| range_and_unit(&point, p))
            .collect();

        let mut value = 0.0;
        let mut gradient = Vector2::<f64>::zeros();
        for i in 0..ranges.len() {
            for j in (i + 1)..ranges.len() {
                let (d_i, u_i) = ranges[i];
                let (d_j, u_j) = ranges[j];
                let residual = (d_j - d_i) - (self.range_offsets[j] - self.range_offsets[i]);
                value += residual * residual;
                gradient += (u_j - u_i) * (2.0 * residual);
            }
        }

        (value, DVector::from_column_slice(gradient.as_slice()))
    }
}

/// Absolute range residuals, `Σ (d_i − v·t_i)²`
struct AbsoluteRangeObjective<'a> {
    positions: &'a [PlanarPosition],
    ranges: Vec<f64>,
}

impl ObjectiveFunction for AbsoluteRangeObjective<'_> {
    fn evaluate(&self, x: &DVector<f64>) -> (f64, DVector<f64>) {
        let point = Vector2::new(x[0], x[1]);
        let mut value = 0.0;
        let mut gradient = Vector2::<f64>::zeros();
        for (p, expected) in self.positions.iter().zip(&self.ranges) {
            let (d, u) = range_and_unit(&point, p);
            let residual = d - expected;
            value += residual * residual;
            gradient += u * (2.0 * residual);
        }

        (value, DVector::from_column_slice(gradient.as_slice()))
    }
}

/// Axis-aligned search box: sensor bounding box padded by `buffer_m` on every side
pub fn search_bounds(positions: &[PlanarPosition], buffer_m: f64) -> [(f64, f64); 2] {
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in positions {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    [
        (min_x - buffer_m, max_x + buffer_m),
        (min_y - buffer_m, max_y + buffer_m),
    ]
}

/// RMS residual per objective term for a minimized cost in meters²
pub fn rms_residual_m(objective: Objective, value_m2: f64, sensor_count: usize) -> f64 {
    let terms = match objective {
        Objective::Pairwise => sensor_count * sensor_count.saturating_sub(1) / 2,
        Objective::AbsoluteRange => sensor_count,
    };
    if terms == 0 {
        return 0.0;
    }
    (value_m2.max(0.0) / terms as f64).sqrt()
}

/// Both runs converged to distinct points that fit the data equally well
fn is_ambiguous(first: &MinimizeOutcome, second: &MinimizeOutcome) -> bool {
    if (&first.x - &second.x).norm() <= DISTINCT_SOLUTION_M {
        return false;
    }
    let low = first.value.min(second.value);
    let high = first.value.max(second.value);
    high <= EXACT_FIT_COST_M2 || low >= 0.5 * high
}

fn outcome_position(outcome: &MinimizeOutcome) -> PlanarPosition {
    PlanarPosition::new(outcome.x[0], outcome.x[1])
}

/// Arrival-time offsets an emitter at `emitter` would produce, relative to
/// the first sensor (seconds). The first entry is always zero.
pub fn predicted_offsets(positions: &[PlanarPosition], emitter: &PlanarPosition, speed: f64) -> Vec<f64> {
    let Some(reference) = positions.first() else {
        return Vec::new();
    };
    let reference_range = reference.distance_to(emitter);
    positions
        .iter()
        .map(|p| (p.distance_to(emitter) - reference_range) / speed)
        .collect()
}

/// Solve for the emitter position.
///
/// `offsets` holds one arrival-time offset per entry of `positions`, in the
/// same order. Solver non-convergence is returned as
/// [`LocatorError::OptimizationFailure`] carrying the termination message.
pub fn solve(
    positions: &[PlanarPosition],
    offsets: &[f64],
    speed: f64,
    options: &SolverOptions,
) -> Result<TdoaSolution> {
    if !(speed.is_finite() && speed > 0.0) {
        return Err(LocatorError::NonPositiveSpeed { speed });
    }
    if offsets.len() != positions.len() {
        return Err(LocatorError::MissingObservation {
            field: format!(
                "{} time offset(s) for {} sensor(s)",
                offsets.len(),
                positions.len()
            ),
        });
    }
    if !(options.bounds_buffer_m.is_finite() && options.bounds_buffer_m >= 0.0) {
        return Err(LocatorError::Config {
            message: format!("bounds buffer must be a non-negative distance, got {}", options.bounds_buffer_m),
        });
    }

    let start = centroid(positions);
    let bounds = search_bounds(positions, options.bounds_buffer_m);
    let range_offsets: Vec<f64> = offsets.iter().map(|t| speed * t).collect();

    debug!(
        objective = %options.objective,
        initial_x = start.x,
        initial_y = start.y,
        ?bounds,
        "Starting TDoA solve"
    );

    let objective: Box<dyn ObjectiveFunction + '_> = match options.objective {
        Objective::Pairwise => Box::new(PairwiseObjective { positions, range_offsets }),
        Objective::AbsoluteRange => Box::new(AbsoluteRangeObjective { positions, ranges: range_offsets }),
    };
    let run_from = |from: &PlanarPosition| {
        let initial = DVector::from_vec(vec![from.x, from.y]);
        minimize(objective.as_ref(), &initial, &bounds, &options.minimizer)
    };

    let mut outcome = run_from(&start);

    debug!(
        iterations = outcome.iterations,
        evaluations = outcome.evaluations,
        value = outcome.value,
        termination = ?outcome.termination,
        "TDoA solve finished"
    );

    if !outcome.success() {
        warn!(
            iterations = outcome.iterations,
            message = outcome.message(),
            "TDoA solver did not converge"
        );
        return Err(LocatorError::OptimizationFailure {
            message: outcome.message().to_string(),
            iterations: outcome.iterations,
        });
    }

    // Thin layouts have a mirror-image basin across the principal axis
    let geometry = assess_geometry(positions);
    if geometry.axis_ratio < THIN_LAYOUT_RATIO {
        let first = outcome_position(&outcome);
        let mirrored_start = geometry.reflect(&first);
        if mirrored_start.distance_to(&first) > DISTINCT_SOLUTION_M {
            let mirrored = run_from(&mirrored_start);
            debug!(
                value = mirrored.value,
                termination = ?mirrored.termination,
                "Mirrored TDoA solve finished"
            );
            if mirrored.success() {
                if is_ambiguous(&outcome, &mirrored) {
                    let second = outcome_position(&mirrored);
                    warn!(
                        first_x = first.x,
                        first_y = first.y,
                        second_x = second.x,
                        second_y = second.y,
                        axis_ratio = geometry.axis_ratio,
                        "Sensor layout cannot tell mirror-image solutions apart"
                    );
                    return Err(LocatorError::DegenerateGeometry {
                        reason: format!(
                            "sensors are nearly collinear; ({:.1}, {:.1}) m and ({:.1}, {:.1}) m fit the times equally well",
                            first.x, first.y, second.x, second.y
                        ),
                    });
                }
                if mirrored.value < outcome.value {
                    outcome = mirrored;
                }
            }
        }
    }

    let rms_m = rms_residual_m(options.objective, outcome.value, positions.len());
    if rms_m > INCONSISTENT_FIT_RMS_M {
        warn!(
            rms_residual_m = rms_m,
            x = outcome.x[0],
            y = outcome.x[1],
            "Converged fit does not match the arrival times; possible local minimum or bad timings"
        );
    }

    let cost = match options.objective {
        Objective::Pairwise => outcome.value / (speed * speed),
        Objective::AbsoluteRange => outcome.value,
    };

    Ok(TdoaSolution {
        position: outcome_position(&outcome),
        report: SolverReport {
            objective: options.objective,
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
            cost,
            message: outcome.message().to_string(),
        },
    })
}
