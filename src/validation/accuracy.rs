use crate::algorithms::geometry::ensure_well_posed;
use crate::algorithms::tdoa::{predicted_offsets, solve, SolverOptions};
use crate::core::PlanarPosition;
use crate::validation::data::validate_speed;
use crate::validation::error::{LocatorError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Accuracy statistics over simulated solves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStatistics {
    /// Mean position error (meters)
    pub mean_error_m: f64,
    /// Root mean square error (meters)
    pub rmse_m: f64,
    /// 95th percentile error (meters)
    pub p95_error_m: f64,
    /// Largest observed error (meters)
    pub max_error_m: f64,
    /// Successful solves
    pub samples: usize,
    /// Solves that ended in an optimization failure
    pub failures: usize,
}

impl AccuracyStatistics {
    /// Summarize per-trial position errors
    pub fn from_errors(errors: &[f64], failures: usize) -> Self {
        if errors.is_empty() {
            return Self {
                mean_error_m: 0.0,
                rmse_m: 0.0,
                p95_error_m: 0.0,
                max_error_m: 0.0,
                samples: 0,
                failures,
            };
        }

        let n = errors.len();
        let mean_error_m = errors.iter().sum::<f64>() / n as f64;
        let rmse_m = (errors.iter().map(|e| e * e).sum::<f64>() / n as f64).sqrt();

        let mut sorted = errors.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let index_95 = ((n as f64 * 0.95).ceil() as usize).saturating_sub(1).min(n - 1);

        Self {
            mean_error_m,
            rmse_m,
            p95_error_m: sorted[index_95],
            max_error_m: sorted[n - 1],
            samples: n,
            failures,
        }
    }
}

/// Monte Carlo accuracy validation for a sensor layout
///
/// Perturbs exact arrival offsets with Gaussian timing noise and re-solves to
/// estimate how measurement jitter maps to position error.
#[derive(Debug, Clone, Default)]
pub struct AccuracyValidator {
    options: SolverOptions,
}

impl AccuracyValidator {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn simulate(
        &self,
        positions: &[PlanarPosition],
        emitter: &PlanarPosition,
        speed: f64,
        timing_noise_s: f64,
        trials: usize,
        seed: u64,
    ) -> Result<AccuracyStatistics> {
        let speed = validate_speed(speed)?;
        ensure_well_posed(positions)?;

        let invalid_noise = || LocatorError::InvalidNumber {
            field: "timing noise".to_string(),
            input: timing_noise_s.to_string(),
        };
        if !(timing_noise_s.is_finite() && timing_noise_s >= 0.0) {
            return Err(invalid_noise());
        }
        let noise = Normal::new(0.0, timing_noise_s).map_err(|_| invalid_noise())?;
        let mut rng = StdRng::seed_from_u64(seed);
        let exact = predicted_offsets(positions, emitter, speed);

        let mut errors = Vec::with_capacity(trials);
        let mut failures = 0;

        for trial in 0..trials {
            let noisy: Vec<f64> = exact.iter().map(|t| t + noise.sample(&mut rng)).collect();
            let reference = noisy[0];
            let offsets: Vec<f64> = noisy.iter().map(|t| t - reference).collect();

            match solve(positions, &offsets, speed, &self.options) {
                Ok(solution) => errors.push(solution.position.distance_to(emitter)),
                Err(e @ (LocatorError::OptimizationFailure { .. } | LocatorError::DegenerateGeometry { .. })) => {
                    debug!(trial, error = %e, "Simulated solve failed");
                    failures += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let stats = AccuracyStatistics::from_errors(&errors, failures);
        info!(
            trials,
            timing_noise_s,
            mean_error_m = stats.mean_error_m,
            rmse_m = stats.rmse_m,
            failures,
            "Accuracy simulation complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<PlanarPosition> {
        vec![
            PlanarPosition::new(0.0, 0.0),
            PlanarPosition::new(1000.0, 0.0),
            PlanarPosition::new(1000.0, 1000.0),
            PlanarPosition::new(0.0, 1000.0),
        ]
    }

    #[test]
    fn test_statistics_calculation() {
        let stats = AccuracyStatistics::from_errors(&[0.5, 1.0, 1.5], 1);
        assert!((stats.mean_error_m - 1.0).abs() < 1e-12);
        assert!((stats.rmse_m - (3.5f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.max_error_m, 1.5);
        assert_eq!(stats.p95_error_m, 1.5);
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.failures, 1);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = AccuracyStatistics::from_errors(&[], 4);
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.failures, 4);
        assert_eq!(stats.mean_error_m, 0.0);
    }

    #[test]
    fn test_noise_free_simulation_is_exact() {
        let validator = AccuracyValidator::default();
        let stats = validator
            .simulate(&square(), &PlanarPosition::new(400.0, 550.0), 343.0, 0.0, 5, 1)
            .unwrap();
        assert_eq!(stats.samples, 5);
        assert_eq!(stats.failures, 0);
        assert!(stats.max_error_m < 1.0);
    }

    #[test]
    fn test_noisy_simulation_is_reproducible() {
        let validator = AccuracyValidator::default();
        let emitter = PlanarPosition::new(400.0, 550.0);
        let a = validator.simulate(&square(), &emitter, 343.0, 1e-4, 20, 99).unwrap();
        let b = validator.simulate(&square(), &emitter, 343.0, 1e-4, 20, 99).unwrap();

        assert_eq!(a, b);
        assert!(a.rmse_m >= a.mean_error_m);
        assert!(a.max_error_m >= a.p95_error_m);
        assert!(a.mean_error_m > 0.0);
    }

    #[test]
    fn test_negative_noise_rejected() {
        let validator = AccuracyValidator::default();
        let result = validator.simulate(&square(), &PlanarPosition::new(1.0, 1.0), 343.0, -1.0, 5, 1);
        assert!(matches!(result, Err(LocatorError::InvalidNumber { .. })));

        for noise in [f64::NAN, f64::INFINITY] {
            let result = validator.simulate(&square(), &PlanarPosition::new(1.0, 1.0), 343.0, noise, 5, 1);
            assert!(matches!(result, Err(LocatorError::InvalidNumber { .. })));
        }
    }

    #[test]
    fn test_speed_checked_before_any_trial() {
        let validator = AccuracyValidator::default();
        for speed in [0.0, -343.0, f64::NAN] {
            let result = validator.simulate(&square(), &PlanarPosition::new(1.0, 1.0), speed, 1e-4, 0, 1);
            assert!(
                matches!(result, Err(LocatorError::NonPositiveSpeed { .. })),
                "speed {} gave {:?}",
                speed,
                result
            );
        }
    }
}
