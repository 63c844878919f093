//! Core positioning algorithms

pub mod dms;
pub mod coordinates;
pub mod geometry;
pub mod minimizer;
pub mod tdoa;

pub use coordinates::{LocalFrame, project_sensors};
pub use geometry::{GeometryAssessment, assess_geometry, ensure_well_posed};
pub use minimizer::{MinimizerOptions, MinimizeOutcome, ObjectiveFunction, Termination, minimize};
pub use tdoa::{Objective, SolverOptions, TdoaSolution, predicted_offsets, rms_residual_m, solve};
