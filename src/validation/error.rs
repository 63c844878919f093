use crate::core::Axis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for locator operations
pub type Result<T> = std::result::Result<T, LocatorError>;

/// Failures reported by the crack location pipeline
#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Invalid coordinate format '{input}': {reason}")]
    InvalidCoordinateFormat { input: String, reason: String },

    #[error("{axis} {value} is out of range")]
    CoordinateOutOfRange { axis: Axis, value: f64 },

    #[error("Missing observation: {field}")]
    MissingObservation { field: String },

    #[error("Invalid number for {field}: '{input}'")]
    InvalidNumber { field: String, input: String },

    #[error("Invalid observation for sensor {sensor_id}: {reason}")]
    InvalidObservation { sensor_id: String, reason: String },

    #[error("Observation refers to unknown sensor {sensor_id}")]
    UnknownSensor { sensor_id: String },

    #[error("Duplicate sensor id: {sensor_id}")]
    DuplicateSensor { sensor_id: String },

    #[error("Duplicate observation for sensor {sensor_id}")]
    DuplicateObservation { sensor_id: String },

    #[error("Propagation speed must be a positive number of m/s, got {speed}")]
    NonPositiveSpeed { speed: f64 },

    #[error("Degenerate sensor geometry: {reason}")]
    DegenerateGeometry { reason: String },

    #[error("Optimization failed after {iterations} iterations: {message}")]
    OptimizationFailure { message: String, iterations: usize },

    #[error("Rendering failed: {reason}")]
    Render { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable classification of [`LocatorError`] for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCoordinateFormat,
    MissingObservation,
    InvalidInput,
    NonPositiveSpeed,
    DegenerateGeometry,
    OptimizationFailure,
    Output,
    Configuration,
}

impl LocatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocatorError::InvalidCoordinateFormat { .. }
            | LocatorError::CoordinateOutOfRange { .. } => ErrorKind::InvalidCoordinateFormat,
            LocatorError::MissingObservation { .. } => ErrorKind::MissingObservation,
            LocatorError::InvalidNumber { .. }
            | LocatorError::InvalidObservation { .. }
            | LocatorError::UnknownSensor { .. }
            | LocatorError::DuplicateObservation { .. } => ErrorKind::InvalidInput,
            LocatorError::NonPositiveSpeed { .. } => ErrorKind::NonPositiveSpeed,
            LocatorError::DuplicateSensor { .. }
            | LocatorError::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            LocatorError::OptimizationFailure { .. } => ErrorKind::OptimizationFailure,
            LocatorError::Render { .. } | LocatorError::Io(_) => ErrorKind::Output,
            LocatorError::Config { .. } => ErrorKind::Configuration,
        }
    }

    /// Short user-facing explanation for the error kind
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidCoordinateFormat => {
                "A sensor coordinate is malformed. Expected decimal degrees or a form like 28°07′12″N."
            }
            ErrorKind::MissingObservation => {
                "Please provide both the propagation speed and a time for every sensor."
            }
            ErrorKind::InvalidInput => "Invalid input. Please check your values and try again.",
            ErrorKind::NonPositiveSpeed => "The propagation speed must be greater than zero.",
            ErrorKind::DegenerateGeometry => {
                "The sensor layout cannot locate a source: use at least three sensors that are not in a line."
            }
            ErrorKind::OptimizationFailure => {
                "Could not determine the crack location: the solver did not converge."
            }
            ErrorKind::Output => "The result could not be written.",
            ErrorKind::Configuration => "The sensor configuration could not be loaded.",
        }
    }
}
