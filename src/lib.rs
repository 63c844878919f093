//! Crack Location System
//!
//! Locates the source of an acoustic or vibration event (a structural crack)
//! from the arrival-time offsets measured by a fixed set of sensors, using
//! time-difference-of-arrival (TDoA) multilateration on a local tangent plane.

pub mod core;
pub mod algorithms;
pub mod api;
pub mod validation;
pub mod utils;

// Re-export commonly used types
pub use core::{
    Axis, GeodeticCoord, PlanarPosition, Sensor, SensorSet, Observation, LocationEstimate,
    SolverReport, EARTH_RADIUS_M, DEFAULT_BOUNDS_BUFFER_M,
};
pub use algorithms::coordinates::{LocalFrame, project_sensors};
pub use algorithms::dms::{DmsAngle, Hemisphere, parse_dms, parse_dms_pair, format_dms, format_dms_pair};
pub use algorithms::tdoa::{Objective, SolverOptions, TdoaSolution, predicted_offsets};
pub use api::{
    Locator, LocateOptions, locate, normalize_offsets,
    OutputFormat, EstimateFormatter, TextFormatter, JsonFormatter,
    PlotRenderer, MapRenderer, SvgScatterPlot, OsmMapLink,
};
pub use validation::error::{LocatorError, ErrorKind, Result};
pub use validation::accuracy::{AccuracyValidator, AccuracyStatistics};
pub use utils::config::{LocatorConfig, SensorConfig, CoordinateInput};
