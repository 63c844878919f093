//! Input validation, error types and accuracy checks

pub mod accuracy;
pub mod data;
pub mod error;

pub use accuracy::{AccuracyStatistics, AccuracyValidator};
pub use data::{collect_offsets, validate_speed};
pub use error::{ErrorKind, LocatorError, Result};
