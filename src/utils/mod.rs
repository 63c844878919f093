//! Configuration and logging setup

pub mod config;
pub mod logging;

pub use config::{CoordinateInput, LocatorConfig, SensorConfig};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
