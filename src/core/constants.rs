//! Physical constants and system parameters

/// Mean Earth radius used by the tangent-plane projection (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Padding added around the sensor bounding box to form the solver's search box (meters)
pub const DEFAULT_BOUNDS_BUFFER_M: f64 = 10_000.0;

/// Minimum number of sensors for a 2-D solve
pub const MIN_SENSORS: usize = 3;

/// Speed of sound in air at 20 °C (m/s)
pub const SPEED_OF_SOUND_AIR: f64 = 343.0;

/// Reference latitude above which the longitude scale factor is considered unreliable (degrees)
pub const HIGH_LATITUDE_WARNING_DEG: f64 = 80.0;
