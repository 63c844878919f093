//! Public API: the location facade, input parsing and output rendering

pub mod formatting;
pub mod input;
pub mod locator;
pub mod render;
pub mod types;

pub use formatting::{formatter_for, EstimateFormatter, JsonFormatter, TextFormatter};
pub use input::{parse_observations, parse_speed, parse_time, split_time_assignment};
pub use locator::{locate, normalize_offsets, Locator};
pub use render::{MapRenderer, OsmMapLink, PlotRenderer, SvgScatterPlot};
pub use types::{LocateOptions, LocationEstimate, OutputFormat, SolverReport};
