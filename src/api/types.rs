//! Common API types

use crate::algorithms::tdoa::{Objective, SolverOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::core::{LocationEstimate, SolverReport};

/// Options for a single location request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateOptions {
    /// Solver objective, search box and minimizer limits
    pub solver: SolverOptions,
    /// Attach a DMS rendering of the estimate
    pub include_dms: bool,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions::default(),
            include_dms: true,
        }
    }
}

impl LocateOptions {
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.solver.objective = objective;
        self
    }

    pub fn with_dms(mut self, include_dms: bool) -> Self {
        self.include_dms = include_dms;
        self
    }
}

/// Output format for estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}
