//! Estimate output formatting
//!
//! Human-readable text for consoles and JSON for anything that parses the
//! result downstream.

use crate::algorithms::tdoa::Objective;
use crate::api::types::OutputFormat;
use crate::core::LocationEstimate;
use crate::validation::error::{LocatorError, Result};
use std::fmt::{self, Write};

/// Renders a [`LocationEstimate`] as a string
pub trait EstimateFormatter {
    fn format(&self, estimate: &LocationEstimate) -> Result<String>;
}

/// Pick the formatter for an output format
pub fn formatter_for(format: OutputFormat) -> Box<dyn EstimateFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::pretty()),
    }
}

fn cost_unit(objective: Objective) -> &'static str {
    match objective {
        Objective::Pairwise => "s²",
        Objective::AbsoluteRange => "m²",
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Single-line output
    pub compact: bool,
    /// Include the solver report
    pub include_diagnostics: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            compact: false,
            include_diagnostics: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact() -> Self {
        Self {
            compact: true,
            include_diagnostics: false,
        }
    }

    fn render(&self, estimate: &LocationEstimate, out: &mut String) -> fmt::Result {
        let geo = &estimate.geodetic;
        let planar = &estimate.planar;

        if self.compact {
            write!(
                out,
                "Crack: {:.6}, {:.6} | E{:.1} m, N{:.1} m",
                geo.lat, geo.lon, planar.x, planar.y
            )?;
            if let Some((lat, lon)) = &estimate.dms {
                write!(out, " | {} {}", lat, lon)?;
            }
            return Ok(());
        }

        writeln!(out, "Crack location:")?;
        writeln!(out, "  Latitude:  {:.6}°", geo.lat)?;
        writeln!(out, "  Longitude: {:.6}°", geo.lon)?;
        if let Some((lat, lon)) = &estimate.dms {
            writeln!(out, "  DMS:       {} {}", lat, lon)?;
        }

        writeln!(out, "Local position (from reference sensor):")?;
        writeln!(out, "  East:  {:.1} m", planar.x)?;
        writeln!(out, "  North: {:.1} m", planar.y)?;

        if self.include_diagnostics {
            let report = &estimate.report;
            writeln!(out, "Solver:")?;
            writeln!(out, "  Objective:   {}", report.objective)?;
            writeln!(out, "  Iterations:  {}", report.iterations)?;
            writeln!(out, "  Evaluations: {}", report.evaluations)?;
            writeln!(out, "  Cost:        {:.3e} {}", report.cost, cost_unit(report.objective))?;
            writeln!(out, "  Status:      {}", report.message)?;
        }

        Ok(())
    }
}

impl EstimateFormatter for TextFormatter {
    fn format(&self, estimate: &LocationEstimate) -> Result<String> {
        let mut output = String::new();
        self.render(estimate, &mut output).map_err(|e| LocatorError::Render {
            reason: format!("text formatting failed: {}", e),
        })?;
        Ok(output)
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Pretty print JSON
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl EstimateFormatter for JsonFormatter {
    fn format(&self, estimate: &LocationEstimate) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(estimate)
        } else {
            serde_json::to_string(estimate)
        };
        json.map_err(|e| LocatorError::Render {
            reason: format!("JSON serialization failed: {}", e),
        })
    }
}
