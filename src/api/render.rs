//! Plot and map rendering
//!
//! The locator only produces numbers; presentation of a result as a chart or
//! a map link goes through these traits so callers can swap in their own
//! renderers.

use crate::core::{GeodeticCoord, LocationEstimate, PlanarPosition, SensorSet};
use crate::validation::error::{LocatorError, Result};
use std::fmt::Write;

/// Draws sensors and the estimated crack on the local plane
pub trait PlotRenderer {
    fn render_plot(&self, sensors: &SensorSet, estimate: &LocationEstimate) -> Result<String>;
}

/// Produces a map view for a geodetic position
pub trait MapRenderer {
    fn render_map(&self, position: &GeodeticCoord) -> Result<String>;
}

/// Standalone SVG scatter plot: sensors in blue, crack in red, axes in meters
#[derive(Debug, Clone)]
pub struct SvgScatterPlot {
    pub width: u32,
    pub height: u32,
    /// Space reserved around the plot area for axis labels (pixels)
    pub margin: u32,
}

impl Default for SvgScatterPlot {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            margin: 60,
        }
    }
}

/// Linear map from plane meters to SVG pixels, y axis pointing up
struct Viewport {
    min_x: f64,
    min_y: f64,
    scale: f64,
    left: f64,
    bottom: f64,
}

impl Viewport {
    fn fit(points: &[PlanarPosition], plot: &SvgScatterPlot) -> Self {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        // 5% padding, at least one meter so a single point still has a box
        let pad_x = ((max_x - min_x) * 0.05).max(1.0);
        let pad_y = ((max_y - min_y) * 0.05).max(1.0);
        min_x -= pad_x;
        max_x += pad_x;
        min_y -= pad_y;
        max_y += pad_y;

        let margin = plot.margin as f64;
        let inner_w = (plot.width as f64 - 2.0 * margin).max(1.0);
        let inner_h = (plot.height as f64 - 2.0 * margin).max(1.0);
        let scale = (inner_w / (max_x - min_x)).min(inner_h / (max_y - min_y));

        Self {
            min_x,
            min_y,
            scale,
            left: margin,
            bottom: plot.height as f64 - margin,
        }
    }

    fn project(&self, p: &PlanarPosition) -> (f64, f64) {
        (
            self.left + (p.x - self.min_x) * self.scale,
            self.bottom - (p.y - self.min_y) * self.scale,
        )
    }
}

/// Escape text for use inside SVG markup
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl SvgScatterPlot {
    fn draw(&self, sensors: &SensorSet, estimate: &LocationEstimate, out: &mut String) -> std::fmt::Result {
        let mut points = estimate.sensor_positions.clone();
        points.push(estimate.planar);
        let view = Viewport::fit(&points, self);

        let (w, h, m) = (self.width, self.height, self.margin);
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        )?;
        writeln!(out, r#"  <rect width="{w}" height="{h}" fill="white"/>"#)?;
        writeln!(
            out,
            r#"  <text x="{}" y="24" text-anchor="middle" font-size="16">Sensor Locations and Crack Location</text>"#,
            w / 2
        )?;

        // Axes along the left and bottom edges of the plot area
        writeln!(
            out,
            r#"  <line x1="{m}" y1="{}" x2="{}" y2="{}" stroke="black"/>"#,
            h - m,
            w - m,
            h - m
        )?;
        writeln!(out, r#"  <line x1="{m}" y1="{m}" x2="{m}" y2="{}" stroke="black"/>"#, h - m)?;
        writeln!(
            out,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-size="12">X (meters)</text>"#,
            w / 2,
            h - m / 3
        )?;
        writeln!(
            out,
            r#"  <text x="{}" y="{}" text-anchor="middle" font-size="12" transform="rotate(-90 {} {})">Y (meters)</text>"#,
            m / 3,
            h / 2,
            m / 3,
            h / 2
        )?;
        writeln!(
            out,
            r#"  <text x="{m}" y="{}" font-size="10">{:.0}</text>"#,
            h - m + 14,
            view.min_x
        )?;
        writeln!(
            out,
            r#"  <text x="{}" y="{}" text-anchor="end" font-size="10">{:.0}</text>"#,
            m - 4,
            h - m,
            view.min_y
        )?;

        for (sensor, position) in sensors.iter().zip(&estimate.sensor_positions) {
            let (cx, cy) = view.project(position);
            writeln!(
                out,
                r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="5" fill="blue"><title>{}</title></circle>"#,
                escape(&sensor.id)
            )?;
            writeln!(
                out,
                r#"  <text x="{:.2}" y="{:.2}" font-size="11" fill="blue">{}</text>"#,
                cx + 7.0,
                cy - 7.0,
                escape(&sensor.id)
            )?;
        }

        let (cx, cy) = view.project(&estimate.planar);
        writeln!(
            out,
            r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="6" fill="red"><title>Crack Location</title></circle>"#
        )?;
        writeln!(out, "</svg>")?;
        Ok(())
    }
}

impl PlotRenderer for SvgScatterPlot {
    fn render_plot(&self, sensors: &SensorSet, estimate: &LocationEstimate) -> Result<String> {
        if sensors.len() != estimate.sensor_positions.len() {
            return Err(LocatorError::Render {
                reason: format!(
                    "estimate has {} sensor position(s) but the set has {} sensor(s)",
                    estimate.sensor_positions.len(),
                    sensors.len()
                ),
            });
        }
        let all_finite = estimate
            .sensor_positions
            .iter()
            .chain(std::iter::once(&estimate.planar))
            .all(|p| p.x.is_finite() && p.y.is_finite());
        if !all_finite {
            return Err(LocatorError::Render {
                reason: "positions must be finite to plot".to_string(),
            });
        }
        if self.width <= 2 * self.margin || self.height <= 2 * self.margin {
            return Err(LocatorError::Render {
                reason: format!("plot size {}x{} leaves no room inside a {} px margin", self.width, self.height, self.margin),
            });
        }

        let mut svg = String::new();
        self.draw(sensors, estimate, &mut svg).map_err(|e| LocatorError::Render {
            reason: format!("SVG generation failed: {}", e),
        })?;
        Ok(svg)
    }
}

/// OpenStreetMap link with a marker at the position
#[derive(Debug, Clone)]
pub struct OsmMapLink {
    pub zoom: u8,
}

impl Default for OsmMapLink {
    fn default() -> Self {
        Self { zoom: 12 }
    }
}

impl MapRenderer for OsmMapLink {
    fn render_map(&self, position: &GeodeticCoord) -> Result<String> {
        position.validate()?;
        Ok(format!(
            "https://www.openstreetmap.org/?mlat={lat:.6}&mlon={lon:.6}#map={zoom}/{lat:.6}/{lon:.6}",
            lat = position.lat,
            lon = position.lon,
            zoom = self.zoom
        ))
    }
}
