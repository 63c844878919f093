//! Degrees-minutes-seconds coordinate notation
//!
//! Parses strings of the form `28°07′12.5″N` into decimal degrees and formats
//! decimal degrees back. The grammar is fixed:
//!
//! ```text
//! angle   := degrees DEG minutes MIN seconds SEC hemisphere
//! degrees := digit+
//! minutes := digit+                (< 60)
//! seconds := digit+ ("." digit+)?  (< 60)
//! DEG     := "°"
//! MIN     := "′" | "'"
//! SEC     := "″" | "\""
//! hemisphere := "N" | "S" | "E" | "W"
//! ```
//!
//! Formatting rounds seconds to two decimal places, which keeps a
//! format/parse round trip within about 1.4e-6 degrees (well under a meter).

use crate::core::{Axis, GeodeticCoord};
use crate::validation::error::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DEGREE_MARKS: &[char] = &['°'];
const MINUTE_MARKS: &[char] = &['′', '\''];
const SECOND_MARKS: &[char] = &['″', '"'];

/// Hundredths of an arc-second per degree
const CENTISECONDS_PER_DEGREE: f64 = 360_000.0;

/// Compass hemisphere letter of a DMS angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Hemisphere::North | Hemisphere::South => Axis::Latitude,
            Hemisphere::East | Hemisphere::West => Axis::Longitude,
        }
    }

    /// South and West are negative
    pub fn sign(&self) -> f64 {
        match self {
            Hemisphere::North | Hemisphere::East => 1.0,
            Hemisphere::South | Hemisphere::West => -1.0,
        }
    }

    /// Hemisphere of a signed decimal value on the given axis
    pub fn for_value(decimal: f64, axis: Axis) -> Self {
        match (axis, decimal >= 0.0) {
            (Axis::Latitude, true) => Hemisphere::North,
            (Axis::Latitude, false) => Hemisphere::South,
            (Axis::Longitude, true) => Hemisphere::East,
            (Axis::Longitude, false) => Hemisphere::West,
        }
    }
}

/// A single DMS angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmsAngle {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl DmsAngle {
    /// Signed decimal degrees
    pub fn to_decimal(&self) -> f64 {
        let magnitude = self.degrees as f64 + self.minutes as f64 / 60.0 + self.seconds / 3600.0;
        self.hemisphere.sign() * magnitude
    }

    /// Split a decimal value into degrees, minutes and seconds rounded to
    /// hundredths, carrying into minutes and degrees so that seconds never
    /// read `60.00`. Non-finite values and values beyond the axis limit are
    /// rejected.
    pub fn from_decimal(decimal: f64, axis: Axis) -> Result<Self> {
        if !decimal.is_finite() || decimal.abs() > axis.limit_deg() {
            return Err(LocatorError::CoordinateOutOfRange { axis, value: decimal });
        }
        let centiseconds = (decimal.abs() * CENTISECONDS_PER_DEGREE).round() as u64;
        Ok(Self {
            degrees: (centiseconds / 360_000) as u32,
            minutes: ((centiseconds % 360_000) / 6_000) as u32,
            seconds: (centiseconds % 6_000) as f64 / 100.0,
            hemisphere: Hemisphere::for_value(decimal, axis),
        })
    }
}

impl fmt::Display for DmsAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}°{:02}′{:05.2}″{}",
            self.degrees,
            self.minutes,
            self.seconds,
            self.hemisphere.letter()
        )
    }
}

/// Character cursor over the trimmed input
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_digits(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn eat(&mut self, accepted: &[char]) -> bool {
        match self.peek() {
            Some(c) if accepted.contains(&c) => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.text.len()
    }
}

impl FromStr for DmsAngle {
    type Err = LocatorError;

    fn from_str(input: &str) -> Result<Self> {
        let fail = |reason: &str| LocatorError::InvalidCoordinateFormat {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut cursor = Cursor::new(input.trim());

        let degrees = cursor.take_digits();
        if degrees.is_empty() {
            return Err(fail("expected whole degrees"));
        }
        if !cursor.eat(DEGREE_MARKS) {
            return Err(fail("expected '°' after degrees"));
        }

        let minutes = cursor.take_digits();
        if minutes.is_empty() {
            return Err(fail("expected whole minutes"));
        }
        if !cursor.eat(MINUTE_MARKS) {
            return Err(fail("expected '′' after minutes"));
        }

        let seconds_start = cursor.pos;
        if cursor.take_digits().is_empty() {
            return Err(fail("expected seconds"));
        }
        if cursor.peek() == Some('.') {
            cursor.bump();
            if cursor.take_digits().is_empty() {
                return Err(fail("expected digits after the decimal point in seconds"));
            }
        }
        let seconds = &cursor.text[seconds_start..cursor.pos];
        if !cursor.eat(SECOND_MARKS) {
            return Err(fail("expected '″' after seconds"));
        }

        let hemisphere = cursor
            .bump()
            .and_then(Hemisphere::from_letter)
            .ok_or_else(|| fail("expected hemisphere letter N, S, E or W"))?;

        if !cursor.is_done() {
            return Err(fail("unexpected characters after hemisphere letter"));
        }

        let degrees: u32 = degrees.parse().map_err(|_| fail("degrees value too large"))?;
        let minutes: u32 = minutes.parse().map_err(|_| fail("minutes value too large"))?;
        let seconds: f64 = seconds.parse().map_err(|_| fail("invalid seconds value"))?;

        if minutes >= 60 {
            return Err(fail("minutes must be below 60"));
        }
        if seconds >= 60.0 {
            return Err(fail("seconds must be below 60"));
        }

        Ok(DmsAngle { degrees, minutes, seconds, hemisphere })
    }
}

fn checked_decimal(angle: &DmsAngle) -> Result<f64> {
    let axis = angle.hemisphere.axis();
    let value = angle.to_decimal();
    if value.abs() > axis.limit_deg() {
        return Err(LocatorError::CoordinateOutOfRange { axis, value });
    }
    Ok(value)
}

/// Parse a single DMS angle into signed decimal degrees
pub fn parse_dms(text: &str) -> Result<f64> {
    let angle: DmsAngle = text.parse()?;
    checked_decimal(&angle)
}

/// Parse a whitespace-separated `latitude longitude` DMS pair
pub fn parse_dms_pair(text: &str) -> Result<GeodeticCoord> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let [lat_text, lon_text] = parts.as_slice() else {
        return Err(LocatorError::InvalidCoordinateFormat {
            input: text.to_string(),
            reason: "expected a latitude and a longitude separated by whitespace".to_string(),
        });
    };

    let lat: DmsAngle = lat_text.parse()?;
    let lon: DmsAngle = lon_text.parse()?;

    if lat.hemisphere.axis() != Axis::Latitude {
        return Err(LocatorError::InvalidCoordinateFormat {
            input: text.to_string(),
            reason: "latitude must end in N or S".to_string(),
        });
    }
    if lon.hemisphere.axis() != Axis::Longitude {
        return Err(LocatorError::InvalidCoordinateFormat {
            input: text.to_string(),
            reason: "longitude must end in E or W".to_string(),
        });
    }

    Ok(GeodeticCoord::new(checked_decimal(&lat)?, checked_decimal(&lon)?))
}

/// Format signed decimal degrees as `D°MM′SS.SS″H`
pub fn format_dms(decimal: f64, axis: Axis) -> Result<String> {
    Ok(DmsAngle::from_decimal(decimal, axis)?.to_string())
}

/// Format a coordinate as a (latitude, longitude) DMS pair
pub fn format_dms_pair(coord: &GeodeticCoord) -> Result<(String, String)> {
    Ok((format_dms(coord.lat, Axis::Latitude)?, format_dms(coord.lon, Axis::Longitude)?))
}
