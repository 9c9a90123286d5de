//! Two-line element set parsing
//!
//! Parses the canonical NORAD two-line text format into a typed record.
//! Fields live at fixed columns; several use an implied-decimal notation
//! where `13844-3` means `0.13844e-3`. Checksum mismatches are tolerated
//! (historical reference element sets predate the modern convention) and
//! reported through the logging facade instead of failing the parse.

use crate::time::Julian;
use serde::{Deserialize, Serialize};

/// Line length of a well-formed element set line
const LINE_LENGTH: usize = 69;

/// Two-digit years below this pivot are interpreted as 20xx
const EPOCH_YEAR_PIVOT: u32 = 57;

/// A parsed two-line element set
///
/// Angles are kept in the degrees of the text format; the propagation
/// layer converts to radians when it builds its element record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tle {
    /// NORAD catalog number
    pub norad_id: u32,
    /// Security classification, 'U' for unclassified
    pub classification: char,
    /// International designator (launch year, number, and piece)
    pub int_designator: String,
    /// Four-digit epoch year
    pub epoch_year: i32,
    /// Fractional day of year, day 1.0 is January 1 at 0h UT
    pub epoch_day: f64,
    /// First derivative of mean motion over two, rev/day^2
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion over six, rev/day^3
    pub mean_motion_ddot: f64,
    /// Drag term B*, in reciprocal Earth radii
    pub bstar: f64,
    /// Element set number
    pub element_number: u32,
    /// Inclination in degrees
    pub inclination_deg: f64,
    /// Right ascension of the ascending node in degrees
    pub right_ascension_deg: f64,
    /// Eccentricity, dimensionless
    pub eccentricity: f64,
    /// Argument of perigee in degrees
    pub argument_perigee_deg: f64,
    /// Mean anomaly in degrees
    pub mean_anomaly_deg: f64,
    /// Mean motion in revolutions per day
    pub mean_motion: f64,
    /// Revolution number at epoch
    pub revolution_number: u32,
}

/// Element set parse failure
#[derive(Debug, Clone, PartialEq)]
pub enum TleError {
    /// A line did not start with the expected line number
    InvalidLineNumber { line: u8 },

    /// A line contained non-ASCII data
    NotAscii { line: u8 },

    /// A field could not be parsed as a number
    InvalidField { line: u8, field: &'static str },

    /// The catalog numbers of the two lines disagree
    CatalogMismatch,
}

impl std::fmt::Display for TleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLineNumber { line } => {
                write!(f, "line {} has a bad line number", line)
            }
            Self::NotAscii { line } => write!(f, "line {} is not ASCII", line),
            Self::InvalidField { line, field } => {
                write!(f, "line {}: unparseable {} field", line, field)
            }
            Self::CatalogMismatch => write!(f, "catalog numbers differ between lines"),
        }
    }
}

impl std::error::Error for TleError {}

impl Tle {
    /// Parse a two-line element set
    pub fn parse(line1: &str, line2: &str) -> Result<Tle, TleError> {
        let line1 = normalize(line1, 1)?;
        let line2 = normalize(line2, 2)?;

        if !line1.starts_with("1 ") {
            return Err(TleError::InvalidLineNumber { line: 1 });
        }
        if !line2.starts_with("2 ") {
            return Err(TleError::InvalidLineNumber { line: 2 });
        }

        verify_checksum(&line1, 1);
        verify_checksum(&line2, 2);

        let norad_id = parse_u32(&line1, 3, 7, 1, "catalog number")?;
        if parse_u32(&line2, 3, 7, 2, "catalog number")? != norad_id {
            return Err(TleError::CatalogMismatch);
        }

        let two_digit_year = parse_u32(&line1, 19, 20, 1, "epoch year")?;
        let epoch_year = if two_digit_year < EPOCH_YEAR_PIVOT {
            2000 + two_digit_year as i32
        } else {
            1900 + two_digit_year as i32
        };

        Ok(Tle {
            norad_id,
            classification: line1.as_bytes()[7] as char,
            int_designator: field(&line1, 10, 17).to_string(),
            epoch_year,
            epoch_day: parse_f64(&line1, 21, 32, 1, "epoch day")?,
            mean_motion_dot: parse_f64(&line1, 34, 43, 1, "mean motion dot")?,
            mean_motion_ddot: parse_implied_decimal(&line1, 45, 52, 1, "mean motion ddot")?,
            bstar: parse_implied_decimal(&line1, 54, 61, 1, "bstar")?,
            element_number: parse_u32_or_zero(&line1, 65, 68),
            inclination_deg: parse_f64(&line2, 9, 16, 2, "inclination")?,
            right_ascension_deg: parse_f64(&line2, 18, 25, 2, "right ascension")?,
            eccentricity: parse_assumed_decimal(&line2, 27, 33, 2, "eccentricity")?,
            argument_perigee_deg: parse_f64(&line2, 35, 42, 2, "argument of perigee")?,
            mean_anomaly_deg: parse_f64(&line2, 44, 51, 2, "mean anomaly")?,
            mean_motion: parse_f64(&line2, 53, 63, 2, "mean motion")?,
            revolution_number: parse_u32_or_zero(&line2, 64, 68),
        })
    }

    /// Epoch of the element set as a Julian date
    pub fn epoch(&self) -> Julian {
        Julian::from_year_doy(self.epoch_year, self.epoch_day)
    }
}

/// Validate ASCII content and pad to the canonical line length
fn normalize(line: &str, number: u8) -> Result<String, TleError> {
    if !line.is_ascii() {
        return Err(TleError::NotAscii { line: number });
    }
    let mut line = line.trim_end().to_string();
    while line.len() < LINE_LENGTH {
        line.push(' ');
    }
    Ok(line)
}

/// Extract the 1-indexed inclusive column range, trimmed
fn field(line: &str, start: usize, end: usize) -> &str {
    line[start - 1..end].trim()
}

fn parse_f64(
    line: &str,
    start: usize,
    end: usize,
    number: u8,
    name: &'static str,
) -> Result<f64, TleError> {
    field(line, start, end).parse().map_err(|_| {
        log::trace!("bad TLE field {} in line {}: {:?}", name, number, field(line, start, end));
        TleError::InvalidField { line: number, field: name }
    })
}

fn parse_u32(
    line: &str,
    start: usize,
    end: usize,
    number: u8,
    name: &'static str,
) -> Result<u32, TleError> {
    field(line, start, end)
        .parse()
        .map_err(|_| TleError::InvalidField { line: number, field: name })
}

/// Trailing bookkeeping fields are sometimes absent from historical sets
fn parse_u32_or_zero(line: &str, start: usize, end: usize) -> u32 {
    field(line, start, end).parse().unwrap_or(0)
}

/// Parse a field with an assumed leading decimal point, e.g. `0086731`
fn parse_assumed_decimal(
    line: &str,
    start: usize,
    end: usize,
    number: u8,
    name: &'static str,
) -> Result<f64, TleError> {
    let digits = field(line, start, end);
    if digits.is_empty() {
        return Ok(0.0);
    }
    format!("0.{}", digits)
        .parse()
        .map_err(|_| TleError::InvalidField { line: number, field: name })
}

/// Parse the implied-decimal exponent notation, e.g. ` 13844-3` -> 0.13844e-3
fn parse_implied_decimal(
    line: &str,
    start: usize,
    end: usize,
    number: u8,
    name: &'static str,
) -> Result<f64, TleError> {
    let text = field(line, start, end);
    if text.is_empty() {
        return Ok(0.0);
    }

    let error = TleError::InvalidField { line: number, field: name };

    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };

    // the exponent sign splits mantissa digits from the exponent digit
    let split = rest
        .char_indices()
        .rfind(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i);

    let (mantissa, exponent) = match split {
        Some(i) => {
            let exponent: i32 = rest[i..].parse().map_err(|_| error.clone())?;
            (&rest[..i], exponent)
        }
        None => (rest, 0),
    };

    let mantissa: f64 = format!("0.{}", mantissa).parse().map_err(|_| error)?;
    Ok(sign * mantissa * 10.0_f64.powi(exponent))
}

/// Modulo-10 checksum over a line: digits count their value, minus signs count one
fn verify_checksum(line: &str, number: u8) {
    let Some(expected) = line.as_bytes()[LINE_LENGTH - 1].checked_sub(b'0') else {
        return;
    };
    if expected > 9 {
        // blank or non-digit checksum column, nothing to verify
        return;
    }

    let sum: u32 = line.as_bytes()[..LINE_LENGTH - 1]
        .iter()
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();

    if sum % 10 != expected as u32 {
        log::trace!(
            "TLE line {} checksum mismatch: computed {}, expected {}",
            number,
            sum % 10,
            expected
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "1 88888U          80275.98708465  .00073094  13844-3  66816-4 0    8";
    const LINE2: &str = "2 88888  72.8435 115.9689 0086731  52.6988 110.5714 16.05824518  105";

    #[test]
    fn test_parse_near_earth_reference() {
        let tle = Tle::parse(LINE1, LINE2).unwrap();

        assert_eq!(tle.norad_id, 88888);
        assert_eq!(tle.classification, 'U');
        assert_eq!(tle.epoch_year, 1980);
        assert!((tle.epoch_day - 275.98708465).abs() < 1.0e-10);
        assert!((tle.mean_motion_dot - 0.00073094).abs() < 1.0e-10);
        assert!((tle.mean_motion_ddot - 0.13844e-3).abs() < 1.0e-12);
        assert!((tle.bstar - 0.66816e-4).abs() < 1.0e-12);
        assert!((tle.inclination_deg - 72.8435).abs() < 1.0e-10);
        assert!((tle.right_ascension_deg - 115.9689).abs() < 1.0e-10);
        assert!((tle.eccentricity - 0.0086731).abs() < 1.0e-12);
        assert!((tle.argument_perigee_deg - 52.6988).abs() < 1.0e-10);
        assert!((tle.mean_anomaly_deg - 110.5714).abs() < 1.0e-10);
        assert!((tle.mean_motion - 16.05824518).abs() < 1.0e-10);
    }

    #[test]
    fn test_epoch_year_pivot() {
        let old = Tle::parse(LINE1, LINE2).unwrap();
        assert_eq!(old.epoch_year, 1980);

        let line1 = "1 25544U 98067A   20062.59097222  .00016717  00000-0  10270-3 0  9005";
        let line2 = "2 25544  51.6442 147.0064 0004607  95.6506 264.5061 15.49249111  9000";
        let recent = Tle::parse(line1, line2).unwrap();
        assert_eq!(recent.epoch_year, 2020);
        assert!((recent.epoch().date() - Julian::from_year_doy(2020, 62.59097222).date()).abs() < 1.0e-9);
    }

    #[test]
    fn test_implied_decimal_forms() {
        let line = "1 88888U          80275.98708465  .00073094  00000-0 -11606-4 0    8";
        let tle = Tle::parse(line, LINE2).unwrap();
        assert_eq!(tle.mean_motion_ddot, 0.0);
        assert!((tle.bstar + 0.11606e-4).abs() < 1.0e-12);

        let line = "1 88888U          80275.98708465  .00073094  00000+0  00000+0 0    8";
        let tle = Tle::parse(line, LINE2).unwrap();
        assert_eq!(tle.bstar, 0.0);
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert_eq!(
            Tle::parse(LINE2, LINE2).unwrap_err(),
            TleError::InvalidLineNumber { line: 1 }
        );

        let mismatched = "2 99999  72.8435 115.9689 0086731  52.6988 110.5714 16.05824518  105";
        assert_eq!(Tle::parse(LINE1, mismatched).unwrap_err(), TleError::CatalogMismatch);

        let garbled = "2 88888  7X.8435 115.9689 0086731  52.6988 110.5714 16.05824518  105";
        assert!(matches!(
            Tle::parse(LINE1, garbled).unwrap_err(),
            TleError::InvalidField { line: 2, field: "inclination" }
        ));
    }
}
