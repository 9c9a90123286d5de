//! Julian date arithmetic and Greenwich sidereal time
//!
//! Provides the `Julian` date type used to stamp element epochs and
//! propagated states. All propagation-facing spans are expressed in
//! minutes, matching the internal time unit of the orbital models.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use std::f64::consts::PI;

/// Minutes per solar day
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Seconds per solar day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian date of 1900 January 1, 12h UT
const EPOCH_JAN1_12H_1900: f64 = 2_415_020.0;

/// Julian date of the Unix epoch, 1970 January 1, 0h UT
const EPOCH_UNIX: f64 = 2_440_587.5;

const TWOPI: f64 = 2.0 * PI;
const DEG2RAD: f64 = PI / 180.0;

/// A Julian date: days (with fraction) since noon, 1 January 4713 BC
///
/// Thin wrapper over the raw day count so date arithmetic stays in one
/// place instead of being scattered through the propagation code.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Julian {
    date: f64,
}

impl Julian {
    /// Create from a raw Julian date value
    pub fn new(date: f64) -> Self {
        Self { date }
    }

    /// Create from a year and a fractional day of year
    ///
    /// Day 1.0 is January 1 at 0h UT, the convention used by TLE epochs.
    /// Valid for years 1900 through 2099.
    pub fn from_year_doy(year: i32, day_of_year: f64) -> Self {
        let year = year - 1;
        let a = year / 100;
        let b = 2 - a + a / 4;
        let new_years =
            (365.25 * year as f64).trunc() + (30.6001_f64 * 14.0).trunc() + 1_720_994.5 + b as f64;
        Self {
            date: new_years + day_of_year,
        }
    }

    /// Create from a UTC calendar date and time
    pub fn from_datetime(datetime: &DateTime<Utc>) -> Self {
        let seconds = datetime.hour() as f64 * 3600.0
            + datetime.minute() as f64 * 60.0
            + datetime.second() as f64
            + datetime.nanosecond() as f64 * 1.0e-9;
        let day_of_year = datetime.ordinal() as f64 + seconds / SECONDS_PER_DAY;
        Self::from_year_doy(datetime.year(), day_of_year)
    }

    /// Convert back to a UTC calendar date (millisecond resolution)
    ///
    /// Returns `None` for dates outside the range chrono can represent.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = ((self.date - EPOCH_UNIX) * SECONDS_PER_DAY * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Raw Julian date value in days
    pub fn date(&self) -> f64 {
        self.date
    }

    /// A new date offset by the given number of minutes
    pub fn add_minutes(&self, minutes: f64) -> Julian {
        Julian {
            date: self.date + minutes / MINUTES_PER_DAY,
        }
    }

    /// Minutes elapsed from `since` to `self` (negative if `self` is earlier)
    pub fn span_minutes(&self, since: &Julian) -> f64 {
        (self.date - since.date) * MINUTES_PER_DAY
    }

    /// Days elapsed since the 1900 January 1 12h UT reference epoch
    pub fn days_from_jan1_1900_12h(&self) -> f64 {
        self.date - EPOCH_JAN1_12H_1900
    }

    /// Greenwich mean sidereal time at this date, in radians
    ///
    /// Evaluates the IAU 1982 GMST polynomial in Julian centuries from
    /// J2000 and reduces the result to [0, 2pi).
    pub fn greenwich_sidereal_time(&self) -> f64 {
        let tut1 = (self.date - 2_451_545.0) / 36_525.0;
        let seconds = -6.2e-6 * tut1 * tut1 * tut1
            + 0.093_104 * tut1 * tut1
            + (876_600.0 * 3600.0 + 8_640_184.812_866) * tut1
            + 67_310.548_41;
        // 360 degrees per 86400 seconds of sidereal angle: divide by 240
        let mut theta = (seconds * DEG2RAD / 240.0) % TWOPI;
        if theta < 0.0 {
            theta += TWOPI;
        }
        theta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_year_doy() {
        // 1980 day 275.98708465 is the epoch of the Spacetrack Report #3
        // near-earth test case
        let julian = Julian::from_year_doy(1980, 275.98708465);
        assert!((julian.date() - 2_444_514.48708465).abs() < 1.0e-8);

        // day 1.0 is January 1 at midnight
        let new_year = Julian::from_year_doy(2000, 1.0);
        assert!((new_year.date() - 2_451_544.5).abs() < 1.0e-9);
    }

    #[test]
    fn test_datetime_round_trip() {
        let datetime = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let julian = Julian::from_datetime(&datetime);
        assert!((julian.date() - 2_451_545.0).abs() < 1.0e-9);

        let back = julian.to_datetime().unwrap();
        assert_eq!(back, datetime);
    }

    #[test]
    fn test_span_minutes() {
        let epoch = Julian::new(2_451_545.0);
        let later = epoch.add_minutes(123.456);
        assert!((later.span_minutes(&epoch) - 123.456).abs() < 1.0e-9);
        assert!((epoch.span_minutes(&later) + 123.456).abs() < 1.0e-9);
    }

    #[test]
    fn test_gmst_at_j2000() {
        // GMST at J2000 is 280.46061837 degrees
        let julian = Julian::new(2_451_545.0);
        let expected = 280.46061837_f64.to_radians();
        assert!((julian.greenwich_sidereal_time() - expected).abs() < 1.0e-9);
    }

    #[test]
    fn test_gmst_rotation_rate() {
        // sidereal angle advances by ~1.0027 revolutions per solar day
        let julian = Julian::new(2_451_545.25);
        let start = julian.greenwich_sidereal_time();
        let quarter_day = Julian::new(2_451_545.5).greenwich_sidereal_time();
        let mut delta = quarter_day - start;
        if delta < 0.0 {
            delta += TWOPI;
        }
        let expected = 0.25 * TWOPI * 1.00273790934;
        assert!((delta - expected).abs() < 1.0e-6);
    }
}
