//! Core data types for energy readings
//!
//! This module defines the values every other layer exchanges:
//! - `Timestamp`: wall-clock calendar fields of a reading
//! - `Measurement`: one reading of the five energy counters
//! - `TimeRange`: an inclusive interval in linear time

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const SECONDS_PER_DAY: i64 = 86_400;

/// Hours covered by one leaf bucket of the index
pub const BUCKET_HOURS: u32 = 6;

/// Calendar fields of a reading
///
/// Fields are stored exactly as supplied and are never validated. Conversion
/// to linear time normalizes out-of-range values arithmetically, so a
/// `Timestamp` always has a well-defined position on the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 1-31
    pub day: u32,
    /// 0-23
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Default for Timestamp {
    /// The "unset" timestamp: year 1900, month 1, day 0, midnight.
    fn default() -> Self {
        Self {
            year: 1900,
            month: 1,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl Timestamp {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Midnight of the given date
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self::new(year, month, day, 0, 0, 0)
    }

    /// Builder: replace the time of day
    pub fn with_time(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    /// Seconds since 1970-01-01 00:00:00, wall clock, no timezone
    pub fn linear(&self) -> i64 {
        let month0 = i64::from(self.month) - 1;
        let year = i64::from(self.year) + month0.div_euclid(12);
        let month = month0.rem_euclid(12) + 1;

        let days = days_from_civil(year, month) + i64::from(self.day) - 1;

        days * SECONDS_PER_DAY
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }

    /// Index of the 6-hour bucket this timestamp falls into (hour / 6)
    pub fn bucket(&self) -> u32 {
        self.hour / BUCKET_HOURS
    }

    pub fn from_naive(dt: &NaiveDateTime) -> Self {
        Self::new(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }

    /// Convert to a chrono value, if the fields form a real calendar instant
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(
            self.hour,
            self.minute,
            self.second,
        )
    }

    /// Parse with the first matching strftime format
    ///
    /// Date-only formats resolve to midnight.
    pub fn parse(s: &str, formats: &[&str]) -> Option<Self> {
        let s = s.trim();
        for fmt in formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self::from_naive(&dt));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(Self::date(date.year(), date.month(), date.day()));
            }
        }
        None
    }
}

/// Layouts accepted for user-entered times, most specific first
pub const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d",
];

impl std::str::FromStr for Timestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, INPUT_FORMATS).ok_or_else(|| {
            format!(
                "Invalid time: {}. Use: YYYY-MM-DD, YYYY-MM-DD HH:MM or YYYY-MM-DDTHH:MM:SS",
                s.trim()
            )
        })
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Days from 1970-01-01 to the first day of `month` in `year` (proleptic Gregorian)
fn days_from_civil(year: i64, month: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    // Months counted from March so the leap day ends the year
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// One energy reading
///
/// Equality and ordering look at the linear time of `timestamp` only: two
/// readings taken at the same instant are the same reading, whatever their
/// counter values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub timestamp: Timestamp,
    pub autoconsumption: f64,
    pub export: f64,
    pub import: f64,
    pub consumption: f64,
    pub production: f64,
}

impl Measurement {
    /// Create a reading with all counters at zero
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Builder method: set autoconsumption
    pub fn autoconsumption(mut self, value: f64) -> Self {
        self.autoconsumption = value;
        self
    }

    /// Builder method: set exported energy
    pub fn export(mut self, value: f64) -> Self {
        self.export = value;
        self
    }

    /// Builder method: set imported energy
    pub fn import(mut self, value: f64) -> Self {
        self.import = value;
        self
    }

    /// Builder method: set consumption
    pub fn consumption(mut self, value: f64) -> Self {
        self.consumption = value;
        self
    }

    /// Builder method: set production
    pub fn production(mut self, value: f64) -> Self {
        self.production = value;
        self
    }

    pub fn linear_time(&self) -> i64 {
        self.timestamp.linear()
    }
}

impl PartialEq for Measurement {
    fn eq(&self, other: &Self) -> bool {
        self.linear_time() == other.linear_time()
    }
}

impl Eq for Measurement {}

impl PartialOrd for Measurement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Measurement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.linear_time().cmp(&other.linear_time())
    }
}

/// Inclusive time interval `[start, end]` in linear seconds
///
/// A range whose start lies after its end is empty. No validation is done
/// on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Range between two calendar timestamps, both ends included
    pub fn between(start: &Timestamp, end: &Timestamp) -> Self {
        Self::new(start.linear(), end.linear())
    }

    /// Range covering every representable instant
    pub fn all() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }

    /// Check if a linear timestamp falls within this range
    pub fn contains(&self, linear: i64) -> bool {
        linear >= self.start && linear <= self.end
    }

    pub fn contains_measurement(&self, measurement: &Measurement) -> bool {
        self.contains(measurement.linear_time())
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}
