//! Sensor readings and their time-of-day ordering.

use core::cmp::Ordering;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::Time;
use time::macros::format_description;

use crate::error::{ParseError, ParseResult};

/// One sensor observation as stored in a date partition.
///
/// The `time` field is the clock time the ingestion side wrote, e.g.
/// `"02:00:00 pm"`. Compare readings by [`Reading::time_key`], never by the
/// raw string.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Measured value (degrees Celsius for temperature sensors).
    pub value: f64,
    /// Time of day the reading was taken.
    pub time: String,
    /// Reporting device or site.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub location: Option<String>,
}

impl Reading {
    /// Create a reading for a location.
    pub fn new(value: f64, time: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            value,
            time: time.into(),
            location: Some(location.into()),
        }
    }

    /// Sort key for the reading's time of day.
    pub fn time_key(&self) -> TimeKey {
        TimeKey::new(&self.time)
    }

    /// Whether the reading was reported by `location`.
    pub fn is_from(&self, location: &str) -> bool {
        self.location.as_deref() == Some(location)
    }
}

/// Chronological ordering key for a time-of-day string.
///
/// Strings that parse as a clock time order by that time, so spellings of the
/// same instant ("10:00:00 AM", "10:00:00 am", "10:00:00") are equal. Strings
/// that do not parse order before every parsed time (they count as oldest)
/// and compare lexicographically among themselves.
#[derive(Debug, Clone)]
pub struct TimeKey {
    parsed: Option<Time>,
    raw: String,
}

impl TimeKey {
    /// Build the key for a time string.
    pub fn new(raw: &str) -> Self {
        Self {
            parsed: parse_clock_time(raw).ok(),
            raw: raw.to_string(),
        }
    }

    /// The parsed clock time, if the string was recognised.
    pub fn time(&self) -> Option<Time> {
        self.parsed
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parsed, other.parsed) {
            (Some(a), Some(b)) => a.cmp(&b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parsed {
            Some(t) => write!(f, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()),
            None => write!(f, "{}", self.raw),
        }
    }
}

/// Parse a clock time in either 12-hour (`2:00:00 pm`) or 24-hour
/// (`14:00:00`) form.
pub fn parse_clock_time(input: &str) -> ParseResult<Time> {
    let trimmed = input.trim();

    let twelve_hour = format_description!(
        "[hour repr:12 padding:none]:[minute]:[second] [period case:lower case_sensitive:false]"
    );
    if let Ok(t) = Time::parse(trimmed, twelve_hour) {
        return Ok(t);
    }

    let twenty_four_hour = format_description!("[hour padding:none]:[minute]:[second]");
    Time::parse(trimmed, twenty_four_hour).map_err(|_| ParseError::InvalidTime(input.to_string()))
}
