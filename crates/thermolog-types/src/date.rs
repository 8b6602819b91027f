//! Calendar arithmetic for date-named partitions.
//!
//! Every partition holds one calendar day of readings and is named from the
//! day's ISO date, so these helpers decide which partitions a query touches.
//!
//! # Example
//!
//! ```
//! use thermolog_types::date::{day_difference, days_before, iso_date, parse_iso_date};
//!
//! let end = parse_iso_date("2024-03-02")?;
//! let start = parse_iso_date("2024-02-27")?;
//!
//! assert_eq!(day_difference(start, end), 4);
//! assert_eq!(iso_date(days_before(end, 2).unwrap()), "2024-02-29");
//! # Ok::<(), thermolog_types::ParseError>(())
//! ```

use time::Date;
use time::macros::format_description;

use crate::error::{ParseError, ParseResult};

/// Format a date as `YYYY-MM-DD` from its own calendar fields.
///
/// `time::Date` carries no offset, so the fields used are exactly the local
/// calendar fields the ingestion side used to name the partition.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(input: &str) -> ParseResult<Date> {
    let trimmed = input.trim();
    if trimmed.len() != 10 {
        return Err(ParseError::InvalidDate(input.to_string()));
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ParseError::InvalidDate(input.to_string()))
}

/// Whole days from `a` to `b`; negative when `b` precedes `a`.
pub fn day_difference(a: Date, b: Date) -> i64 {
    (b - a).whole_days()
}

/// The date `days` calendar days before `date`.
///
/// Steps back one day at a time so month and year rollover fall out of the
/// calendar rather than fixed-length arithmetic. Returns `None` only when the
/// walk passes the earliest representable date.
pub fn days_before(date: Date, days: u32) -> Option<Date> {
    let mut current = date;
    for _ in 0..days {
        current = current.previous_day()?;
    }
    Some(current)
}

/// Name of the partition holding readings for `date`.
pub fn partition_name(prefix: &str, date: Date) -> String {
    format!("{}{}", prefix, iso_date(date))
}
