//! Error types for parsing dates and clock times.

use thiserror::Error;

/// Errors that can occur when parsing request dates or reading times.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The input was not a `YYYY-MM-DD` calendar date.
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The input was not a recognised clock time.
    #[error("invalid time '{0}'")]
    InvalidTime(String),
}

/// Result type alias using thermolog-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
