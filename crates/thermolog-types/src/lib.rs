//! Shared types for the thermolog query service.
//!
//! This crate provides the types used by both the partition store
//! (thermolog-store) and the HTTP service (thermolog-service).
//!
//! # Features
//!
//! - The [`Reading`] record and its chronological [`TimeKey`]
//! - Calendar arithmetic for date-named partitions ([`date`])
//! - Error types for date and time parsing
//!
//! # Example
//!
//! ```
//! use thermolog_types::{Reading, date};
//!
//! let day = date::parse_iso_date("2023-05-01")?;
//! assert_eq!(date::partition_name("rpi-temperature-", day), "rpi-temperature-2023-05-01");
//!
//! let early = Reading::new(20.0, "10:00:00 am", "A");
//! let late = Reading::new(22.0, "02:00:00 pm", "A");
//! assert!(late.time_key() > early.time_key());
//! # Ok::<(), thermolog_types::ParseError>(())
//! ```

pub mod date;
pub mod error;
pub mod reading;

pub use error::{ParseError, ParseResult};
pub use reading::{Reading, TimeKey, parse_clock_time};
