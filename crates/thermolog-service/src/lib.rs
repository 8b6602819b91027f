//! HTTP query service over date-partitioned sensor readings.
//!
//! This crate provides a read-only service that:
//! - Reports the most recent reading for a location on a given day
//! - Returns a bounded range of readings for a location, oldest first
//! - Lists the distinct locations that reported on a given day
//!
//! Readings live in one partition per calendar date, named
//! `<table_prefix><YYYY-MM-DD>` (see [`thermolog_store`]).
//!
//! # REST API Endpoints
//!
//! - `GET /health` - Service health check
//! - `GET /locations?date=YYYY-MM-DD` - Distinct locations for a day
//! - `GET /temperature?date=YYYY-MM-DD&location=L` - Most recent reading
//! - `GET /temperatures?startDate=..&endDate=..&location=L` - Readings in a range
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/thermolog/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/thermolog/readings.db"
//! table_prefix = "rpi-temperature-"
//!
//! [query]
//! max_span_days = 7
//! page_size = 1000
//!
//! [query.retry]
//! max_retries = 3
//! initial_delay_ms = 100
//! max_delay_ms = 2000
//! ```

pub mod api;
pub mod config;
pub mod middleware;
pub mod query;
pub mod state;

pub use config::{
    Config, ConfigError, QueryConfig, RetrySettings, ServerConfig, StorageConfig, ValidationError,
};
pub use query::{QueryError, QueryService};
pub use state::AppState;
