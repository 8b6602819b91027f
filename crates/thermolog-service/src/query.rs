//! Query operations over date-partitioned readings.
//!
//! [`QueryService`] turns calendar dates into partition names, gates every
//! scan on the partition existing, and merges the scanned readings:
//!
//! - [`most_recent_reading`](QueryService::most_recent_reading): latest reading
//!   for one location on one day
//! - [`readings_in_range`](QueryService::readings_in_range): every reading for a
//!   location over a window of days, capped at `max_span_days`
//! - [`distinct_locations`](QueryService::distinct_locations): locations that
//!   reported on one day
//!
//! A partition that does not exist is an empty result for every operation.

use std::collections::BTreeSet;
use std::sync::Arc;

use thermolog_store::{PartitionScanner, PartitionStore, ScanError, ScanFilter};
use thermolog_types::{Reading, date};
use time::Date;
use tracing::{debug, warn};

use crate::config::Config;

/// Default number of days a range query may cover.
pub const DEFAULT_MAX_SPAN_DAYS: u32 = 7;

/// Errors returned by query operations.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The request is malformed; one message per invalid field.
    #[error("invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The store failed outside a scan (for example the existence check).
    #[error(transparent)]
    Store(#[from] thermolog_store::Error),

    /// A partition scan failed after retries.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Read-only queries across daily partitions.
#[derive(Clone)]
pub struct QueryService {
    scanner: PartitionScanner,
    table_prefix: String,
    max_span_days: u32,
}

impl QueryService {
    /// Create a service reading partitions named `table_prefix` + `YYYY-MM-DD`.
    pub fn new(scanner: PartitionScanner, table_prefix: impl Into<String>) -> Self {
        Self {
            scanner,
            table_prefix: table_prefix.into(),
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
        }
    }

    /// Build a service from the storage and query sections of `config`.
    pub fn from_config(store: Arc<dyn PartitionStore>, config: &Config) -> Self {
        let scanner = PartitionScanner::with_options(store, config.query.scan_options());
        Self::new(scanner, config.storage.table_prefix.clone())
            .with_max_span_days(config.query.max_span_days)
    }

    /// Set how many calendar days a range query may cover.
    #[must_use]
    pub fn with_max_span_days(mut self, days: u32) -> Self {
        self.max_span_days = days.max(1);
        self
    }

    /// Days a range query may cover.
    pub fn max_span_days(&self) -> u32 {
        self.max_span_days
    }

    /// Partition holding readings for `day`.
    pub fn partition_for(&self, day: Date) -> String {
        date::partition_name(&self.table_prefix, day)
    }

    /// The latest reading for `location` on `day`, if any.
    ///
    /// Readings are compared by their [`TimeKey`](thermolog_types::TimeKey);
    /// among equal times the first one scanned wins.
    pub async fn most_recent_reading(
        &self,
        day: Date,
        location: &str,
    ) -> Result<Option<Reading>, QueryError> {
        require_location(location)?;

        let partition = self.partition_for(day);
        debug!("Most recent reading for {} in {}", location, partition);

        if !self.scanner.exists(&partition).await? {
            debug!("Partition {} does not exist", partition);
            return Ok(None);
        }

        let readings = self
            .scanner
            .scan_all(&partition, &ScanFilter::location(location))
            .await?;

        let latest = readings
            .into_iter()
            .map(|r| (r.time_key(), r))
            .reduce(|best, next| if next.0 > best.0 { next } else { best })
            .map(|(_, reading)| reading);

        Ok(latest)
    }

    /// Every reading for `location` from `start` to `end` inclusive.
    ///
    /// The window is counted back from `end` and capped at
    /// [`max_span_days`](Self::max_span_days) days; earlier days of a longer
    /// range are dropped. A partition whose existence check or scan fails is
    /// logged and skipped. Results are ordered oldest first: by day, then by
    /// time of day, keeping scan order for ties.
    pub async fn readings_in_range(
        &self,
        start: Date,
        end: Date,
        location: &str,
    ) -> Result<Vec<Reading>, QueryError> {
        let diff = date::day_difference(start, end);

        let mut errors = Vec::new();
        if location.trim().is_empty() {
            errors.push("location must not be empty".to_string());
        }
        if diff < 0 {
            errors.push(format!(
                "endDate {} is before startDate {}",
                date::iso_date(end),
                date::iso_date(start)
            ));
        }
        if !errors.is_empty() {
            return Err(QueryError::Validation(errors));
        }

        let max_back = diff.min(i64::from(self.max_span_days) - 1);
        if max_back < diff {
            debug!(
                "Range {}..{} capped to {} days",
                date::iso_date(start),
                date::iso_date(end),
                self.max_span_days
            );
        }

        let filter = ScanFilter::location(location);
        let mut merged: Vec<(Date, Reading)> = Vec::new();

        for back in 0..=max_back {
            // max_back is bounded by max_span_days, so this never truncates
            let Some(day) = date::days_before(end, back as u32) else {
                break;
            };
            let partition = self.partition_for(day);

            match self.scanner.exists(&partition).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Partition {} does not exist, skipping", partition);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping partition {}: existence check failed: {}", partition, e);
                    continue;
                }
            }

            match self.scanner.scan_all(&partition, &filter).await {
                Ok(readings) => {
                    debug!("Partition {}: {} readings", partition, readings.len());
                    merged.extend(readings.into_iter().map(|r| (day, r)));
                }
                Err(e) => {
                    warn!(
                        "Skipping partition {}: {} (discarding {} partial readings)",
                        partition,
                        e,
                        e.partial.len()
                    );
                }
            }
        }

        merged.sort_by_cached_key(|(day, reading)| (*day, reading.time_key()));
        Ok(merged.into_iter().map(|(_, reading)| reading).collect())
    }

    /// Locations that reported on `day`, each once, in ascending order.
    ///
    /// Readings without a location are ignored.
    pub async fn distinct_locations(&self, day: Date) -> Result<Vec<String>, QueryError> {
        let partition = self.partition_for(day);

        if !self.scanner.exists(&partition).await? {
            debug!("Partition {} does not exist", partition);
            return Ok(Vec::new());
        }

        let readings = self.scanner.scan_all(&partition, &ScanFilter::all()).await?;
        let locations: BTreeSet<String> =
            readings.into_iter().filter_map(|r| r.location).collect();

        Ok(locations.into_iter().collect())
    }
}

fn require_location(location: &str) -> Result<(), QueryError> {
    if location.trim().is_empty() {
        Err(QueryError::Validation(vec![
            "location must not be empty".to_string(),
        ]))
    } else {
        Ok(())
    }
}
