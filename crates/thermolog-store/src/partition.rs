//! The partition store capability.
//!
//! A partition store holds one collection of [`Reading`]s per calendar date.
//! It exposes exactly two operations: describing a partition and reading one
//! page of it. Everything else (existence gating, paging, retries) lives in
//! [`PartitionScanner`](crate::PartitionScanner).

use std::fmt;

use async_trait::async_trait;
use thermolog_types::Reading;

use crate::error::{Error, Result};

/// Lifecycle state reported for a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStatus {
    /// Being created; not yet readable.
    Creating,
    /// Ready to serve scans.
    Active,
    /// Being removed.
    Deleting,
}

impl PartitionStatus {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStatus::Creating => "CREATING",
            PartitionStatus::Active => "ACTIVE",
            PartitionStatus::Deleting => "DELETING",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATING" => Some(PartitionStatus::Creating),
            "ACTIVE" => Some(PartitionStatus::Active),
            "DELETING" => Some(PartitionStatus::Deleting),
            _ => None,
        }
    }
}

/// Equality filter applied while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Keep only readings reported by this location.
    pub location: Option<String>,
}

impl ScanFilter {
    /// A filter that keeps everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only readings for `location`.
    pub fn location(location: &str) -> Self {
        Self {
            location: Some(location.to_string()),
        }
    }

    /// Whether `reading` passes the filter.
    pub fn matches(&self, reading: &Reading) -> bool {
        match &self.location {
            Some(location) => reading.is_from(location),
            None => true,
        }
    }
}

/// Opaque marker for where the next page of a scan begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a store-specific position.
    pub fn new(position: impl Into<String>) -> Self {
        Self(position.into())
    }

    /// The store-specific position.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of scan results.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Readings on this page that passed the filter.
    pub items: Vec<Reading>,
    /// Where the next page starts; `None` when the scan is complete.
    pub next: Option<ContinuationToken>,
}

/// Trait abstracting a date-partitioned reading store.
///
/// Implemented by the SQLite-backed [`Store`](crate::Store) and by
/// [`MemoryStore`](crate::MemoryStore) for tests.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Report a partition's status, or `None` when it does not exist.
    async fn describe_partition(&self, name: &str) -> Result<Option<PartitionStatus>>;

    /// Read up to `page_size` records of a partition starting at `start`.
    ///
    /// A page may hold fewer than `page_size` items (the filter is applied
    /// to the examined records) and may even be empty while `next` is set.
    async fn scan_page(
        &self,
        name: &str,
        filter: &ScanFilter,
        start: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<ScanPage>;
}

/// Maximum partition name length.
pub const MAX_PARTITION_NAME_LEN: usize = 255;
/// Minimum partition name length.
pub const MIN_PARTITION_NAME_LEN: usize = 3;

/// Check that `name` is 3-255 characters from `[A-Za-z0-9_.-]`.
pub fn validate_partition_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid_chars && (MIN_PARTITION_NAME_LEN..=MAX_PARTITION_NAME_LEN).contains(&name.len()) {
        Ok(())
    } else {
        Err(Error::InvalidPartitionName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_status_round_trip() {
        for status in [
            PartitionStatus::Creating,
            PartitionStatus::Active,
            PartitionStatus::Deleting,
        ] {
            assert_eq!(PartitionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PartitionStatus::parse("active"), None);
    }

    #[test]
    fn test_scan_filter_matches() {
        let garage = Reading::new(18.0, "10:00:00 am", "garage");
        let attic = Reading::new(25.0, "10:00:00 am", "attic");

        assert!(ScanFilter::all().matches(&garage));
        assert!(ScanFilter::location("garage").matches(&garage));
        assert!(!ScanFilter::location("garage").matches(&attic));
    }

    #[test]
    fn test_validate_partition_name() {
        assert!(validate_partition_name("rpi-temperature-2023-05-01").is_ok());
        assert!(validate_partition_name("a.b_c").is_ok());

        let too_long = "x".repeat(MAX_PARTITION_NAME_LEN + 1);
        for bad in ["", "ab", "has space", "quote\"d", "semi;colon", too_long.as_str()] {
            assert!(matches!(
                validate_partition_name(bad),
                Err(Error::InvalidPartitionName(_))
            ));
        }
    }

    #[test]
    fn test_continuation_token_display() {
        let token = ContinuationToken::new("42");
        assert_eq!(token.as_str(), "42");
        assert_eq!(token.to_string(), "42");
    }
}
