//! Full-partition scans on top of [`PartitionStore`].
//!
//! The store only hands out one page at a time. [`PartitionScanner`] follows
//! continuation tokens until a partition is exhausted, retrying pages that
//! fail transiently. A scan that still fails keeps what it already read in
//! [`ScanError::partial`].

use std::sync::Arc;

use thermolog_types::Reading;
use tracing::debug;

use crate::error::{Error, Result};
use crate::partition::{ContinuationToken, PartitionStatus, PartitionStore, ScanFilter};
use crate::retry::{RetryConfig, with_retry};

/// Default number of records examined per page.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Tuning for [`PartitionScanner`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Records examined per store call.
    pub page_size: u32,
    /// Stop paging once this many readings have been collected.
    ///
    /// The cap is checked between pages, so a scan may overshoot it by up to
    /// one page.
    pub max_results: Option<usize>,
    /// Retry policy applied to each page.
    pub retry: RetryConfig,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_results: None,
            retry: RetryConfig::default(),
        }
    }
}

/// A partition scan that failed part-way.
#[derive(Debug, thiserror::Error)]
#[error("scan of partition {partition} failed after {pages} page(s): {source}")]
pub struct ScanError {
    /// The partition being scanned.
    pub partition: String,
    /// Pages read successfully before the failure.
    pub pages: u32,
    /// Readings collected from those pages.
    pub partial: Vec<Reading>,
    /// The error from the failing page.
    #[source]
    pub source: Error,
}

/// Existence checks and exhaustive scans over a shared store.
#[derive(Clone)]
pub struct PartitionScanner {
    store: Arc<dyn PartitionStore>,
    options: ScanOptions,
}

impl PartitionScanner {
    /// Create a scanner with default options.
    pub fn new(store: Arc<dyn PartitionStore>) -> Self {
        Self::with_options(store, ScanOptions::default())
    }

    /// Create a scanner with explicit options.
    pub fn with_options(store: Arc<dyn PartitionStore>, options: ScanOptions) -> Self {
        Self { store, options }
    }

    /// Whether `partition` exists and is ready to be read.
    ///
    /// Partitions that are still being created or are being deleted count as
    /// absent. Store failures are returned as errors.
    pub async fn exists(&self, partition: &str) -> Result<bool> {
        let status = self.store.describe_partition(partition).await?;
        debug!("Partition {} status: {:?}", partition, status);
        Ok(status == Some(PartitionStatus::Active))
    }

    /// Read every reading in `partition` that passes `filter`, in store order.
    pub async fn scan_all(
        &self,
        partition: &str,
        filter: &ScanFilter,
    ) -> std::result::Result<Vec<Reading>, ScanError> {
        let mut readings = Vec::new();
        let mut token: Option<ContinuationToken> = None;
        let mut pages = 0u32;

        loop {
            let start = token.as_ref();
            let store = &self.store;
            let page_size = self.options.page_size;
            let page = with_retry(&self.options.retry, "scan_page", move || {
                store.scan_page(partition, filter, start, page_size)
            })
            .await;

            let page = match page {
                Ok(page) => page,
                Err(source) => {
                    return Err(ScanError {
                        partition: partition.to_string(),
                        pages,
                        partial: readings,
                        source,
                    });
                }
            };

            pages += 1;
            readings.extend(page.items);
            debug!(
                "Partition {}: page {} read, {} readings so far",
                partition,
                pages,
                readings.len()
            );

            if let Some(max) = self.options.max_results {
                if readings.len() >= max {
                    debug!("Partition {}: stopping at result cap {}", partition, max);
                    break;
                }
            }

            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(readings)
    }
}
