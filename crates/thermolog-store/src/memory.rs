//! In-memory partition store for testing.
//!
//! [`MemoryStore`] implements [`PartitionStore`] without a database so query
//! logic can be exercised against exact page boundaries and injected faults.
//!
//! # Features
//!
//! - **Failure injection**: fail the next N page reads, or every page read of
//!   one partition, or every describe call
//! - **Call accounting**: count describe and scan calls per partition
//! - **Partition status**: register partitions in any [`PartitionStatus`]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use thermolog_types::Reading;

use crate::error::{Error, Result};
use crate::partition::{ContinuationToken, PartitionStatus, PartitionStore, ScanFilter, ScanPage};

#[derive(Debug, Clone)]
struct MemoryPartition {
    status: PartitionStatus,
    readings: Vec<Reading>,
}

/// A partition store held entirely in memory.
///
/// # Example
///
/// ```
/// use thermolog_store::{MemoryStore, PartitionStore, ScanFilter};
/// use thermolog_types::Reading;
///
/// # #[tokio::main]
/// # async fn main() -> thermolog_store::Result<()> {
/// let store = MemoryStore::new();
/// store.insert("rpi-temperature-2023-05-01", Reading::new(20.0, "10:00:00 am", "A")).await;
///
/// let page = store
///     .scan_page("rpi-temperature-2023-05-01", &ScanFilter::all(), None, 100)
///     .await?;
/// assert_eq!(page.items.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<String, MemoryPartition>>,
    fail_describe: AtomicBool,
    fail_next_scans: AtomicU32,
    failing_partitions: RwLock<Vec<String>>,
    describe_calls: RwLock<HashMap<String, u32>>,
    scan_calls: RwLock<HashMap<String, u32>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active, empty partition.
    pub async fn create_partition(&self, name: &str) {
        self.create_partition_with_status(name, PartitionStatus::Active)
            .await;
    }

    /// Register a partition in a given status (keeps existing readings).
    pub async fn create_partition_with_status(&self, name: &str, status: PartitionStatus) {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(name.to_string())
            .and_modify(|p| p.status = status)
            .or_insert_with(|| MemoryPartition {
                status,
                readings: Vec::new(),
            });
    }

    /// Append a reading, creating an active partition if needed.
    pub async fn insert(&self, name: &str, reading: Reading) {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(name.to_string())
            .or_insert_with(|| MemoryPartition {
                status: PartitionStatus::Active,
                readings: Vec::new(),
            })
            .readings
            .push(reading);
    }

    /// Make every `describe_partition` call fail.
    pub fn set_fail_describe(&self, fail: bool) {
        self.fail_describe.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` page reads fail (on any partition).
    pub fn fail_next_scans(&self, count: u32) {
        self.fail_next_scans.store(count, Ordering::SeqCst);
    }

    /// Make every page read of `name` fail.
    pub async fn fail_partition(&self, name: &str) {
        self.failing_partitions.write().await.push(name.to_string());
    }

    /// Number of `scan_page` calls made against `name`.
    pub async fn scan_calls(&self, name: &str) -> u32 {
        self.scan_calls.read().await.get(name).copied().unwrap_or(0)
    }

    /// Number of `describe_partition` calls made against `name`.
    pub async fn describe_calls(&self, name: &str) -> u32 {
        self.describe_calls.read().await.get(name).copied().unwrap_or(0)
    }

    /// Names of every partition that was described or scanned.
    pub async fn touched_partitions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.describe_calls.read().await.keys().cloned().collect();
        for name in self.scan_calls.read().await.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next_scans
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PartitionStore for MemoryStore {
    async fn describe_partition(&self, name: &str) -> Result<Option<PartitionStatus>> {
        *self
            .describe_calls
            .write()
            .await
            .entry(name.to_string())
            .or_insert(0) += 1;

        if self.fail_describe.load(Ordering::SeqCst) {
            return Err(Error::Unavailable(format!("describe {} failed", name)));
        }

        let partitions = self.partitions.read().await;
        Ok(partitions.get(name).map(|p| p.status))
    }

    async fn scan_page(
        &self,
        name: &str,
        filter: &ScanFilter,
        start: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<ScanPage> {
        *self
            .scan_calls
            .write()
            .await
            .entry(name.to_string())
            .or_insert(0) += 1;

        if self.take_injected_failure()
            || self.failing_partitions.read().await.iter().any(|p| p == name)
        {
            return Err(Error::Unavailable(format!("scan of {} failed", name)));
        }

        let offset = match start {
            Some(token) => token
                .as_str()
                .parse::<usize>()
                .map_err(|_| Error::InvalidToken(token.to_string()))?,
            None => 0,
        };

        let partitions = self.partitions.read().await;
        let partition = partitions
            .get(name)
            .ok_or_else(|| Error::PartitionNotFound(name.to_string()))?;

        // Like a real table scan, the page size bounds records examined,
        // not records returned.
        let end = offset
            .saturating_add(page_size as usize)
            .min(partition.readings.len());
        let items = partition.readings[offset.min(end)..end]
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        let next = (end < partition.readings.len()).then(|| ContinuationToken::new(end.to_string()));

        Ok(ScanPage { items, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: &str = "rpi-temperature-2023-05-01";

    #[tokio::test]
    async fn test_describe_missing_and_active() {
        let store = MemoryStore::new();
        assert_eq!(store.describe_partition(DAY).await.unwrap(), None);

        store.create_partition(DAY).await;
        assert_eq!(
            store.describe_partition(DAY).await.unwrap(),
            Some(PartitionStatus::Active)
        );
        assert_eq!(store.describe_calls(DAY).await, 2);
    }

    #[tokio::test]
    async fn test_status_change_keeps_readings() {
        let store = MemoryStore::new();
        store.insert(DAY, Reading::new(1.0, "10:00:00 am", "A")).await;
        store
            .create_partition_with_status(DAY, PartitionStatus::Creating)
            .await;

        assert_eq!(
            store.describe_partition(DAY).await.unwrap(),
            Some(PartitionStatus::Creating)
        );
        let page = store.scan_page(DAY, &ScanFilter::all(), None, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_paging_examines_page_size_records() {
        let store = MemoryStore::new();
        for (i, location) in ["A", "B", "A", "B", "A"].iter().enumerate() {
            store
                .insert(DAY, Reading::new(i as f64, "10:00:00 am", *location))
                .await;
        }

        let filter = ScanFilter::location("B");
        let first = store.scan_page(DAY, &filter, None, 2).await.unwrap();
        assert_eq!(first.items.len(), 1);
        let second = store
            .scan_page(DAY, &filter, first.next.as_ref(), 2)
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        let third = store
            .scan_page(DAY, &filter, second.next.as_ref(), 2)
            .await
            .unwrap();
        assert!(third.items.is_empty());
        assert!(third.next.is_none());
        assert_eq!(store.scan_calls(DAY).await, 3);
    }

    #[tokio::test]
    async fn test_injected_scan_failures_are_consumed() {
        let store = MemoryStore::new();
        store.create_partition(DAY).await;
        store.fail_next_scans(1);

        let first = store.scan_page(DAY, &ScanFilter::all(), None, 10).await;
        assert!(matches!(first, Err(Error::Unavailable(_))));

        let second = store.scan_page(DAY, &ScanFilter::all(), None, 10).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_failing_partition_always_fails() {
        let store = MemoryStore::new();
        store.create_partition(DAY).await;
        store.fail_partition(DAY).await;

        for _ in 0..3 {
            assert!(store.scan_page(DAY, &ScanFilter::all(), None, 10).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_fail_describe() {
        let store = MemoryStore::new();
        store.set_fail_describe(true);
        assert!(store.describe_partition(DAY).await.is_err());
        store.set_fail_describe(false);
        assert!(store.describe_partition(DAY).await.is_ok());
    }

    #[tokio::test]
    async fn test_touched_partitions() {
        let store = MemoryStore::new();
        store.describe_partition("p-2023-05-02").await.unwrap();
        store.create_partition("p-2023-05-01").await;
        store
            .scan_page("p-2023-05-01", &ScanFilter::all(), None, 10)
            .await
            .unwrap();

        assert_eq!(
            store.touched_partitions().await,
            vec!["p-2023-05-01".to_string(), "p-2023-05-02".to_string()]
        );
    }

    #[tokio::test]
    async fn test_bad_token() {
        let store = MemoryStore::new();
        store.create_partition(DAY).await;
        let token = ContinuationToken::new("abc");
        let result = store
            .scan_page(DAY, &ScanFilter::all(), Some(&token), 10)
            .await;
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }
}
