//! Date-partitioned storage for thermolog sensor readings.
//!
//! Readings are kept in one partition per calendar date. This crate defines
//! the [`PartitionStore`] capability, ships a SQLite backend ([`Store`]) and
//! an in-memory backend ([`MemoryStore`]), and layers [`PartitionScanner`]
//! on top to read whole partitions page by page.
//!
//! # Features
//!
//! - One SQLite table per partition, with a partition catalog and status
//! - Location filtering inside the store, backed by an index
//! - Keyset pagination with opaque continuation tokens
//! - Retry with bounded exponential backoff on transient page failures
//! - Partial results preserved when a scan fails
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thermolog_store::{PartitionScanner, ScanFilter, Store, default_db_path};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(Store::open(default_db_path())?);
//! let scanner = PartitionScanner::new(store);
//!
//! let partition = "rpi-temperature-2023-05-01";
//! if scanner.exists(partition).await? {
//!     let readings = scanner.scan_all(partition, &ScanFilter::location("garage")).await?;
//!     println!("{} readings", readings.len());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod partition;
mod retry;
mod scanner;
mod schema;
mod store;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use partition::{
    ContinuationToken, MAX_PARTITION_NAME_LEN, MIN_PARTITION_NAME_LEN, PartitionStatus,
    PartitionStore, ScanFilter, ScanPage, validate_partition_name,
};
pub use retry::{RetryConfig, with_retry};
pub use scanner::{DEFAULT_PAGE_SIZE, PartitionScanner, ScanError, ScanOptions};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/thermolog/readings.db`
/// - macOS: `~/Library/Application Support/thermolog/readings.db`
/// - Windows: `C:\Users\<user>\AppData\Local\thermolog\readings.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("thermolog")
        .join("readings.db")
}
