//! Error types for thermolog-store.

use std::path::PathBuf;

/// Result type for thermolog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to a partition store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Partition name contains characters the store cannot address.
    #[error("Invalid partition name '{0}'")]
    InvalidPartitionName(String),

    /// Scan addressed a partition the store does not hold.
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    /// Database was written by a newer schema than this build understands.
    #[error("Unsupported schema version {found} (newest supported is {supported})")]
    UnsupportedSchema { found: i32, supported: i32 },

    /// Continuation token was not produced by this store.
    #[error("Invalid continuation token '{0}'")]
    InvalidToken(String),

    /// The store could not serve the request right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Unavailable(_) => true,
            Error::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
