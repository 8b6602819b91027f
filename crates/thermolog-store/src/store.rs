//! SQLite-backed partition store.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::Connection;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use thermolog_types::Reading;

use crate::error::{Error, Result};
use crate::partition::{
    ContinuationToken, PartitionStatus, PartitionStore, ScanFilter, ScanPage,
    validate_partition_name,
};
use crate::schema::{self, quote_ident};

/// SQLite-based store holding one table per date partition.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a partition (no-op if it already exists).
    pub async fn create_partition(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        schema::create_partition(&conn, name, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Change the catalog status of an existing partition.
    pub async fn set_partition_status(&self, name: &str, status: PartitionStatus) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE partitions SET status = ?2 WHERE name = ?1",
            rusqlite::params![name, status.as_str()],
        )?;
        Ok(())
    }

    /// Append a reading to a partition, creating the partition if needed.
    pub async fn insert_reading(&self, partition: &str, reading: &Reading) -> Result<i64> {
        let conn = self.conn.lock().await;
        schema::create_partition(&conn, partition, OffsetDateTime::now_utc().unix_timestamp())?;

        conn.execute(
            &format!(
                "INSERT INTO {} (location, time, value) VALUES (?1, ?2, ?3)",
                quote_ident(partition)
            ),
            rusqlite::params![reading.location, reading.time, reading.value],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List partition names in the catalog, oldest name first.
    pub async fn list_partitions(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Reading)> {
    Ok((
        row.get(0)?,
        Reading {
            value: row.get(1)?,
            time: row.get(2)?,
            location: row.get(3)?,
        },
    ))
}

fn parse_token(token: &ContinuationToken) -> Result<i64> {
    token
        .as_str()
        .parse::<i64>()
        .map_err(|_| Error::InvalidToken(token.to_string()))
}

#[async_trait]
impl PartitionStore for Store {
    async fn describe_partition(&self, name: &str) -> Result<Option<PartitionStatus>> {
        let conn = self.conn.lock().await;
        schema::partition_status(&conn, name)
    }

    async fn scan_page(
        &self,
        name: &str,
        filter: &ScanFilter,
        start: Option<&ContinuationToken>,
        page_size: u32,
    ) -> Result<ScanPage> {
        validate_partition_name(name)?;
        let after_id = start.map(parse_token).transpose()?.unwrap_or(0);
        let table = quote_ident(name);

        debug!("Scanning {} after id {} (page size {})", name, after_id, page_size);

        let conn = self.conn.lock().await;
        let rows = match &filter.location {
            Some(location) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, value, time, location FROM {table}
                     WHERE location = ?1 AND id > ?2 ORDER BY id LIMIT ?3"
                ))?;
                stmt.query_map(rusqlite::params![location, after_id, page_size], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, value, time, location FROM {table}
                     WHERE id > ?1 ORDER BY id LIMIT ?2"
                ))?;
                stmt.query_map(rusqlite::params![after_id, page_size], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let next = if rows.len() as u64 == u64::from(page_size) {
            rows.last().map(|(id, _)| ContinuationToken::new(id.to_string()))
        } else {
            None
        };

        Ok(ScanPage {
            items: rows.into_iter().map(|(_, reading)| reading).collect(),
            next,
        })
    }
}
