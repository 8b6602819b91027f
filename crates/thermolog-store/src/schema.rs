//! Database schema and migrations.
//!
//! The database holds a `partitions` catalog plus one readings table per
//! partition. Partition tables are named after the partition itself (for
//! example `rpi-temperature-2023-05-01`) and carry a `location` index so
//! filtered scans do not walk the whole table.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::partition::{PartitionStatus, validate_partition_name};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per date partition
        CREATE TABLE IF NOT EXISTS partitions (
            name TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Quote a partition name for use as an SQL identifier.
///
/// Names are validated before they get here, so this only has to wrap them.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Table names the catalog itself uses.
const RESERVED_TABLES: &[&str] = &["partitions", "schema_version", "sqlite_sequence"];

/// Create a partition's readings table and register it as active.
pub fn create_partition(conn: &Connection, name: &str, created_at: i64) -> Result<()> {
    validate_partition_name(name)?;
    if RESERVED_TABLES.contains(&name) || name.starts_with("sqlite_") {
        return Err(Error::InvalidPartitionName(name.to_string()));
    }

    let table = quote_ident(name);
    let index = quote_ident(&format!("idx_{}_location", name));
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location TEXT,
            time TEXT NOT NULL,
            value REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS {index} ON {table}(location);"
    ))?;

    conn.execute(
        "INSERT INTO partitions (name, status, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO NOTHING",
        rusqlite::params![name, PartitionStatus::Active.as_str(), created_at],
    )?;

    Ok(())
}

/// Look up a partition's status in the catalog.
pub fn partition_status(conn: &Connection, name: &str) -> Result<Option<PartitionStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM partitions WHERE name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    Ok(status.and_then(|s| PartitionStatus::parse(&s)))
}
