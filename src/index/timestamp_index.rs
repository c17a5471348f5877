//! Timestamp Index - timestamp → owning block
//!
//! Each block is indexed under the timestamp of its first record. An existing
//! timestamp is detected before the write and left untouched, so a timestamp
//! always resolves to the block that held its first occurrence.
//!
//! # Performance
//! - Insert: one primary-key probe plus one insert
//! - Resolve: single primary-key lookup

use crate::storage::StorageResult;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed timestamp index for one source
pub struct TimestampIndex<'a> {
    conn: &'a Connection,
}

impl<'a> TimestampIndex<'a> {
    pub(crate) fn create_table(conn: &Connection) -> StorageResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS timestamp_index (
                timestamp INTEGER PRIMARY KEY,
                block_number INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Map `timestamp` to `block_number` unless it is already indexed
    ///
    /// Returns `true` if a row was written.
    pub fn insert_if_absent(&self, timestamp: i64, block_number: u64) -> StorageResult<bool> {
        if let Some(existing) = self.resolve(timestamp)? {
            tracing::debug!(
                "Timestamp {} already indexed to block {}, skipping block {}",
                timestamp,
                existing,
                block_number
            );
            return Ok(false);
        }

        self.conn
            .prepare_cached("INSERT INTO timestamp_index (timestamp, block_number) VALUES (?, ?)")?
            .execute(params![timestamp, block_number as i64])?;

        tracing::debug!("Indexed timestamp {} to block {}", timestamp, block_number);
        Ok(true)
    }

    /// Block number owning `timestamp`, if indexed
    pub fn resolve(&self, timestamp: i64) -> StorageResult<Option<u64>> {
        let number: Option<i64> = self
            .conn
            .prepare_cached("SELECT block_number FROM timestamp_index WHERE timestamp = ?")?
            .query_row(params![timestamp], |row| row.get(0))
            .optional()?;
        Ok(number.map(|n| n as u64))
    }

    /// Number of indexed timestamps
    pub fn count(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM timestamp_index", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Smallest and largest indexed timestamp
    pub fn time_bounds(&self) -> StorageResult<Option<(i64, i64)>> {
        let (min, max): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM timestamp_index",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(min.zip(max))
    }
}
