//! Catalog - durable directory of blocks
//!
//! Maps block number → (file path, start offset, end offset) in the
//! `data_blocks` table. Rows are insert-or-ignore: the first writer of a block
//! number keeps it, later attempts are silent no-ops.

use crate::storage::{CatalogEntry, StorageResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;

/// Block directory backed by a source's SQLite database
pub struct Catalog<'a> {
    conn: &'a Connection,
}

impl<'a> Catalog<'a> {
    pub(crate) fn create_table(conn: &Connection) -> StorageResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS data_blocks (
                block_number INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL,
                start_offset INTEGER NOT NULL,
                end_offset INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record a block unless its number is already cataloged
    ///
    /// Returns `true` if a row was written.
    pub fn insert_if_absent(&self, entry: &CatalogEntry) -> StorageResult<bool> {
        let changed = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO data_blocks (block_number, file_path, start_offset, end_offset)
             VALUES (?, ?, ?, ?)",
        )?
        .execute(params![
            entry.number as i64,
            entry.file_path.to_string_lossy().into_owned(),
            entry.start_offset as i64,
            entry.end_offset as i64,
        ])?;

        if changed == 0 {
            tracing::debug!("Block {} already cataloged, keeping first entry", entry.number);
        }
        Ok(changed > 0)
    }

    /// Look up a block by number
    pub fn get(&self, number: u64) -> StorageResult<Option<CatalogEntry>> {
        let entry = self
            .conn
            .prepare_cached(
                "SELECT block_number, file_path, start_offset, end_offset
                 FROM data_blocks WHERE block_number = ?",
            )?
            .query_row(params![number as i64], entry_from_row)
            .optional()?;
        Ok(entry)
    }

    /// All cataloged blocks in block-number order
    pub fn all(&self) -> StorageResult<Vec<CatalogEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT block_number, file_path, start_offset, end_offset
             FROM data_blocks ORDER BY block_number",
        )?;
        let rows = stmt.query_map([], entry_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Number of cataloged blocks
    pub fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM data_blocks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let number: i64 = row.get(0)?;
    let file_path: String = row.get(1)?;
    let start_offset: i64 = row.get(2)?;
    let end_offset: i64 = row.get(3)?;

    Ok(CatalogEntry {
        number: number as u64,
        file_path: PathBuf::from(file_path),
        start_offset: start_offset as u64,
        end_offset: end_offset as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_catalog() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        Catalog::create_table(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_get() {
        let conn = memory_catalog();
        let catalog = Catalog::new(&conn);

        let entry = CatalogEntry::new(0, "blocks/s/block_0.txt", 0, 1000);
        assert!(catalog.insert_if_absent(&entry).unwrap());

        assert_eq!(catalog.get(0).unwrap(), Some(entry));
        assert_eq!(catalog.get(1).unwrap(), None);
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_number_is_ignored() {
        let conn = memory_catalog();
        let catalog = Catalog::new(&conn);

        let first = CatalogEntry::new(4, "first/block_4.txt", 4000, 5000);
        let second = CatalogEntry::new(4, "second/block_4.txt", 0, 10);

        assert!(catalog.insert_if_absent(&first).unwrap());
        assert!(!catalog.insert_if_absent(&second).unwrap());

        // first writer wins, nothing is overwritten
        assert_eq!(catalog.get(4).unwrap(), Some(first));
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn test_all_is_ordered() {
        let conn = memory_catalog();
        let catalog = Catalog::new(&conn);

        for number in [2u64, 0, 1] {
            let start = number * 10;
            catalog
                .insert_if_absent(&CatalogEntry::new(number, format!("block_{}.txt", number), start, start + 10))
                .unwrap();
        }

        let numbers: Vec<u64> = catalog.all().unwrap().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }
}
