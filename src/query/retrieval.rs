//! Retrieval Service
//!
//! Two read paths over a source store:
//!
//! ```text
//! get_block(n)                 Catalog(n) → BlockStore.load → parse
//! get_block_by_timestamp(t)    TimestampIndex(t) → get_block
//! ```
//!
//! Both are read-only; misses are explicit errors.

use crate::ingest::parser::parse_lines;
use crate::storage::{BlockData, SourceStore, StorageError, StorageResult};

pub struct Retrieval<'a> {
    store: &'a SourceStore,
    delimiter: char,
}

impl<'a> Retrieval<'a> {
    pub fn new(store: &'a SourceStore, delimiter: char) -> Self {
        Self { store, delimiter }
    }

    /// Load and parse block `number`
    pub async fn get_block(&self, number: u64) -> StorageResult<BlockData> {
        let entry = self
            .store
            .catalog()
            .get(number)?
            .ok_or(StorageError::BlockNotFound(number))?;

        let lines = self.store.blocks().load(number, &entry.file_path).await?;
        let records = parse_lines(lines.iter().map(String::as_str), self.delimiter)
            .map_err(|(line, source)| StorageError::MalformedRecord { line, source })?;

        if records.len() as u64 != entry.record_count() {
            tracing::warn!(
                "Block {} holds {} records but is cataloged as [{}, {})",
                number,
                records.len(),
                entry.start_offset,
                entry.end_offset
            );
        }

        Ok(BlockData { number, records })
    }

    /// Load the block that first contained `timestamp`
    pub async fn get_block_by_timestamp(&self, timestamp: i64) -> StorageResult<BlockData> {
        let number = self
            .store
            .timestamps()
            .resolve(timestamp)?
            .ok_or(StorageError::TimestampNotFound(timestamp))?;

        self.get_block(number).await
    }
}
