//! Core data types for the block engine
//!
//! - `Record`: one parsed source line
//! - `CatalogEntry` / `BlockDescriptor`: where a block lives and which records it spans
//! - `BlockData`: a block resolved back into records
//! - `SourceStats`: summary of one source store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single parsed line: timestamp followed by its values
///
/// Only exists transiently; the persisted form is always the raw line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: i64,
    pub values: Vec<i64>,
}

impl Record {
    pub fn new(timestamp: i64, values: Vec<i64>) -> Self {
        Self { timestamp, values }
    }
}

/// One row of the block catalog
///
/// Offsets count records within the ingestion run that produced the block,
/// so `end_offset - start_offset` is the number of records in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(rename = "blockNumber")]
    pub number: u64,
    pub file_path: PathBuf,
    pub start_offset: u64,
    pub end_offset: u64,
}

/// Descriptor handed back to callers after ingestion
pub type BlockDescriptor = CatalogEntry;

impl CatalogEntry {
    pub fn new(number: u64, file_path: impl Into<PathBuf>, start_offset: u64, end_offset: u64) -> Self {
        Self {
            number,
            file_path: file_path.into(),
            start_offset,
            end_offset,
        }
    }

    /// Number of records in the block
    pub fn record_count(&self) -> u64 {
        self.end_offset.saturating_sub(self.start_offset)
    }
}

/// A block loaded from storage and parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(rename = "blockNumber")]
    pub number: u64,
    pub records: Vec<Record>,
}

impl BlockData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last timestamp held by this block
    pub fn time_span(&self) -> Option<(i64, i64)> {
        let first = self.records.first()?.timestamp;
        let last = self.records.last()?.timestamp;
        Some((first, last))
    }
}

/// Summary of a source store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub name: String,
    pub database: PathBuf,
    pub block_dir: PathBuf,
    pub blocks: u64,
    pub missing_blocks: u64,
    pub indexed_timestamps: u64,
    pub time_bounds: Option<(i64, i64)>,
    pub completed_runs: u64,
}

impl std::fmt::Display for SourceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} blocks ({} missing), {} timestamps, {} completed runs",
            self.name, self.blocks, self.missing_blocks, self.indexed_timestamps, self.completed_runs
        )
    }
}
