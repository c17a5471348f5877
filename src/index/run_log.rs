//! Run Log - completed ingestion runs
//!
//! One row per run that reached `Completed`, keyed by a fingerprint of the
//! source file and the settings that shape block boundaries. Each row keeps
//! the descriptors that run returned, so a repeated `ingest` over an
//! unchanged source can be answered without re-reading it.

use crate::config::MalformedPolicy;
use crate::storage::{BlockDescriptor, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs::Metadata;

/// Identity of a source file plus the chunking settings used on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFingerprint {
    /// Source length in bytes
    pub len: u64,
    /// Last modification time, Unix milliseconds
    pub modified: Option<i64>,
    pub block_size: usize,
    pub delimiter: char,
    pub malformed: MalformedPolicy,
}

impl SourceFingerprint {
    pub fn new(
        metadata: &Metadata,
        block_size: usize,
        delimiter: char,
        malformed: MalformedPolicy,
    ) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis());

        Self {
            len: metadata.len(),
            modified,
            block_size,
            delimiter,
            malformed,
        }
    }
}

/// A completed run as recorded in `ingest_runs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub records: u64,
    pub skipped: u64,
    /// Descriptors the run returned, in order
    pub blocks: Vec<BlockDescriptor>,
    pub completed_at: String,
}

pub struct RunLog<'a> {
    conn: &'a Connection,
}

impl<'a> RunLog<'a> {
    pub(crate) fn create_table(conn: &Connection) -> StorageResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ingest_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_len INTEGER NOT NULL,
                source_modified INTEGER,
                block_size INTEGER NOT NULL,
                delimiter TEXT NOT NULL,
                malformed TEXT NOT NULL,
                records INTEGER NOT NULL,
                skipped INTEGER NOT NULL,
                block_count INTEGER NOT NULL,
                blocks TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record a completed run and the descriptors it returned
    pub fn record(
        &self,
        fingerprint: &SourceFingerprint,
        records: u64,
        skipped: u64,
        blocks: &[BlockDescriptor],
    ) -> StorageResult<i64> {
        let encoded = serde_json::to_string(blocks)?;

        self.conn
            .prepare_cached(
                "INSERT INTO ingest_runs
                 (source_len, source_modified, block_size, delimiter, malformed,
                  records, skipped, block_count, blocks, completed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?
            .execute(params![
                fingerprint.len as i64,
                fingerprint.modified,
                fingerprint.block_size as i64,
                fingerprint.delimiter.to_string(),
                fingerprint.malformed.as_str(),
                records as i64,
                skipped as i64,
                blocks.len() as i64,
                encoded,
                Utc::now().to_rfc3339(),
            ])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent completed run over an identical source
    pub fn find(&self, fingerprint: &SourceFingerprint) -> StorageResult<Option<RunRecord>> {
        let row = self
            .conn
            .prepare_cached(
                "SELECT id, records, skipped, blocks, completed_at FROM ingest_runs
                 WHERE source_len = ? AND source_modified IS ? AND block_size = ?
                   AND delimiter = ? AND malformed = ?
                 ORDER BY id DESC LIMIT 1",
            )?
            .query_row(
                params![
                    fingerprint.len as i64,
                    fingerprint.modified,
                    fingerprint.block_size as i64,
                    fingerprint.delimiter.to_string(),
                    fingerprint.malformed.as_str(),
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, records, skipped, blocks, completed_at)) = row else {
            return Ok(None);
        };

        Ok(Some(RunRecord {
            id,
            records: records as u64,
            skipped: skipped as u64,
            blocks: serde_json::from_str(&blocks)?,
            completed_at,
        }))
    }

    /// Number of completed runs
    pub fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(len: u64, modified: Option<i64>) -> SourceFingerprint {
        SourceFingerprint {
            len,
            modified,
            block_size: 1000,
            delimiter: ',',
            malformed: MalformedPolicy::Fail,
        }
    }

    fn run_log() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        RunLog::create_table(&conn).unwrap();
        conn
    }

    #[test]
    fn test_record_and_find() {
        let conn = run_log();
        let log = RunLog::new(&conn);

        let fp = fingerprint(4096, Some(1_700_000_000_000));
        assert!(log.find(&fp).unwrap().is_none());

        let blocks = vec![
            BlockDescriptor::new(0, "blocks/s/block_0.txt", 0, 1000),
            BlockDescriptor::new(1, "blocks/s/block_1.txt", 1000, 1500),
        ];
        log.record(&fp, 1500, 0, &blocks).unwrap();

        let run = log.find(&fp).unwrap().unwrap();
        assert_eq!(run.records, 1500);
        assert_eq!(run.blocks, blocks);
        assert_eq!(log.count().unwrap(), 1);
    }

    #[test]
    fn test_latest_run_wins() {
        let conn = run_log();
        let log = RunLog::new(&conn);
        let fp = fingerprint(10, Some(1));

        log.record(&fp, 1, 0, &[]).unwrap();
        let latest = log.record(&fp, 2, 0, &[]).unwrap();

        let run = log.find(&fp).unwrap().unwrap();
        assert_eq!(run.id, latest);
        assert_eq!(run.records, 2);
    }

    #[test]
    fn test_fingerprint_mismatch() {
        let conn = run_log();
        let log = RunLog::new(&conn);

        log.record(&fingerprint(10, Some(1)), 1, 0, &[]).unwrap();

        assert!(log.find(&fingerprint(11, Some(1))).unwrap().is_none());
        assert!(log.find(&fingerprint(10, Some(2))).unwrap().is_none());

        let mut other_size = fingerprint(10, Some(1));
        other_size.block_size = 500;
        assert!(log.find(&other_size).unwrap().is_none());

        let mut other_delimiter = fingerprint(10, Some(1));
        other_delimiter.delimiter = ';';
        assert!(log.find(&other_delimiter).unwrap().is_none());
    }

    #[test]
    fn test_missing_modified_time_matches_null() {
        let conn = run_log();
        let log = RunLog::new(&conn);

        log.record(&fingerprint(10, None), 1, 0, &[]).unwrap();
        assert!(log.find(&fingerprint(10, None)).unwrap().is_some());
    }
}
