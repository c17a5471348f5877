//! tsblock Index Structures
//!
//! Each source gets one SQLite database holding:
//!
//! - **Catalog** (`data_blocks`): block number → file path + offset range
//! - **TimestampIndex** (`timestamp_index`): timestamp → owning block
//! - **RunLog** (`ingest_runs`): completed ingestion runs
//!
//! # Lookup paths
//!
//! ```text
//! fetch_block(n)          → Catalog(n) → file path → BlockStore
//! fetch_block_by_ts(t)    → TimestampIndex(t) → n → Catalog(n) → ...
//! ```

mod catalog;
mod run_log;
mod timestamp_index;

pub use catalog::Catalog;
pub use run_log::{RunLog, RunRecord, SourceFingerprint};
pub use timestamp_index::TimestampIndex;

use crate::storage::StorageResult;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open (creating if needed) a source database and ensure its schema
pub fn open_database(path: &Path) -> StorageResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    // WAL lets a reader handle coexist with an ingesting one
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
        ",
    )?;

    Catalog::create_table(&conn)?;
    TimestampIndex::create_table(&conn)?;
    RunLog::create_table(&conn)?;

    Ok(conn)
}
