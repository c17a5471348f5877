//! Source store handle
//!
//! Everything one logical source owns on disk:
//!
//! ```text
//! <data_dir>/databases/data_<name>.db   catalog, timestamp index, run log
//! <data_dir>/blocks/<name>/             block_<n>.txt files
//! ```
//!
//! `<name>` is the source file's base name with its extension stripped, so
//! `/in/sensor_a.txt` and a bare `sensor_a` address the same store.

use crate::config::StorageConfig;
use crate::index::{open_database, Catalog, RunLog, TimestampIndex};
use crate::storage::block_store::BlockStore;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::SourceStats;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Open handle on one source's database and block namespace
pub struct SourceStore {
    name: String,
    db_path: PathBuf,
    conn: Connection,
    blocks: BlockStore,
}

impl SourceStore {
    /// Store name for a source path
    pub fn name_for(source: &Path) -> StorageResult<String> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.starts_with('.'))
            .ok_or_else(|| StorageError::InvalidSource(source.to_path_buf()))?;
        Ok(stem.to_string())
    }

    /// Open the store called `name`, creating its database on first use
    pub fn open(config: &StorageConfig, name: &str) -> StorageResult<Self> {
        let db_path = config.database_path(name);
        let existed = db_path.exists();

        let conn = open_database(&db_path)?;
        if !existed {
            tracing::info!("Created source store {:?} at {:?}", name, db_path);
        }

        Ok(Self {
            name: name.to_string(),
            db_path,
            conn,
            blocks: BlockStore::new(config.blocks_dir(name)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(&self.conn)
    }

    pub fn timestamps(&self) -> TimestampIndex<'_> {
        TimestampIndex::new(&self.conn)
    }

    pub fn runs(&self) -> RunLog<'_> {
        RunLog::new(&self.conn)
    }

    /// Summary of what this store holds
    pub fn stats(&self) -> StorageResult<SourceStats> {
        let entries = self.catalog().all()?;
        let missing = entries.iter().filter(|e| !e.file_path.is_file()).count() as u64;

        Ok(SourceStats {
            name: self.name.clone(),
            database: self.db_path.clone(),
            block_dir: self.blocks.dir().to_path_buf(),
            blocks: entries.len() as u64,
            missing_blocks: missing,
            indexed_timestamps: self.timestamps().count()?,
            time_bounds: self.timestamps().time_bounds()?,
            completed_runs: self.runs().count()?,
        })
    }

    /// Fold the WAL back into the database file and release the connection
    pub fn close(self) -> StorageResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        self.conn.close().map_err(|(_, e)| StorageError::from(e))?;
        tracing::debug!("Closed source store {:?}", self.name);
        Ok(())
    }
}
