//! Block Store - one text file per block
//!
//! Layout inside a source's namespace:
//! ```text
//! <data_dir>/blocks/<source>/
//!   block_0.txt
//!   block_1.txt
//!   ...
//! ```
//!
//! Each file holds the block's raw lines joined by `\n` (no trailing newline).
//! Files are written to a `.tmp` sibling first and renamed into place.

use crate::storage::error::{StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persists and loads raw block contents for a single source
#[derive(Debug, Clone)]
pub struct BlockStore {
    dir: PathBuf,
}

impl BlockStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Namespace directory holding this source's blocks
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic location of a block
    pub fn path_for(&self, number: u64) -> PathBuf {
        self.dir.join(format!("block_{}.txt", number))
    }

    /// Whether the storage unit for `number` exists at its default location
    pub fn contains(&self, number: u64) -> bool {
        self.path_for(number).is_file()
    }

    /// Write `lines` as block `number` and return its storage reference
    pub async fn persist(&self, lines: &[String], number: u64) -> StorageResult<PathBuf> {
        if !self.dir.exists() {
            tokio::fs::create_dir_all(&self.dir).await?;
            tracing::info!("Created block directory {:?}", self.dir);
        }

        let path = self.path_for(number);
        let tmp_path = path.with_extension("txt.tmp");

        tokio::fs::write(&tmp_path, lines.join("\n")).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!("Wrote block {} ({} lines) to {:?}", number, lines.len(), path);
        Ok(path)
    }

    /// Read block `number` back from `path`
    ///
    /// A missing file surfaces as `BlockNotFound`, not as an I/O error.
    pub async fn load(&self, number: u64, path: &Path) -> StorageResult<Vec<String>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Block {} is cataloged but {:?} is missing", number, path);
                return Err(StorageError::BlockNotFound(number));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(content.split('\n').map(str::to_string).collect())
    }
}
