//! tsblock Engine
//!
//! Caller-facing entry point tying the components together:
//! - Ingest path: source file → Pipeline → BlockStore + Catalog + TimestampIndex
//! - Read path: number/timestamp → Catalog/TimestampIndex → BlockStore → parse
//!
//! Source stores are opened on first use and kept open in the engine until
//! `close` is called or the engine is dropped, so a batch of calls against
//! one source reuses a single database connection.

use crate::config::StorageConfig;
use crate::index::SourceFingerprint;
use crate::ingest::{IngestOutcome, Pipeline, PipelineOptions};
use crate::query::Retrieval;
use crate::storage::error::StorageResult;
use crate::storage::source::SourceStore;
use crate::storage::types::{BlockData, BlockDescriptor, SourceStats};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufReader;

/// Read buffer for source files
const SOURCE_BUFFER_SIZE: usize = 64 * 1024;

/// The block engine
///
/// Calls run on the caller's task. The futures returned by `ingest` and the
/// fetch methods borrow a store whose SQLite connection is not `Sync`, so
/// they are not `Send` and cannot be handed to `tokio::spawn`.
pub struct Engine {
    config: StorageConfig,
    stores: HashMap<String, SourceStore>,
}

impl Engine {
    /// Create an engine rooted at `config.data_dir`
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        tracing::debug!("Engine data directory: {:?}", config.data_dir);
        Ok(Self {
            config,
            stores: HashMap::new(),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Handle for `source`, opening it on first use
    pub fn store(&mut self, source: impl AsRef<Path>) -> StorageResult<&SourceStore> {
        let name = SourceStore::name_for(source.as_ref())?;
        let store = match self.stores.entry(name) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let store = SourceStore::open(&self.config, entry.key())?;
                entry.insert(store)
            }
        };
        Ok(store)
    }

    /// Names of the stores currently held open
    pub fn open_sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Close the store for `source`; returns false if it was not open
    pub fn close(&mut self, source: impl AsRef<Path>) -> StorageResult<bool> {
        let name = SourceStore::name_for(source.as_ref())?;
        match self.stores.remove(&name) {
            Some(store) => {
                store.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every open store
    pub fn shutdown(&mut self) -> StorageResult<()> {
        for (_, store) in self.stores.drain() {
            store.close()?;
        }
        Ok(())
    }

    /// Chunk `source_path` into blocks and index them
    ///
    /// A source whose length, modification time and chunking settings match
    /// a previously completed run is answered with that run's descriptors
    /// without being read again. Block numbers already cataloged by an
    /// earlier run are never rewritten.
    pub async fn ingest(&mut self, source_path: impl AsRef<Path>) -> StorageResult<IngestOutcome> {
        let source_path = source_path.as_ref();
        let options = PipelineOptions::from(&self.config);

        let file = File::open(source_path).await?;
        let fingerprint = SourceFingerprint::new(
            &file.metadata().await?,
            options.block_size,
            options.delimiter,
            options.malformed,
        );

        let store = self.store(source_path)?;

        if let Some(run) = store.runs().find(&fingerprint)? {
            if still_cataloged(store, &run.blocks)? {
                tracing::info!(
                    "{:?} unchanged since run {} at {}, reusing {} cataloged blocks",
                    source_path,
                    run.id,
                    run.completed_at,
                    run.blocks.len()
                );
                return Ok(IngestOutcome::reused(run.blocks, run.records, run.skipped));
            }
            tracing::warn!(
                "Blocks recorded by run {} for {:?} are no longer cataloged, re-ingesting",
                run.id,
                source_path
            );
        }

        let existing = store.catalog().count()?;
        if existing > 0 {
            tracing::warn!(
                "{:?} already catalogs {} blocks; those block numbers keep their files and mappings",
                store.name(),
                existing
            );
        }

        let reader = BufReader::with_capacity(SOURCE_BUFFER_SIZE, file);
        let outcome = Pipeline::new(store, options).run(reader).await?;

        store
            .runs()
            .record(&fingerprint, outcome.records, outcome.skipped, &outcome.blocks)?;

        Ok(outcome)
    }

    /// Parsed records of block `number` of `source`
    pub async fn fetch_block(&mut self, source: impl AsRef<Path>, number: u64) -> StorageResult<BlockData> {
        let delimiter = self.config.delimiter;
        let store = self.store(source)?;
        Retrieval::new(store, delimiter).get_block(number).await
    }

    /// Parsed records of the block that first contained `timestamp`
    pub async fn fetch_block_by_timestamp(
        &mut self,
        source: impl AsRef<Path>,
        timestamp: i64,
    ) -> StorageResult<BlockData> {
        let delimiter = self.config.delimiter;
        let store = self.store(source)?;
        Retrieval::new(store, delimiter)
            .get_block_by_timestamp(timestamp)
            .await
    }

    /// Every cataloged block of `source`
    pub fn list_blocks(&mut self, source: impl AsRef<Path>) -> StorageResult<Vec<BlockDescriptor>> {
        self.store(source)?.catalog().all()
    }

    /// Block number that `timestamp` resolves to, if any
    pub fn resolve(&mut self, source: impl AsRef<Path>, timestamp: i64) -> StorageResult<Option<u64>> {
        self.store(source)?.timestamps().resolve(timestamp)
    }

    pub fn stats(&mut self, source: impl AsRef<Path>) -> StorageResult<SourceStats> {
        self.store(source)?.stats()
    }
}

/// Whether every descriptor of a recorded run still matches the catalog and its file
fn still_cataloged(store: &SourceStore, blocks: &[BlockDescriptor]) -> StorageResult<bool> {
    for block in blocks {
        if store.catalog().get(block.number)?.as_ref() != Some(block) || !block.file_path.is_file() {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Failed to close source stores: {}", e);
        }
    }
}
