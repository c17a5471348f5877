//! Ingestion Pipeline
//!
//! Streams a source line by line and cuts it into fixed-size blocks:
//!
//! ```text
//!   Idle → Streaming → Accumulating ⇄ FlushBlock
//!                           │
//!                           └──────→ FlushFinal → Completed
//!
//!   any state ──error──→ Failed
//! ```
//!
//! Every flush runs the same sequence: persist lines → catalog entry →
//! timestamp index entry for the block's first record. Block N holds exactly
//! the Nth group of up to `block_size` accepted lines in source order.
//!
//! Blocks are immutable once cataloged. When a run reaches a block number the
//! catalog already holds, the existing file, entry and timestamp mapping stay
//! as they are and the run reports the cataloged entry for that number.

use crate::config::{MalformedPolicy, StorageConfig};
use crate::ingest::parser::parse_record;
use crate::storage::{BlockDescriptor, CatalogEntry, SourceStore, StorageError, StorageResult};
use serde::Serialize;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Streaming,
    Accumulating,
    FlushBlock,
    FlushFinal,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

/// Settings that shape block boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub block_size: usize,
    pub delimiter: char,
    pub malformed: MalformedPolicy,
}

impl From<&StorageConfig> for PipelineOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            block_size: config.block_size,
            delimiter: config.delimiter,
            malformed: config.malformed,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

/// Result of an `ingest` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub success: bool,
    /// Cataloged entry for each block number this run reached, in order
    pub blocks: Vec<BlockDescriptor>,
    /// Records accepted into blocks
    pub records: u64,
    /// Malformed lines dropped under the skip policy
    pub skipped: u64,
    /// Block numbers that were already cataloged and left untouched
    pub kept: u64,
    /// True when answered from a previous identical run without reading the source
    pub reused: bool,
    pub elapsed_ms: u64,
}

impl IngestOutcome {
    /// Outcome for a source that was already fully ingested
    pub fn reused(blocks: Vec<BlockDescriptor>, records: u64, skipped: u64) -> Self {
        Self {
            success: true,
            blocks,
            records,
            skipped,
            kept: 0,
            reused: true,
            elapsed_ms: 0,
        }
    }
}

/// One ingestion run over one source
pub struct Pipeline<'a> {
    store: &'a SourceStore,
    options: PipelineOptions,
    state: RunState,
    buffer: Vec<String>,
    /// Timestamp of the first record currently buffered
    first_timestamp: Option<i64>,
    block_number: u64,
    start_offset: u64,
    line_number: u64,
    skipped: u64,
    kept: u64,
    produced: Vec<BlockDescriptor>,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a SourceStore, options: PipelineOptions) -> Self {
        Self {
            store,
            options,
            state: RunState::Idle,
            buffer: Vec::with_capacity(options.block_size),
            first_timestamp: None,
            block_number: 0,
            start_offset: 0,
            line_number: 0,
            skipped: 0,
            kept: 0,
            produced: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Drive the state machine until the source is exhausted or a step fails
    ///
    /// Blocks flushed before a failure stay persisted and cataloged.
    pub async fn run<R>(mut self, reader: R) -> StorageResult<IngestOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.options.block_size == 0 {
            return Err(StorageError::Config("block_size must be at least 1".into()));
        }

        let started = Instant::now();
        let mut lines = reader.lines();

        tracing::info!(
            "Ingesting into {:?} (block size {}, malformed lines: {})",
            self.store.name(),
            self.options.block_size,
            self.options.malformed.as_str()
        );

        while !self.state.is_terminal() {
            let next = match self.state {
                RunState::Idle => Ok(RunState::Streaming),
                RunState::Streaming | RunState::Accumulating => self.advance(&mut lines).await,
                RunState::FlushBlock => self.flush().await.map(|_| RunState::Accumulating),
                RunState::FlushFinal => self.flush().await.map(|_| RunState::Completed),
                RunState::Completed | RunState::Failed => break,
            };

            match next {
                Ok(state) => self.transition(state),
                Err(e) => {
                    self.transition(RunState::Failed);
                    tracing::error!(
                        "Ingestion of {:?} failed after {} blocks: {}",
                        self.store.name(),
                        self.produced.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        let records = self.start_offset;
        tracing::info!(
            "Ingested {} records into {} blocks ({} skipped) in {:?}",
            records,
            self.produced.len(),
            self.skipped,
            started.elapsed()
        );

        Ok(IngestOutcome {
            success: true,
            blocks: self.produced,
            records,
            skipped: self.skipped,
            kept: self.kept,
            reused: false,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn transition(&mut self, next: RunState) {
        if next != self.state {
            tracing::trace!("Pipeline {:?} → {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Pull one line and decide the next state
    async fn advance<R>(&mut self, lines: &mut Lines<R>) -> StorageResult<RunState>
    where
        R: AsyncBufRead + Unpin,
    {
        let Some(line) = lines.next_line().await? else {
            return Ok(if self.buffer.is_empty() {
                RunState::Completed
            } else {
                RunState::FlushFinal
            });
        };
        self.line_number += 1;

        match parse_record(&line, self.options.delimiter) {
            Ok(record) => {
                if self.buffer.is_empty() {
                    self.first_timestamp = Some(record.timestamp);
                }
                self.buffer.push(line);
            }
            Err(source) => match self.options.malformed {
                MalformedPolicy::Fail => {
                    return Err(StorageError::MalformedRecord {
                        line: self.line_number,
                        source,
                    });
                }
                MalformedPolicy::Skip => {
                    tracing::warn!("Skipping line {}: {}", self.line_number, source);
                    self.skipped += 1;
                }
            },
        }

        Ok(if self.buffer.len() >= self.options.block_size {
            RunState::FlushBlock
        } else {
            RunState::Accumulating
        })
    }

    /// Persist the buffered lines as the next block and record its metadata
    async fn flush(&mut self) -> StorageResult<()> {
        let lines = std::mem::take(&mut self.buffer);
        let number = self.block_number;
        let first_timestamp = self.first_timestamp.take();
        let end_offset = self.start_offset + lines.len() as u64;

        let entry = match self.store.catalog().get(number)? {
            Some(existing) => {
                tracing::warn!(
                    "Block {} already cataloged as [{}, {}), keeping its file and index entry",
                    number,
                    existing.start_offset,
                    existing.end_offset
                );
                self.kept += 1;
                existing
            }
            None => {
                let file_path = self.store.blocks().persist(&lines, number).await?;
                let entry = CatalogEntry::new(number, file_path, self.start_offset, end_offset);

                self.store.catalog().insert_if_absent(&entry)?;
                if let Some(timestamp) = first_timestamp {
                    self.store.timestamps().insert_if_absent(timestamp, number)?;
                }

                tracing::debug!(
                    "Flushed block {} [{}, {})",
                    number,
                    entry.start_offset,
                    entry.end_offset
                );
                entry
            }
        };

        self.produced.push(entry);
        self.block_number += 1;
        self.start_offset = end_offset;
        self.buffer = Vec::with_capacity(self.options.block_size);

        Ok(())
    }
}
