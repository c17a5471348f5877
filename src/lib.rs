//! # tsblock
//!
//! Makes large files of timestamped integer records browsable in fixed-size
//! blocks without loading them into memory.
//!
//! ## Features
//!
//! - **Streaming ingestion**: the source is read line by line and cut into
//!   blocks of `block_size` records with deterministic boundaries
//! - **Durable catalog**: a per-source SQLite database maps block numbers to
//!   block files and record offsets
//! - **Timestamp index**: each block's first timestamp resolves to the block
//! - **Idempotent metadata**: catalog and index rows are first-writer-wins
//!
//! ## Modules
//!
//! - [`storage`]: Block files, per-source stores and the [`Engine`] facade
//! - [`index`]: Catalog, timestamp index and run log tables
//! - [`ingest`]: Record parser and the ingestion pipeline
//! - [`query`]: Block retrieval by number or timestamp
//! - [`config`]: TOML/environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsblock::{Engine, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new(StorageConfig::new("./data"))?;
//!
//!     // Chunk the source into blocks of 1000 records
//!     let outcome = engine.ingest("sensor.txt").await?;
//!     for block in &outcome.blocks {
//!         println!("block {} spans [{}, {})", block.number, block.start_offset, block.end_offset);
//!     }
//!
//!     // Read back by block number or by a block's first timestamp
//!     let block = engine.fetch_block("sensor.txt", 0).await?;
//!     let same = engine.fetch_block_by_timestamp("sensor.txt", block.records[0].timestamp).await?;
//!     assert_eq!(block, same);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod index;
pub mod ingest;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    BlockData, BlockDescriptor, BlockStore, CatalogEntry, Engine, Record, RecordError,
    SourceStats, SourceStore, StorageError, StorageResult,
};

pub use index::{Catalog, RunLog, SourceFingerprint, TimestampIndex};

pub use ingest::{parse_record, IngestOutcome, Pipeline, PipelineOptions, RunState};

pub use query::Retrieval;

pub use config::{Config, ConfigError, LoggingConfig, MalformedPolicy, StorageConfig};
