//! tsblock Storage
//!
//! This module provides the on-disk side of the block engine:
//!
//! - **types**: Core data structures (Record, CatalogEntry, BlockData)
//! - **block_store**: One text file per block
//! - **source**: Per-source handle over the database and block namespace
//! - **engine**: Caller-facing ingest/fetch operations
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Ingest Path:
//!   Source lines → Pipeline → block_<n>.txt → data_blocks + timestamp_index
//!
//! Read Path:
//!   Number/Timestamp → data_blocks / timestamp_index → block_<n>.txt → Records
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tsblock::storage::Engine;
//! use tsblock::config::StorageConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::new(StorageConfig::new("./data"))?;
//!
//!     let outcome = engine.ingest("readings.txt").await?;
//!     println!("{} blocks", outcome.blocks.len());
//!
//!     let block = engine.fetch_block_by_timestamp("readings.txt", 100).await?;
//!     println!("{} records", block.records.len());
//!
//!     Ok(())
//! }
//! ```

pub mod block_store;
pub mod engine;
pub mod error;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use block_store::BlockStore;
pub use engine::Engine;
pub use error::{RecordError, StorageError, StorageResult};
pub use source::SourceStore;
pub use types::{BlockData, BlockDescriptor, CatalogEntry, Record, SourceStats};
