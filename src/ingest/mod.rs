//! Ingestion
//!
//! - **parser**: line → `Record`
//! - **pipeline**: streaming block chunker driving the block store, catalog
//!   and timestamp index

pub mod parser;
pub mod pipeline;

pub use parser::{parse_lines, parse_record};
pub use pipeline::{IngestOutcome, Pipeline, PipelineOptions, RunState};
