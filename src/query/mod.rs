//! Read paths over ingested sources
//!
//! - **retrieval**: block number or timestamp → parsed records

pub mod retrieval;

pub use retrieval::Retrieval;
