//! Output module for crawl records and run statistics
//!
//! This module handles:
//! - The [`CrawlRecord`] handed to the indexing layer
//! - Record sinks (in-memory, JSON lines, and the SQLite backend)
//! - Counting and printing run statistics

mod record;
mod sinks;
pub mod stats;

pub use record::{AnchorText, CrawlRecord, WEBPAGE_FILE_TYPE, WEBPAGE_MIME_TYPE};
pub use sinks::{JsonLinesSink, MemorySink, RecordSink};
pub use stats::{print_statistics, CrawlStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
