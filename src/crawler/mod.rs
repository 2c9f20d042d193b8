//! Crawler module for fetching and processing the crawl frontier
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and protocol fallback
//! - The dual-queue frontier and the delay throttle
//! - Overall crawl coordination

mod coordinator;
pub mod fetcher;
pub mod scheduler;

pub use coordinator::{Coordinator, CrawlSession};
pub use fetcher::{build_http_client, FetchMode, FetchOutcome, Fetcher};
pub use scheduler::{Frontier, FrontierEntry, Throttle};

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::output::{CrawlStatistics, JsonLinesSink, RecordSink};
use crate::storage::{FsSnapshotStore, SnapshotStore, SqliteStorage};
use crate::Result;

/// Builds the snapshot store and record sink named by the output config
///
/// With `database-path` set, one SQLite database holds both snapshots and
/// records. Otherwise snapshots go to `snapshot-dir` and records to
/// `records-path` as JSON lines, or to stdout.
pub fn open_backends(config: &Config) -> Result<(Arc<dyn SnapshotStore>, Arc<dyn RecordSink>)> {
    if let Some(db_path) = &config.output.database_path {
        let storage = Arc::new(SqliteStorage::new(Path::new(db_path))?);
        tracing::info!("Storing snapshots and records in {}", db_path);
        let snapshots: Arc<dyn SnapshotStore> = storage.clone();
        let sink: Arc<dyn RecordSink> = storage;
        return Ok((snapshots, sink));
    }

    let snapshots: Arc<dyn SnapshotStore> =
        Arc::new(FsSnapshotStore::new(&config.output.snapshot_dir));
    let sink: Arc<dyn RecordSink> = match &config.output.records_path {
        Some(path) => Arc::new(JsonLinesSink::to_path(Path::new(path))?),
        None => Arc::new(JsonLinesSink::stdout()),
    };
    Ok((snapshots, sink))
}

/// Runs a complete crawl with the backends from the config
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the snapshot store and record sink
/// 2. Resolve the seed against the scope
/// 3. Run the crawl loop until the frontier drains or `max-pages` is hit
///
/// # Example
///
/// ```no_run
/// use campus_harvest::config::load_config;
/// use campus_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let stats = run_crawl(config).await?;
/// println!("{} records", stats.records());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlStatistics> {
    let (snapshots, sink) = open_backends(&config)?;
    let mut coordinator = Coordinator::new(config, snapshots, sink)?;
    coordinator.run().await
}
