//! Run statistics
//!
//! Counters are collected by the coordinator while the crawl runs and printed
//! once at the end.

use crate::state::PageState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Seed the run started from
    pub seed: String,

    /// Count of URLs by terminal state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Records emitted, split by kind
    pub documents: u64,
    pub webpages: u64,
    pub attachments: u64,

    pub snapshots_saved: u64,
    pub snapshot_failures: u64,

    /// Dequeued beyond `max-depth` and dropped without a visit
    pub depth_discards: u64,

    /// Possible attachment pages that got a shallow scan
    pub attachment_pages_scanned: u64,

    /// HTTP attempts made, including retries and fallbacks
    pub fetch_attempts: u64,

    /// Records the sink refused
    pub sink_failures: u64,
}

impl CrawlStatistics {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            seed: seed.into(),
            pages_by_state: HashMap::new(),
            documents: 0,
            webpages: 0,
            attachments: 0,
            snapshots_saved: 0,
            snapshot_failures: 0,
            depth_discards: 0,
            attachment_pages_scanned: 0,
            fetch_attempts: 0,
            sink_failures: 0,
        }
    }

    /// Counts a URL reaching a terminal state
    pub fn record_state(&mut self, state: PageState) {
        *self.pages_by_state.entry(state).or_insert(0) += 1;
    }

    pub fn count(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// URLs charged against `max-pages`
    pub fn visited(&self) -> u64 {
        self.pages_by_state.values().sum()
    }

    pub fn records(&self) -> u64 {
        self.documents + self.webpages
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of visited URLs that produced a record, in percent
    pub fn success_rate(&self) -> f64 {
        let visited = self.visited();
        if visited == 0 {
            return 0.0;
        }
        (self.records() as f64 / visited as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seed: {}", stats.seed);
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  URLs visited: {}", stats.visited());
    println!("  Fetch attempts: {}", stats.fetch_attempts);
    println!();

    println!("Records:");
    println!("  Webpages: {}", stats.webpages);
    println!(
        "  Documents: {} ({} reached as attachments)",
        stats.documents, stats.attachments
    );
    println!(
        "  Snapshots: {} saved, {} failed",
        stats.snapshots_saved, stats.snapshot_failures
    );
    if stats.sink_failures > 0 {
        println!("  Records lost to sink errors: {}", stats.sink_failures);
    }
    println!();

    println!("URLs by State:");
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

    for (state, count) in state_counts {
        println!("  {}: {}", state, count);
    }
    if stats.depth_discards > 0 {
        println!("  dropped beyond max depth: {}", stats.depth_discards);
    }
    if stats.attachment_pages_scanned > 0 {
        println!(
            "  attachment pages scanned: {}",
            stats.attachment_pages_scanned
        );
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} URLs recorded)",
        stats.success_rate(),
        stats.records(),
        stats.visited()
    );
}
