//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the components together:
//! - Seeding the frontier and loading the seed host's robots.txt
//! - Popping entries, enforcing depth, robots and `max-pages`
//! - Fetching, then branching to the document or webpage path
//! - Emitting records, saving snapshots and enqueueing discovered links

use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::attachment::{AttachmentHints, Resolver};
use crate::config::{validate, Config};
use crate::crawler::fetcher::{FetchMode, FetchOutcome, FetchedResponse, Fetcher};
use crate::crawler::scheduler::{Frontier, FrontierEntry, Throttle};
use crate::extract::Extractor;
use crate::output::{
    CrawlRecord, CrawlStatistics, RecordSink, WEBPAGE_FILE_TYPE, WEBPAGE_MIME_TYPE,
};
use crate::resource::Classifier;
use crate::robots::{self, RobotsCache};
use crate::state::PageState;
use crate::storage::SnapshotStore;
use crate::url::Scope;
use crate::Result;

/// Log a progress line every this many visited URLs
const PROGRESS_EVERY: usize = 10;

/// Mutable state of one crawl run
///
/// Created once per run and dropped at the end of it; nothing outlives it.
#[derive(Debug)]
pub struct CrawlSession {
    pub seed: Url,
    pub frontier: Frontier,
    pub robots: RobotsCache,
    pub throttle: Throttle,
    pub stats: CrawlStatistics,

    /// Shallow scans still allowed for possible attachment pages
    attachment_pages_left: usize,
}

impl CrawlSession {
    pub fn new(seed: Url, config: &Config) -> Self {
        Self {
            stats: CrawlStatistics::new(seed.as_str()),
            seed,
            frontier: Frontier::new(),
            robots: RobotsCache::new(),
            throttle: Throttle::new(
                config.crawler.delay,
                config.crawler.long_pause_every,
                config.crawler.long_pause_factor,
            ),
            attachment_pages_left: config.crawler.attachment_page_budget,
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    extractor: Extractor,
    resolver: Resolver,
    classifier: Classifier,
    snapshots: Arc<dyn SnapshotStore>,
    sink: Arc<dyn RecordSink>,
    /// Product token matched against robots.txt groups
    agent: String,
    session: CrawlSession,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `snapshots` - Where raw HTML of fetched webpages goes
    /// * `sink` - Where emitted records go
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration or no usable seed
    pub fn new(
        config: Config,
        snapshots: Arc<dyn SnapshotStore>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self> {
        validate(&config)?;

        let scope = Scope::new(&config.scope.allowed_suffixes, &config.scope.exclude);
        let seed = scope.resolve_seed(
            &config.crawler.start_url,
            config.crawler.default_seed.as_deref(),
        )?;

        let classifier = Classifier::new(config.extract.optional_document_types);
        let fetcher = Fetcher::new(&config.fetch, &config.user_agent, classifier)?;
        let extractor = Extractor::new(&config.extract, scope, classifier)?;
        let resolver = Resolver::new(&config.attachments.known);
        let agent = config.user_agent.crawler_name.clone();
        let session = CrawlSession::new(seed, &config);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            resolver,
            classifier,
            snapshots,
            sink,
            agent,
            session,
        })
    }

    /// The seed the run starts from, after out-of-scope fallback
    pub fn seed(&self) -> &Url {
        &self.session.seed
    }

    /// Runs the main crawl loop
    ///
    /// Per-URL failures never end the run. The loop stops when both queues
    /// are empty or `max-pages` URLs have been visited.
    ///
    /// # Errors
    ///
    /// Only an invalid state transition, which means the frontier bookkeeping
    /// is broken.
    pub async fn run(&mut self) -> Result<CrawlStatistics> {
        let seed = self.session.seed.clone();
        let max_pages = self.config.crawler.max_pages;
        tracing::info!(
            "Starting crawl from {} (max {} pages, depth {})",
            seed,
            max_pages,
            self.config.crawler.max_depth
        );

        if self.config.crawler.respect_robots {
            self.robots_allows(&seed).await;
        }

        let mut seed_entry = FrontierEntry::new(seed, 0);
        seed_entry.document = self.classifier.classify(seed_entry.url.as_str());
        if seed_entry.document.is_some() {
            self.session.frontier.push_priority(seed_entry);
        } else {
            self.session.frontier.push_normal(seed_entry);
        }

        let mut last_progress = 0;
        while !self.session.frontier.is_empty() && self.session.frontier.visited() < max_pages {
            let Some(entry) = self.session.frontier.pop() else {
                break;
            };

            let fetched = self.process_entry(entry).await?;
            let visited = self.session.frontier.visited();

            if fetched {
                self.session.throttle.wait(visited).await;
            }

            if visited >= last_progress + PROGRESS_EVERY {
                last_progress = visited;
                tracing::info!(
                    "Progress: {} visited, {} queued ({} priority), {} records",
                    visited,
                    self.session.frontier.len(),
                    self.session.frontier.priority_len(),
                    self.session.stats.records()
                );
            }
        }

        if let Err(e) = self.sink.finish() {
            tracing::warn!("Failed to flush records: {}", e);
        }

        let stats = &mut self.session.stats;
        stats.finish();
        tracing::info!(
            "Crawl completed: {} URLs visited, {} records ({} documents) in {}s",
            self.session.frontier.visited(),
            stats.records(),
            stats.documents,
            stats.duration_seconds().unwrap_or(0)
        );

        Ok(stats.clone())
    }

    /// Processes one dequeued entry
    ///
    /// # Returns
    ///
    /// `true` if a fetch was made, so the throttle applies
    async fn process_entry(&mut self, entry: FrontierEntry) -> Result<bool> {
        let url = entry.url.clone();

        if entry.depth > self.config.crawler.max_depth {
            self.session.stats.depth_discards += 1;
            if self.config.crawler.mark_depth_exceeded {
                self.finish_url(&url, PageState::DepthExceeded)?;
            } else {
                self.session.frontier.forget(&url);
            }
            tracing::trace!("Depth {} exceeds limit: {}", entry.depth, url);
            return Ok(false);
        }

        if self.config.crawler.respect_robots && !self.robots_allows(&url).await {
            tracing::info!("URL {} disallowed by robots.txt", url);
            self.finish_url(&url, PageState::SkippedRobots)?;
            return Ok(false);
        }

        self.session.frontier.transition(&url, PageState::Fetching)?;

        let mode = if entry.document.is_some() {
            FetchMode::Head
        } else {
            FetchMode::Get
        };
        tracing::debug!("Fetching {} ({:?}, depth {})", url, mode, entry.depth);

        let outcome = self.fetcher.fetch(&url, mode).await;
        self.session.stats.fetch_attempts += u64::from(outcome.attempts());

        match outcome {
            FetchOutcome::Failure(failure) => {
                tracing::debug!(
                    "Failed {} after {} attempts: {}",
                    url,
                    failure.attempts,
                    failure.last_error
                );
                self.finish_url(&url, PageState::Failed)?;
            }
            FetchOutcome::Success(response) => {
                if mode == FetchMode::Head || response.document.is_some() {
                    self.record_document(&entry, &response);
                    self.finish_url(&url, PageState::RecordedDocument)?;
                } else {
                    self.record_webpage(&entry, &response);
                    self.finish_url(&url, PageState::RecordedWebpage)?;
                }
            }
        }

        Ok(true)
    }

    /// Checks robots.txt for the URL's host, loading it on first encounter
    async fn robots_allows(&mut self, url: &Url) -> bool {
        let policy = self.session.robots.policy_for(url, &self.fetcher).await;
        if let Some(delay) = policy.crawl_delay(&self.agent) {
            self.session.throttle.raise_delay(delay);
        }
        robots::is_allowed(&policy, url, &self.agent)
    }

    fn finish_url(&mut self, url: &Url, state: PageState) -> Result<()> {
        self.session.frontier.transition(url, state)?;
        self.session.stats.record_state(state);
        Ok(())
    }

    /// Document path: resolve a name and emit a metadata-only record
    fn record_document(&mut self, entry: &FrontierEntry, response: &FetchedResponse) {
        let hints = AttachmentHints {
            anchor_text: entry.anchor_text.clone(),
            context: entry.context.clone(),
            content_disposition: response.content_disposition.clone(),
            content_type: response.content_type.clone(),
            document: response.document.clone().or_else(|| entry.document.clone()),
            today: Utc::now().date_naive(),
        };
        let resolved = self.resolver.resolve_attachment(&entry.url, &hints);

        let record = CrawlRecord {
            url: entry.url.to_string(),
            title: resolved.title,
            content: CrawlRecord::document_content(&resolved.file_type, entry.url.as_str()),
            is_document: true,
            file_type: resolved.file_type,
            mime_type: resolved.mime_type,
            filename: Some(resolved.filename),
            snapshot_id: None,
            crawled_at: Utc::now(),
            is_attachment: entry.attachment,
            depth: entry.depth,
            anchor_texts: Vec::new(),
        };

        tracing::info!("Document: {} -> {}", record.url, record.title);
        self.session.stats.documents += 1;
        if entry.attachment {
            self.session.stats.attachments += 1;
        }
        self.emit(&record);
    }

    /// Webpage path: extract, snapshot, emit, then enqueue what was found
    fn record_webpage(&mut self, entry: &FrontierEntry, response: &FetchedResponse) {
        let body = response.body.as_deref().unwrap_or_default();
        let page = self.extractor.extract(body, &response.final_url);

        let snapshot_id = match self.snapshots.save(entry.url.as_str(), &response.raw) {
            Ok(id) => {
                self.session.stats.snapshots_saved += 1;
                Some(id)
            }
            Err(e) => {
                tracing::warn!("Failed to save snapshot of {}: {}", entry.url, e);
                self.session.stats.snapshot_failures += 1;
                None
            }
        };

        let record = CrawlRecord {
            url: entry.url.to_string(),
            title: page.title,
            content: page.body_text,
            is_document: false,
            file_type: WEBPAGE_FILE_TYPE.to_string(),
            mime_type: WEBPAGE_MIME_TYPE.to_string(),
            filename: None,
            snapshot_id,
            crawled_at: Utc::now(),
            is_attachment: false,
            depth: entry.depth,
            anchor_texts: page.anchor_texts,
        };

        tracing::debug!("Webpage: {} -> {}", record.url, record.title);
        self.session.stats.webpages += 1;
        if entry.shallow {
            self.session.stats.attachment_pages_scanned += 1;
        }
        self.emit(&record);

        // Attachment links are leaves at their parent's depth, even when they
        // turn out to be pages
        if entry.attachment {
            tracing::debug!("Attachment link {} is a webpage, links not followed", entry.url);
            return;
        }

        let frontier = &mut self.session.frontier;
        let mut promoted = 0;
        for link in page.attachment_links {
            let mut next = FrontierEntry::new(link.url, entry.depth);
            next.attachment = true;
            next.anchor_text = link.anchor_text;
            next.context = link.context;
            next.document = link.document;
            if frontier.push_priority(next) {
                promoted += 1;
            }
        }

        if entry.shallow {
            tracing::debug!(
                "Shallow scan of {} promoted {} attachments",
                entry.url,
                promoted
            );
            return;
        }

        let next_depth = entry.depth + 1;
        for url in page.possible_attachment_pages {
            let mut next = FrontierEntry::new(url, next_depth);
            if self.session.attachment_pages_left > 0 {
                next.shallow = true;
                if frontier.push_normal(next) {
                    self.session.attachment_pages_left -= 1;
                }
            } else {
                frontier.push_normal(next);
            }
        }

        for link in page.links {
            let mut next = FrontierEntry::new(link.url, next_depth);
            next.anchor_text = link.anchor_text;
            frontier.push_normal(next);
        }
    }

    fn emit(&mut self, record: &CrawlRecord) {
        if let Err(e) = self.sink.emit(record) {
            tracing::warn!("Failed to emit record for {}: {}", record.url, e);
            self.session.stats.sink_failures += 1;
        }
    }
}
