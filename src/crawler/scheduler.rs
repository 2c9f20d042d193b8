//! Frontier and throttle for the crawl loop
//!
//! This module handles:
//! - The two frontier queues (priority for documents, normal for webpages)
//! - The per-URL state ledger that doubles as the visited set
//! - The per-request delay and the periodic long pause

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use url::Url;

use crate::resource::DocumentInfo;
use crate::state::{PageState, QueueKind};
use crate::{HarvestError, Result};

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,

    pub depth: u32,

    /// Possible attachment page: record it and promote its attachments, but
    /// do not follow its plain links
    pub shallow: bool,

    /// Discovered as an attachment link of another page
    pub attachment: bool,

    /// Anchor text of the link that led here
    pub anchor_text: Option<String>,

    /// Surrounding text of that link
    pub context: Option<String>,

    /// URL classification made at discovery time
    pub document: Option<DocumentInfo>,
}

impl FrontierEntry {
    pub fn new(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            shallow: false,
            attachment: false,
            anchor_text: None,
            context: None,
            document: None,
        }
    }

    pub fn key(&self) -> String {
        self.url.to_string()
    }
}

/// Dual-queue frontier with a state per known URL
///
/// A URL is known from its first enqueue until the end of the run, so it is
/// never enqueued twice. Terminal states count as visited.
#[derive(Debug, Default)]
pub struct Frontier {
    priority: VecDeque<FrontierEntry>,
    normal: VecDeque<FrontierEntry>,
    states: HashMap<String, PageState>,
    visited: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry to a queue
    ///
    /// # Returns
    ///
    /// * `true` - if the entry was queued
    /// * `false` - if the URL is already queued, in flight or visited
    pub fn push(&mut self, entry: FrontierEntry, kind: QueueKind) -> bool {
        let key = entry.key();
        if self.states.contains_key(&key) {
            tracing::trace!("Already known: {}", key);
            return false;
        }

        tracing::trace!(
            "Queued {} at depth {} ({})",
            key,
            entry.depth,
            kind.as_str()
        );
        self.states.insert(key, PageState::Queued(kind));
        match kind {
            QueueKind::Priority => self.priority.push_back(entry),
            QueueKind::Normal => self.normal.push_back(entry),
        }
        true
    }

    pub fn push_normal(&mut self, entry: FrontierEntry) -> bool {
        self.push(entry, QueueKind::Normal)
    }

    pub fn push_priority(&mut self, entry: FrontierEntry) -> bool {
        self.push(entry, QueueKind::Priority)
    }

    /// Takes the next entry, draining the priority queue first
    ///
    /// Entries whose URL is no longer queued (already visited) are skipped.
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        loop {
            let entry = self
                .priority
                .pop_front()
                .or_else(|| self.normal.pop_front())?;

            match self.states.get(&entry.key()) {
                Some(PageState::Queued(_)) => return Some(entry),
                _ => {
                    tracing::trace!("Discarding stale entry {}", entry.url);
                    continue;
                }
            }
        }
    }

    /// Moves a URL to a new state, checking the state machine
    ///
    /// # Errors
    ///
    /// `HarvestError::InvalidTransition` when the URL is unknown or the move
    /// is not allowed from its current state.
    pub fn transition(&mut self, url: &Url, next: PageState) -> Result<()> {
        let key = url.to_string();
        let current = self.states.get(&key).copied();

        match current {
            Some(state) if state.can_transition_to(next) => {
                self.states.insert(key, next);
                if next.is_terminal() {
                    self.visited += 1;
                }
                Ok(())
            }
            _ => Err(HarvestError::InvalidTransition {
                url: key,
                from: current,
                to: next,
            }),
        }
    }

    /// Drops a dequeued URL without charging it, so a later path may queue it again
    pub fn forget(&mut self, url: &Url) {
        let key = url.to_string();
        if matches!(self.states.get(&key), Some(PageState::Queued(_))) {
            self.states.remove(&key);
        }
    }

    pub fn state_of(&self, url: &Url) -> Option<PageState> {
        self.states.get(url.as_str()).copied()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.state_of(url).is_some_and(|s| s.is_terminal())
    }

    /// URLs in a terminal state
    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn priority_len(&self) -> usize {
        self.priority.len()
    }

    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    pub fn len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.normal.is_empty()
    }
}

/// Delay-based politeness for the single crawl loop
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    long_pause_every: usize,
    long_pause_factor: f64,
}

impl Throttle {
    /// # Arguments
    ///
    /// * `delay_secs` - Pause after each fetch
    /// * `long_pause_every` - Visited URLs between long pauses; 0 disables them
    /// * `long_pause_factor` - Long pause length as a multiple of the delay
    pub fn new(delay_secs: f64, long_pause_every: usize, long_pause_factor: f64) -> Self {
        Self {
            delay: secs(delay_secs),
            long_pause_every,
            long_pause_factor,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Raises the delay to a robots.txt `Crawl-delay`; never lowers it
    pub fn raise_delay(&mut self, delay_secs: f64) {
        let requested = secs(delay_secs);
        if requested > self.delay {
            tracing::info!(
                "Raising delay from {:?} to {:?} per robots.txt",
                self.delay,
                requested
            );
            self.delay = requested;
        }
    }

    /// Extra pause owed after `visited` URLs, if this is a long-pause boundary
    pub fn long_pause(&self, visited: usize) -> Option<Duration> {
        if self.long_pause_every == 0 || visited == 0 || visited % self.long_pause_every != 0 {
            return None;
        }
        Some(self.delay.mul_f64(self.long_pause_factor.max(0.0)))
    }

    /// Sleeps after a fetch
    pub async fn wait(&self, visited: usize) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(pause) = self.long_pause(visited) {
            if !pause.is_zero() {
                tracing::info!("Visited {} URLs, taking a break for {:?}", visited, pause);
                tokio::time::sleep(pause).await;
            }
        }
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
