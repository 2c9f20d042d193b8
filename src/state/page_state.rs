use std::fmt;

/// Which frontier queue an entry waits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Webpages discovered through plain links
    Normal,
    /// Likely documents, drained before the normal queue
    Priority,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Priority => "priority",
        }
    }
}

/// Represents the current state of a URL in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Waiting in one of the frontier queues
    Queued(QueueKind),

    /// Being fetched right now
    Fetching,

    // ===== Terminal States =====
    /// Fetched and emitted as a document record
    RecordedDocument,

    /// Fetched, extracted and emitted as a webpage record
    RecordedWebpage,

    /// All fetch attempts and fallbacks failed
    Failed,

    /// Disallowed by robots.txt, never fetched
    SkippedRobots,

    /// Dequeued beyond the depth limit; only reached when the run charges
    /// depth discards against the visited set
    DepthExceeded,
}

impl PageState {
    /// Returns true if this is a terminal state (the URL counts as visited)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the URL may still be processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued(_) | Self::Fetching)
    }

    /// Returns true if a record was emitted for the URL
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::RecordedDocument | Self::RecordedWebpage)
    }

    /// Checks a move against the state machine
    ///
    /// # Arguments
    ///
    /// * `next` - The state the frontier wants to enter
    ///
    /// # Returns
    ///
    /// * `true` - if the move is allowed from the current state
    pub fn can_transition_to(&self, next: PageState) -> bool {
        match (self, next) {
            (Self::Queued(_), Self::Fetching)
            | (Self::Queued(_), Self::SkippedRobots)
            | (Self::Queued(_), Self::DepthExceeded) => true,
            (Self::Fetching, Self::RecordedDocument)
            | (Self::Fetching, Self::RecordedWebpage)
            | (Self::Fetching, Self::Failed) => true,
            _ => false,
        }
    }

    /// Stable lowercase name used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued(QueueKind::Normal) => "queued",
            Self::Queued(QueueKind::Priority) => "queued_priority",
            Self::Fetching => "fetching",
            Self::RecordedDocument => "recorded_document",
            Self::RecordedWebpage => "recorded_webpage",
            Self::Failed => "failed",
            Self::SkippedRobots => "skipped_robots",
            Self::DepthExceeded => "depth_exceeded",
        }
    }

    /// Returns all terminal states
    pub fn terminal_states() -> Vec<Self> {
        vec![
            Self::RecordedDocument,
            Self::RecordedWebpage,
            Self::Failed,
            Self::SkippedRobots,
            Self::DepthExceeded,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
