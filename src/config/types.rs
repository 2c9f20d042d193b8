use serde::{Deserialize, Serialize};

/// Main configuration structure for Campus-Harvest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub scope: ScopeConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl bounds and politeness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Seed used when the start URL is unusable or out of scope
    #[serde(rename = "default-seed", default)]
    pub default_seed: Option<String>,

    /// Maximum number of visited URLs per run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Seconds to wait after each fetch
    #[serde(default = "default_delay")]
    pub delay: f64,

    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Visited URLs between long pauses (0 disables them)
    #[serde(rename = "long-pause-every", default = "default_long_pause_every")]
    pub long_pause_every: usize,

    /// Long pause length as a multiple of `delay`
    #[serde(rename = "long-pause-factor", default = "default_long_pause_factor")]
    pub long_pause_factor: f64,

    /// How many possible attachment pages get a shallow scan
    #[serde(
        rename = "attachment-page-budget",
        default = "default_attachment_page_budget"
    )]
    pub attachment_page_budget: usize,

    /// Charge URLs dequeued beyond `max-depth` against the visited set
    #[serde(rename = "mark-depth-exceeded", default)]
    pub mark_depth_exceeded: bool,
}

impl CrawlerConfig {
    /// Crawler settings with every bound at its default
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            default_seed: None,
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            delay: default_delay(),
            respect_robots: true,
            long_pause_every: default_long_pause_every(),
            long_pause_factor: default_long_pause_factor(),
            attachment_page_budget: default_attachment_page_budget(),
            mark_depth_exceeded: false,
        }
    }
}

/// HTTP retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Attempts against the primary URL before the HTTPS fallback
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Backoff before retry `n` is `backoff-base-ms * 2^n`
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Try the `http://` form of `https://` URLs first
    #[serde(rename = "prefer-http", default = "default_true")]
    pub prefer_http: bool,

    #[serde(rename = "accept-invalid-certs", default = "default_true")]
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            backoff_base_ms: default_backoff_base_ms(),
            prefer_http: true,
            accept_invalid_certs: true,
        }
    }
}

/// Host scope of the crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Host suffixes the crawl may touch (e.g., "nankai.edu.cn")
    #[serde(rename = "allowed-suffixes")]
    pub allowed_suffixes: Vec<String>,

    /// Hosts excluded even though they match a suffix ("*.lib.example.edu.cn")
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Content extraction heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Site names trimmed from the end of `<title>`
    #[serde(rename = "title-suffixes", default)]
    pub title_suffixes: Vec<String>,

    /// Regexes for URLs that serve attachments on the target sites
    #[serde(
        rename = "attachment-path-patterns",
        default = "default_attachment_path_patterns"
    )]
    pub attachment_path_patterns: Vec<String>,

    /// Regexes for article pages that usually carry attachments
    #[serde(
        rename = "attachment-page-patterns",
        default = "default_attachment_page_patterns"
    )]
    pub attachment_page_patterns: Vec<String>,

    /// Also treat archives and media files as documents
    #[serde(rename = "optional-document-types", default)]
    pub optional_document_types: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title_suffixes: Vec::new(),
            attachment_path_patterns: default_attachment_path_patterns(),
            attachment_page_patterns: default_attachment_page_patterns(),
            optional_document_types: false,
        }
    }
}

/// Attachment naming settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Extra opaque-path tokens with known titles
    #[serde(default)]
    pub known: Vec<KnownAttachmentEntry>,
}

/// A hashed path token that maps to a known attachment title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownAttachmentEntry {
    /// Path segment (or fragment of one) identifying the attachment
    pub token: String,

    /// Extension the title applies to; empty matches any
    #[serde(default)]
    pub extension: String,

    pub title: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "NKUSearchBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "http://www.nankai.edu.cn/search_info".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Builds the User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for the filesystem snapshot store
    #[serde(rename = "snapshot-dir", default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// JSON-lines record file; records go to stdout when unset
    #[serde(rename = "records-path", default)]
    pub records_path: Option<String>,

    /// SQLite database holding both snapshots and records; overrides the other two
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            records_path: None,
            database_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> usize {
    100
}

fn default_max_depth() -> u32 {
    3
}

fn default_delay() -> f64 {
    1.0
}

fn default_long_pause_every() -> usize {
    100
}

fn default_long_pause_factor() -> f64 {
    5.0
}

fn default_attachment_page_budget() -> usize {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_snapshot_dir() -> String {
    "./snapshots".to_string()
}

fn default_attachment_path_patterns() -> Vec<String> {
    vec![
        r"/_upload/".to_string(),
        r"/(?:upload|uploads|uploadfile|attach|attachment|attachments)/".to_string(),
        r"(?i)/download(?:file)?(?:\.\w+)?(?:/|\?|$)".to_string(),
    ]
}

fn default_attachment_page_patterns() -> Vec<String> {
    vec![
        r"/\d{4}/\d{4}/c\d+a\d+/page\.htm$".to_string(),
        r"/info/\d+/\d+\.htm$".to_string(),
        r"/content\.jsp$".to_string(),
    ]
}
