use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `file_type` carried by webpage records
pub const WEBPAGE_FILE_TYPE: &str = "webpage";

/// `mime_type` carried by webpage records
pub const WEBPAGE_MIME_TYPE: &str = "text/html";

/// An outgoing link and the text it was shown with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorText {
    pub text: String,
    pub href: String,
}

/// One crawled resource, as handed to the indexing layer
///
/// Records are immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRecord {
    /// Normalized URL
    pub url: String,

    pub title: String,

    /// Plain body text for webpages, `[file_type] url` for documents
    pub content: String,

    pub is_document: bool,

    /// Human label for documents (`PDF文档`...), `webpage` otherwise
    pub file_type: String,

    pub mime_type: String,

    /// Resolved attachment filename, documents only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Id of the raw HTML snapshot, webpages only and only if the write succeeded
    pub snapshot_id: Option<String>,

    pub crawled_at: DateTime<Utc>,

    /// True for documents reached through a link on a crawled page
    pub is_attachment: bool,

    /// Link depth the resource was reached at
    pub depth: u32,

    /// Outgoing links of a webpage with their anchor text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchor_texts: Vec<AnchorText>,
}

impl CrawlRecord {
    /// Placeholder body used for document records
    pub fn document_content(file_type: &str, url: &str) -> String {
        format!("[{}] {}", file_type, url)
    }
}
