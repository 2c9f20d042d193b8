//! Attachment Resolver
//!
//! Turns a document URL plus whatever the crawl saw around it (anchor text,
//! surrounding context, response headers) into a readable title and filename.
//! Resolution runs an ordered list of [`NamingStrategy`] layers and keeps the
//! first answer:
//!
//! 1. `Content-Disposition` filename
//! 2. known opaque-path table
//! 3. anchor text or context
//! 4. last path segment, unless it looks like a hash
//! 5. synthesized `{site}_{purpose}_{date}`

pub mod naming;
pub mod strategies;

use chrono::{NaiveDate, Utc};
use url::Url;

use crate::config::KnownAttachmentEntry;
use crate::resource::{
    self, document_type_for_extension, extension_for_mime, file_type_for_mime, DocumentInfo,
    UNKNOWN_FILE_TYPE,
};

pub use naming::{is_hash_like, sanitize_filename};
pub use strategies::{default_strategies, NamingStrategy};

/// Everything known about an attachment besides its URL
#[derive(Debug, Clone)]
pub struct AttachmentHints {
    pub anchor_text: Option<String>,
    pub context: Option<String>,
    pub content_disposition: Option<String>,
    pub content_type: Option<String>,
    /// Classification of the URL or response, if any
    pub document: Option<DocumentInfo>,
    /// Date used by synthesized names when the URL carries none
    pub today: NaiveDate,
}

impl Default for AttachmentHints {
    fn default() -> Self {
        Self {
            anchor_text: None,
            context: None,
            content_disposition: None,
            content_type: None,
            document: None,
            today: Utc::now().date_naive(),
        }
    }
}

/// A resolved attachment name plus its type labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    /// Title without extension
    pub title: String,
    /// Title plus extension, safe for a filesystem
    pub filename: String,
    pub file_type: String,
    pub mime_type: String,
    /// Which strategy produced the title
    pub strategy: &'static str,
}

/// Runs the naming strategies in order
pub struct Resolver {
    strategies: Vec<Box<dyn NamingStrategy>>,
}

impl Resolver {
    /// Creates a resolver with the default strategy order
    ///
    /// # Arguments
    /// * `known` - Extra entries for the opaque-path table
    pub fn new(known: &[KnownAttachmentEntry]) -> Self {
        Self::with_strategies(default_strategies(known))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn NamingStrategy>>) -> Self {
        Self { strategies }
    }

    /// Resolves a title, filename and type labels for an attachment URL
    ///
    /// Never fails: when every strategy declines, the synthesized name is used.
    pub fn resolve_attachment(&self, url: &Url, hints: &AttachmentHints) -> ResolvedAttachment {
        let (raw, strategy) = self
            .strategies
            .iter()
            .find_map(|s| s.resolve(url, hints).map(|name| (name, s.name())))
            .unwrap_or_else(|| (strategies::synthesized_name(url, hints), "synthesized"));

        tracing::debug!("Attachment {} named by {}: {}", url, strategy, raw);

        let (stem, own_extension) = naming::split_known_extension(&raw);
        let mut title = sanitize_filename(stem);
        if title.is_empty() {
            title = sanitize_filename(&strategies::synthesized_name(url, hints));
        }

        let extension = own_extension
            .map(str::to_string)
            .or_else(|| {
                hints
                    .document
                    .as_ref()
                    .map(|d| d.bare_extension().to_string())
                    .filter(|e| !e.is_empty())
            })
            .or_else(|| {
                hints
                    .content_type
                    .as_deref()
                    .and_then(extension_for_mime)
                    .map(str::to_string)
            })
            .or_else(|| resource::classify(url.as_str()).map(|d| d.bare_extension().to_string()));

        let (file_type, mime_type) = type_labels(extension.as_deref(), hints);

        let filename = match &extension {
            Some(ext) => format!("{}.{}", title, ext),
            None => title.clone(),
        };

        ResolvedAttachment {
            title,
            filename,
            file_type,
            mime_type,
            strategy,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// File-type label and MIME type for the chosen extension
fn type_labels(extension: Option<&str>, hints: &AttachmentHints) -> (String, String) {
    if let Some(doc_type) = extension.and_then(document_type_for_extension) {
        return (doc_type.file_type.to_string(), doc_type.mime_type.to_string());
    }
    if let Some(doc) = &hints.document {
        return (doc.file_type.clone(), doc.mime_type.clone());
    }
    match hints.content_type.as_deref() {
        Some(content_type) => {
            let mime = content_type
                .split(';')
                .next()
                .unwrap_or(content_type)
                .trim()
                .to_lowercase();
            (file_type_for_mime(content_type).to_string(), mime)
        }
        None => (
            UNKNOWN_FILE_TYPE.to_string(),
            "application/octet-stream".to_string(),
        ),
    }
}
