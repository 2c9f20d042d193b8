//! Resource classification
//!
//! Decides whether a URL (or a response) is a downloadable document or an
//! HTML page. The same extension table feeds the human-readable file-type
//! labels used by the attachment resolver.

mod classifier;
mod types;

pub use classifier::{classify, classify_response, Classifier};
pub use types::{
    document_type_for_extension, document_type_for_mime, extension_for_mime, file_type_for_mime,
    DocumentType, DOCUMENT_TYPES, UNKNOWN_FILE_TYPE,
};

use serde::{Deserialize, Serialize};

/// Classification result for a document-like resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Always true; kept so records can be built from this value directly
    pub is_document: bool,
    /// Human-readable label such as `PDF文档`
    pub file_type: String,
    /// MIME type from the extension table
    pub mime_type: String,
    /// Extension including the leading dot, e.g. `.pdf`
    pub extension: String,
}

impl DocumentInfo {
    pub fn from_type(doc_type: &DocumentType) -> Self {
        Self {
            is_document: true,
            file_type: doc_type.file_type.to_string(),
            mime_type: doc_type.mime_type.to_string(),
            extension: format!(".{}", doc_type.extension),
        }
    }

    /// The extension without its leading dot
    pub fn bare_extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

/// What a fetched or discovered resource turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedResource {
    Webpage,
    Document(DocumentInfo),
}

impl ClassifiedResource {
    /// Classifies a URL with the default table
    pub fn of(url: &str) -> Self {
        match classify(url) {
            Some(info) => Self::Document(info),
            None => Self::Webpage,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}
