use percent_encoding::percent_decode_str;
use url::Url;

use super::types::{document_type_for_extension, document_type_for_mime, DocumentType, DOCUMENT_TYPES};
use super::DocumentInfo;

/// Query parameters that commonly carry the real filename
const FILE_QUERY_PARAMS: &[&str] = &["file", "format", "type", "filename"];

/// Words that make a URL look like a download endpoint
const DOWNLOAD_KEYWORDS: &[&str] = &["download", "attachment", "附件", "文件"];

/// URL-shape document classifier
///
/// Pure function of its input: the same URL always yields the same answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    include_optional: bool,
}

impl Classifier {
    /// Creates a classifier; `include_optional` enables archive and media types
    pub fn new(include_optional: bool) -> Self {
        Self { include_optional }
    }

    fn types(&self) -> impl Iterator<Item = &'static DocumentType> + '_ {
        DOCUMENT_TYPES
            .iter()
            .filter(move |t| self.include_optional || !t.optional)
    }

    fn lookup(&self, extension: &str) -> Option<&'static DocumentType> {
        document_type_for_extension(extension).filter(|t| self.include_optional || !t.optional)
    }

    /// Classifies a URL string
    ///
    /// Rules are tried in order and the first match wins:
    /// 1. the path ends with a known extension
    /// 2. some path segment is a filename with a known extension
    /// 3. a `file`/`format`/`type`/`filename` query parameter names one
    /// 4. a download keyword and an extension substring both occur in the URL
    ///
    /// Returns None when the URL looks like an ordinary webpage.
    pub fn classify(&self, url: &str) -> Option<DocumentInfo> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (path, pairs) = match Url::parse(trimmed) {
            Ok(parsed) => (
                decode(parsed.path()),
                parsed
                    .query_pairs()
                    .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                    .collect::<Vec<_>>(),
            ),
            // Relative or broken URLs are still worth a look
            Err(_) => {
                let without_fragment = trimmed.split('#').next().unwrap_or("");
                let mut parts = without_fragment.splitn(2, '?');
                let path = decode(parts.next().unwrap_or(""));
                let pairs = parts
                    .next()
                    .map(|q| {
                        url::form_urlencoded::parse(q.as_bytes())
                            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                            .collect()
                    })
                    .unwrap_or_default();
                (path, pairs)
            }
        };

        self.by_path_suffix(&path)
            .or_else(|| self.by_path_segment(&path))
            .or_else(|| self.by_query(&pairs))
            .or_else(|| self.by_keyword(&decode(trimmed)))
            .map(DocumentInfo::from_type)
    }

    /// Classifies a response from its headers
    ///
    /// A known document MIME type wins; otherwise a `Content-Disposition` of
    /// `attachment` (or one naming a document filename) marks a document whose
    /// type comes from that filename, or from the MIME type as an unknown
    /// document.
    pub fn classify_response(
        &self,
        content_type: Option<&str>,
        content_disposition: Option<&str>,
    ) -> Option<DocumentInfo> {
        if let Some(doc_type) = content_type.and_then(document_type_for_mime) {
            if self.include_optional || !doc_type.optional {
                return Some(DocumentInfo::from_type(doc_type));
            }
        }

        let disposition = content_disposition?.trim();
        let lower = disposition.to_lowercase();
        let from_filename = lower
            .split(';')
            .filter_map(|part| part.split_once('='))
            .filter(|(key, _)| key.trim().starts_with("filename"))
            .find_map(|(_, value)| {
                let value = value.trim().trim_matches('"');
                let value = value.rsplit("''").next().unwrap_or(value);
                let decoded = decode(value);
                decoded
                    .rsplit_once('.')
                    .and_then(|(_, ext)| self.lookup(ext))
            });

        if let Some(doc_type) = from_filename {
            return Some(DocumentInfo::from_type(doc_type));
        }

        if lower.starts_with("attachment") {
            let mime = content_type
                .and_then(|ct| ct.split(';').next())
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            return Some(DocumentInfo {
                is_document: true,
                file_type: super::types::UNKNOWN_FILE_TYPE.to_string(),
                mime_type: mime,
                extension: String::new(),
            });
        }

        None
    }

    fn by_path_suffix(&self, path: &str) -> Option<&'static DocumentType> {
        let last = path.rsplit('/').next()?;
        extension_of(last).and_then(|ext| self.lookup(ext))
    }

    fn by_path_segment(&self, path: &str) -> Option<&'static DocumentType> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .find_map(|segment| extension_of(segment).and_then(|ext| self.lookup(ext)))
    }

    fn by_query(&self, pairs: &[(String, String)]) -> Option<&'static DocumentType> {
        pairs
            .iter()
            .filter(|(key, _)| FILE_QUERY_PARAMS.contains(&key.as_str()))
            .find_map(|(_, value)| {
                let value = value.trim();
                extension_of(value)
                    .and_then(|ext| self.lookup(ext))
                    .or_else(|| self.lookup(value))
            })
    }

    fn by_keyword(&self, full_url: &str) -> Option<&'static DocumentType> {
        if !DOWNLOAD_KEYWORDS.iter().any(|k| full_url.contains(k)) {
            return None;
        }

        self.types()
            .find(|t| full_url.contains(&format!(".{}", t.extension)))
    }
}

/// Classifies a URL with the core extension table
pub fn classify(url: &str) -> Option<DocumentInfo> {
    Classifier::default().classify(url)
}

/// Classifies a response from its `Content-Type` and `Content-Disposition`
pub fn classify_response(
    content_type: Option<&str>,
    content_disposition: Option<&str>,
) -> Option<DocumentInfo> {
    Classifier::default().classify_response(content_type, content_disposition)
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().to_lowercase()
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}
