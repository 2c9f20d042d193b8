//! Content extraction
//!
//! Turns a fetched HTML page into a title, cleaned body text and three link
//! sets:
//! - plain links, followed at `depth + 1`
//! - attachment candidates, promoted to the priority queue
//! - possible attachment pages, scanned shallowly
//!
//! Parsing never fails: malformed markup degrades to whatever the HTML5
//! parser recovers, and an empty page yields the placeholder title with no
//! links.

mod heuristics;
mod links;
mod text;

pub use heuristics::{clean_json_href, sudyfile_title};
pub use links::{collect_candidates, document_base, resolve_link, LinkCandidate};
pub use text::{collapse_whitespace, extract_body_text, extract_title, trim_site_suffix, UNTITLED};

use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::config::ExtractConfig;
use crate::output::AnchorText;
use crate::resource::{Classifier, DocumentInfo};
use crate::url::{normalize, Scope};
use crate::{ConfigError, ConfigResult};

/// Most anchor texts kept per page
const MAX_ANCHOR_TEXTS: usize = 200;

/// Why a link was taken for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSignal {
    /// The URL itself classifies as a document
    UrlShape,
    /// Anchor text, title or `download` attribute announce a file
    AnchorKeyword,
    /// A file-type icon sits in or next to the anchor
    IconHint,
    /// The anchor is listed in an attachment table
    TableContext,
    /// The URL matches a known attachment path of the target sites
    SitePattern,
    /// Source of an embedded PDF player or document viewer
    EmbeddedViewer,
}

/// A plain outgoing link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Normalized, in-scope URL
    pub url: Url,
    pub anchor_text: Option<String>,
}

/// A link believed to lead to a downloadable file
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentLink {
    /// Normalized, in-scope URL
    pub url: Url,
    pub anchor_text: Option<String>,
    /// Text of the surrounding list item, paragraph or cell
    pub context: Option<String>,
    /// Set when the URL (query included) classifies as a document
    pub document: Option<DocumentInfo>,
    pub signal: AttachmentSignal,
}

/// Everything pulled out of one page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub title: String,
    pub body_text: String,
    pub links: Vec<DiscoveredLink>,
    pub attachment_links: Vec<AttachmentLink>,
    pub possible_attachment_pages: Vec<Url>,
    /// Anchors of the page, in scope or not
    pub anchor_texts: Vec<AnchorText>,
}

/// Page extractor configured for one crawl run
#[derive(Debug, Clone)]
pub struct Extractor {
    scope: Scope,
    classifier: Classifier,
    title_suffixes: Vec<String>,
    attachment_paths: Vec<Regex>,
    attachment_pages: Vec<Regex>,
}

impl Extractor {
    pub fn new(config: &ExtractConfig, scope: Scope, classifier: Classifier) -> ConfigResult<Self> {
        Ok(Self {
            scope,
            classifier,
            title_suffixes: config.title_suffixes.clone(),
            attachment_paths: compile(&config.attachment_path_patterns)?,
            attachment_pages: compile(&config.attachment_page_patterns)?,
        })
    }

    /// Returns true if the URL looks like an article page that carries attachments
    pub fn is_possible_attachment_page(&self, url: &Url) -> bool {
        self.attachment_pages.iter().any(|re| re.is_match(url.as_str()))
    }

    fn is_attachment_path(&self, url: &Url) -> bool {
        self.attachment_paths.iter().any(|re| re.is_match(url.as_str()))
    }

    /// Extracts title, text and links from a page
    ///
    /// # Arguments
    ///
    /// * `html` - The decoded page
    /// * `page_url` - URL the page was fetched from, used as the link base
    ///   unless the page declares `<base href>`
    pub fn extract(&self, html: &str, page_url: &Url) -> ExtractedPage {
        let document = Html::parse_document(html);
        let base = document_base(&document, page_url);

        let title = extract_title(&document, &self.title_suffixes);
        let body_text = extract_body_text(&document);
        let anchor_texts = collect_anchor_texts(&document, &base);
        let candidates = collect_candidates(&document, &base);

        let mut page = ExtractedPage {
            title,
            body_text,
            anchor_texts,
            ..ExtractedPage::default()
        };
        self.sort_candidates(candidates, &mut page);
        page
    }

    /// Splits candidates into the three link sets
    ///
    /// Attachment evidence anywhere on the page wins over a plain listing
    /// of the same URL.
    fn sort_candidates(&self, candidates: Vec<LinkCandidate>, page: &mut ExtractedPage) {
        let mut classified = Vec::with_capacity(candidates.len());
        let mut attachment_urls = HashSet::new();

        for candidate in candidates {
            let Ok(normalized) = normalize(&candidate.url) else {
                continue;
            };
            if !self.scope.contains(&normalized) {
                tracing::trace!("Out of scope: {}", normalized);
                continue;
            }

            let document = self.classifier.classify(candidate.url.as_str());
            let signal = if document.is_some() {
                Some(AttachmentSignal::UrlShape)
            } else if candidate.markup_signal.is_some() {
                candidate.markup_signal
            } else if self.is_attachment_path(&candidate.url) {
                Some(AttachmentSignal::SitePattern)
            } else {
                None
            };

            if signal.is_some() {
                attachment_urls.insert(normalized.to_string());
            }
            classified.push((normalized, candidate, document, signal));
        }

        let mut seen = HashSet::new();
        for (url, candidate, document, signal) in classified {
            let key = url.to_string();

            if let Some(signal) = signal {
                if seen.insert(key.clone()) {
                    page.attachment_links.push(AttachmentLink {
                        url,
                        anchor_text: candidate.anchor_text,
                        context: candidate.context,
                        document,
                        signal,
                    });
                } else if let Some(existing) =
                    page.attachment_links.iter_mut().find(|a| a.url.as_str() == key)
                {
                    if existing.anchor_text.is_none() {
                        existing.anchor_text = candidate.anchor_text;
                    }
                    if existing.document.is_none() {
                        existing.document = document;
                    }
                }
                continue;
            }

            if attachment_urls.contains(&key) || !seen.insert(key) {
                continue;
            }

            if self.is_possible_attachment_page(&url) {
                page.possible_attachment_pages.push(url);
            } else {
                page.links.push(DiscoveredLink {
                    url,
                    anchor_text: candidate.anchor_text,
                });
            }
        }
    }
}

fn compile(patterns: &[String]) -> ConfigResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| ConfigError::InvalidPattern(format!("Invalid regex '{}': {}", p, e)))
        })
        .collect()
}

fn collect_anchor_texts(document: &Html, base: &Url) -> Vec<AnchorText> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|anchor| {
            let text = text::element_text(anchor);
            let href = anchor.value().attr("href")?;
            let href = clean_json_href(href).unwrap_or_else(|| href.to_string());
            let url = resolve_link(&href, base)?;
            Some(AnchorText {
                text,
                href: url.to_string(),
            })
        })
        .filter(|anchor| !anchor.text.is_empty())
        .filter(|anchor| seen.insert((anchor.text.clone(), anchor.href.clone())))
        .take(MAX_ANCHOR_TEXTS)
        .collect()
}
