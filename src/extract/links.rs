//! Link discovery
//!
//! Walks anchors and embedded-viewer markup and resolves every reference
//! against the page base. Classification into plain links and attachment
//! candidates happens in the extractor.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::heuristics::{
    clean_json_href, context_text, has_anchor_keyword, has_icon_hint, in_attachment_table,
    sudyfile_title,
};
use super::text::element_text;
use super::AttachmentSignal;

/// A reference found in the markup, before scope and classification
#[derive(Debug, Clone)]
pub struct LinkCandidate {
    /// Absolute URL, query and fragment still attached
    pub url: Url,
    pub anchor_text: Option<String>,
    pub context: Option<String>,
    /// Attachment evidence from the surrounding markup
    pub markup_signal: Option<AttachmentSignal>,
}

/// Resolves the document base, honouring `<base href>`
pub fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

/// Collects every followable reference on the page
///
/// # Link Sources
///
/// - `<a href>`, including JSON-like hrefs emitted by some CMS templates
/// - `pdfsrc` attributes of embedded PDF players
/// - `<iframe src>`, `<embed src>`, `<object data>`, unwrapping a viewer's
///   `file=` parameter
///
/// `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only references
/// are dropped.
pub fn collect_candidates(document: &Html, base: &Url) -> Vec<LinkCandidate> {
    let mut candidates = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for anchor in document.select(&a_selector) {
            if let Some(candidate) = anchor_candidate(anchor, base) {
                candidates.push(candidate);
            }
        }
    }

    if let Ok(pdf_selector) = Selector::parse("[pdfsrc]") {
        for element in document.select(&pdf_selector) {
            if let Some(url) = element
                .value()
                .attr("pdfsrc")
                .and_then(|src| resolve_link(src, base))
            {
                candidates.push(embedded_candidate(element, url));
            }
        }
    }

    if let Ok(embed_selector) = Selector::parse("iframe[src], embed[src], object[data]") {
        for element in document.select(&embed_selector) {
            let src = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data"));
            let Some(url) = src.and_then(|src| resolve_link(src, base)) else {
                continue;
            };

            match viewer_file_param(&url, base) {
                Some(file) => candidates.push(embedded_candidate(element, file)),
                // A bare frame is only an attachment if its URL says so
                None => candidates.push(LinkCandidate {
                    url,
                    anchor_text: element.value().attr("title").map(str::to_string),
                    context: None,
                    markup_signal: None,
                }),
            }
        }
    }

    candidates
}

fn anchor_candidate(anchor: ElementRef<'_>, base: &Url) -> Option<LinkCandidate> {
    let href = anchor.value().attr("href")?;
    let href = clean_json_href(href).unwrap_or_else(|| href.to_string());
    let url = resolve_link(&href, base)?;

    let sudy_title = anchor.value().attr("sudyfile-attr").and_then(sudyfile_title);
    let text = element_text(anchor);
    let title_attr = anchor
        .value()
        .attr("title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let anchor_text = sudy_title
        .clone()
        .or_else(|| Some(text.clone()).filter(|t| !t.is_empty()))
        .or_else(|| title_attr.clone());

    let keyword = sudy_title.is_some()
        || anchor.value().attr("download").is_some()
        || has_anchor_keyword(&text)
        || title_attr.as_deref().map(has_anchor_keyword).unwrap_or(false);

    let markup_signal = if keyword {
        Some(AttachmentSignal::AnchorKeyword)
    } else if has_icon_hint(anchor) {
        Some(AttachmentSignal::IconHint)
    } else if in_attachment_table(anchor) {
        Some(AttachmentSignal::TableContext)
    } else {
        None
    };

    Some(LinkCandidate {
        url,
        anchor_text,
        context: context_text(anchor),
        markup_signal,
    })
}

fn embedded_candidate(element: ElementRef<'_>, url: Url) -> LinkCandidate {
    LinkCandidate {
        url,
        anchor_text: element.value().attr("title").map(str::to_string),
        context: context_text(element),
        markup_signal: Some(AttachmentSignal::EmbeddedViewer),
    }
}

/// Unwraps `viewer.html?file=/path/to/doc.pdf`
fn viewer_file_param(url: &Url, base: &Url) -> Option<Url> {
    url.query_pairs()
        .find(|(key, _)| key == "file")
        .and_then(|(_, value)| resolve_link(&value, base))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    base.join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}
