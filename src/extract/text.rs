//! Title and body text extraction

use scraper::{ElementRef, Html, Node, Selector};

/// Title used when a page offers nothing better
pub const UNTITLED: &str = "无标题";

/// Elements whose text never reaches the body
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "nav"];

/// Elements that break the text flow; inline elements join their neighbours
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Separators left dangling after a site name is trimmed from a title
const TITLE_SEPARATORS: &[char] = &['-', '_', '|', '–', '—', '·', ':', '：', ' '];

/// Longest emphasized lead text accepted as a title
const MAX_LEAD_TITLE_CHARS: usize = 100;

/// Picks the page title
///
/// First non-empty of `<title>` (with a configured site suffix trimmed),
/// `<h1>`, `<h2>`..`<h4>`, and bold/emphasized lead text. Falls back to
/// [`UNTITLED`].
pub fn extract_title(document: &Html, title_suffixes: &[String]) -> String {
    first_text(document, "title")
        .map(|title| trim_site_suffix(&title, title_suffixes))
        .or_else(|| first_text(document, "h1"))
        .or_else(|| first_text(document, "h2, h3, h4"))
        .or_else(|| {
            first_text(document, "strong, b, em")
                .filter(|text| text.chars().count() >= 2)
                .map(|text| text.chars().take(MAX_LEAD_TITLE_CHARS).collect())
        })
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Removes a trailing site name such as `- 南开大学` from a title
///
/// A title that consists of nothing but the site name is kept.
pub fn trim_site_suffix(title: &str, suffixes: &[String]) -> String {
    for suffix in suffixes.iter().filter(|s| !s.is_empty()) {
        if let Some(stripped) = title.strip_suffix(suffix.as_str()) {
            let stripped = stripped.trim_end_matches(TITLE_SEPARATORS).trim();
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    title.to_string()
}

/// Collects visible text from the page body with whitespace collapsed
pub fn extract_body_text(document: &Html) -> String {
    let mut raw = String::new();

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());

    match body {
        Some(body) => collect_text(body, &mut raw),
        None => collect_text(document.root_element(), &mut raw),
    }

    collapse_whitespace(&raw)
}

/// Collapses runs of whitespace (including blank lines) into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push(' ');
            }
            collect_text(child_element, out);
            if block {
                out.push(' ');
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}
