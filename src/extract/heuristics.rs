//! Markup signals that an anchor points at an attachment

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::text::element_text;
use crate::resource::DOCUMENT_TYPES;

/// Anchor or title words that announce a download
const ANCHOR_KEYWORDS: &[&str] = &["附件", "下载", "download", "attachment"];

/// Tokens in icon `src`/`class`/`alt` values that hint at a file type
const ICON_TOKENS: &[&str] = &["pdf", "doc", "xls", "ppt", "attach", "fujian", "icon_file", "fileicon"];

/// Table header words of attachment listings
const TABLE_KEYWORDS: &[&str] = &["附件", "下载", "文件", "download", "attachment"];

/// Elements whose text is a useful description of a nested link
const CONTEXT_ELEMENTS: &[&str] = &["li", "p", "td", "dd", "dt", "div"];

const MAX_CONTEXT_CHARS: usize = 200;

static SUDYFILE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]title['"]\s*:\s*['"]([^'"]+)['"]"#).expect("hardcoded regex pattern is valid")
});

static JSON_HREF_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"](?:path|url|href|src)['"]\s*:\s*['"]([^'"]+)['"]"#)
        .expect("hardcoded regex pattern is valid")
});

static UPLOAD_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(/_upload/[^'"\s,}]+)"#).expect("hardcoded regex pattern is valid")
});

/// Returns true if anchor text reads like a download link
pub fn has_anchor_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    ANCHOR_KEYWORDS.iter().any(|k| lower.contains(k))
        || DOCUMENT_TYPES
            .iter()
            .filter(|t| !t.optional)
            .any(|t| lower.ends_with(&format!(".{}", t.extension)))
}

/// Looks for a file-type icon inside the anchor or right before it
pub fn has_icon_hint(anchor: ElementRef<'_>) -> bool {
    let inner = Selector::parse("img, i, span")
        .ok()
        .map(|selector| anchor.select(&selector).any(icon_like))
        .unwrap_or(false);

    let previous = anchor
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .map(|sibling| matches!(sibling.value().name(), "img" | "i" | "span") && icon_like(sibling))
        .unwrap_or(false);

    inner || previous
}

fn icon_like(element: ElementRef<'_>) -> bool {
    let value = element.value();
    ["src", "class", "alt"]
        .iter()
        .filter_map(|attr| value.attr(attr))
        .map(|v| v.to_lowercase())
        .any(|v| ICON_TOKENS.iter().any(|token| v.contains(token)))
}

/// Returns true if the anchor sits in a table whose header announces attachments
pub fn in_attachment_table(anchor: ElementRef<'_>) -> bool {
    let Some(table) = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
    else {
        return false;
    };

    let header = Selector::parse("th")
        .ok()
        .map(|selector| {
            table
                .select(&selector)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .or_else(|| {
            Selector::parse("tr")
                .ok()
                .and_then(|selector| table.select(&selector).next())
                .map(element_text)
        })
        .unwrap_or_default()
        .to_lowercase();

    TABLE_KEYWORDS.iter().any(|k| header.contains(k))
}

/// Text of the nearest block ancestor, truncated
pub fn context_text(anchor: ElementRef<'_>) -> Option<String> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| CONTEXT_ELEMENTS.contains(&e.value().name()))
        .map(element_text)
        .filter(|text| !text.is_empty())
        .map(|text| text.chars().take(MAX_CONTEXT_CHARS).collect())
}

/// Title carried in a CMS `sudyfile-attr` attribute (`{'title':'附件1-....docx'}`)
pub fn sudyfile_title(attr: &str) -> Option<String> {
    SUDYFILE_TITLE
        .captures(attr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Recovers the real link from a JSON-like href such as
/// `{'title':'a.docx','path':'/_upload/article/files/a.docx'}`
pub fn clean_json_href(href: &str) -> Option<String> {
    if !href.trim_start().starts_with('{') {
        return None;
    }

    JSON_HREF_PATH
        .captures(href)
        .and_then(|caps| caps.get(1))
        .or_else(|| UPLOAD_PATH.captures(href).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|path| !path.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_anchor(document: &Html) -> ElementRef<'_> {
        let selector = Selector::parse("a").unwrap();
        document.select(&selector).next().unwrap()
    }

    #[test]
    fn test_anchor_keywords() {
        assert!(has_anchor_keyword("附件1：申报表"));
        assert!(has_anchor_keyword("点击下载"));
        assert!(has_anchor_keyword("Download the form"));
        assert!(has_anchor_keyword("2025年工作要点.PDF"));
        assert!(!has_anchor_keyword("学校简介"));
    }

    #[test]
    fn test_icon_inside_anchor() {
        let html = Html::parse_document(
            r#"<p><a href="/f?id=1"><img src="/images/icon_pdf.gif">报告</a></p>"#,
        );
        assert!(has_icon_hint(first_anchor(&html)));
    }

    #[test]
    fn test_icon_before_anchor() {
        let html = Html::parse_document(
            r#"<p><i class="ico ico-doc"></i><a href="/f?id=1">申报书</a></p>"#,
        );
        assert!(has_icon_hint(first_anchor(&html)));

        let plain = Html::parse_document(r#"<p><a href="/news">新闻</a></p>"#);
        assert!(!has_icon_hint(first_anchor(&plain)));
    }

    #[test]
    fn test_attachment_table() {
        let html = Html::parse_document(
            r#"<table><tr><th>序号</th><th>附件名称</th></tr>
               <tr><td>1</td><td><a href="/get?id=9">课题指南</a></td></tr></table>"#,
        );
        assert!(in_attachment_table(first_anchor(&html)));

        let other = Html::parse_document(
            r#"<table><tr><td>日期</td><td><a href="/news/1.htm">新闻</a></td></tr></table>"#,
        );
        assert!(!in_attachment_table(first_anchor(&other)));
    }

    #[test]
    fn test_context_text() {
        let html = Html::parse_document(
            r#"<ul><li>附件：<a href="/a.doc">申报表</a>（请下载填写）</li></ul>"#,
        );
        assert_eq!(
            context_text(first_anchor(&html)).as_deref(),
            Some("附件：申报表（请下载填写）")
        );
    }

    #[test]
    fn test_sudyfile_title() {
        assert_eq!(
            sudyfile_title("{'title':'附件1-课题指南.docx'}").as_deref(),
            Some("附件1-课题指南.docx")
        );
        assert!(sudyfile_title("{}").is_none());
    }

    #[test]
    fn test_clean_json_href() {
        assert_eq!(
            clean_json_href("{'title':'a.docx','path':'/_upload/article/files/a.docx'}").as_deref(),
            Some("/_upload/article/files/a.docx")
        );
        assert_eq!(
            clean_json_href("{'title':'b.pdf', /_upload/article/files/b.pdf}").as_deref(),
            Some("/_upload/article/files/b.pdf")
        );
        assert!(clean_json_href("/normal/link.htm").is_none());
    }
}
