//! Naming strategies, tried in order until one produces a title

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::naming::{
    content_disposition_filename, is_hash_like, last_path_segment, site_label,
    split_known_extension,
};
use super::AttachmentHints;
use crate::config::KnownAttachmentEntry;

/// Matches the "附件N - description" convention anywhere in a text
static NUMBERED_ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"附件\s*(\d+)\s*[-－—_:：、.．]?\s*([^\s，,。；;（(]+)")
        .expect("hardcoded regex pattern is valid")
});

static URL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(20\d{2})/(\d{2})(\d{2})/").expect("hardcoded regex pattern is valid")
});

/// Words that make hint text a plausible document title
const DOCUMENT_KEYWORDS: &[&str] = &[
    "文档", "表", "汇总", "申报", "指南", "通知", "方案", "办法", "规定", "报告", "课件", "幻灯片",
    "演示", "手册", "说明", "名单", "简章",
];

/// Hint texts that say "download" and nothing else
const GENERIC_TEXTS: &[&str] = &[
    "附件", "下载", "点击下载", "点此下载", "下载附件", "附件下载", "download", "attachment",
    "here", "点击这里", "查看",
];

/// Path stems that name an endpoint rather than a file
const GENERIC_STEMS: &[&str] = &[
    "download", "downloadfile", "attachment", "file", "files", "get", "getfile", "view", "index",
    "page", "show", "preview",
];

const MAX_HINT_TITLE_CHARS: usize = 120;

/// Keyword -> purpose label for synthesized names
const PURPOSES: &[(&str, &str)] = &[
    ("通知", "通知"),
    ("notice", "通知"),
    ("申报", "申报材料"),
    ("apply", "申报材料"),
    ("指南", "指南"),
    ("guide", "指南"),
    ("汇总", "汇总表"),
    ("报告", "报告"),
    ("report", "报告"),
    ("课件", "课件"),
    ("名单", "名单"),
];

/// One resolution layer with a uniform `(url, hints) -> Option<title>` shape
pub trait NamingStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn resolve(&self, url: &Url, hints: &AttachmentHints) -> Option<String>;
}

/// Layer 1: filename announced by the server
pub struct ContentDisposition;

impl NamingStrategy for ContentDisposition {
    fn name(&self) -> &'static str {
        "content-disposition"
    }

    fn resolve(&self, _url: &Url, hints: &AttachmentHints) -> Option<String> {
        hints
            .content_disposition
            .as_deref()
            .and_then(content_disposition_filename)
            .filter(|name| {
                let (stem, _) = split_known_extension(name);
                !is_hash_like(stem)
            })
    }
}

/// Layer 2: opaque path tokens with known titles
pub struct KnownAttachments {
    entries: Vec<KnownAttachmentEntry>,
}

impl KnownAttachments {
    pub fn new(extra: &[KnownAttachmentEntry]) -> Self {
        let mut entries = builtin_known_attachments();
        entries.extend(extra.iter().cloned());
        Self { entries }
    }
}

impl NamingStrategy for KnownAttachments {
    fn name(&self) -> &'static str {
        "known-table"
    }

    fn resolve(&self, url: &Url, hints: &AttachmentHints) -> Option<String> {
        let path = url.path().to_lowercase();
        let extension = hints
            .document
            .as_ref()
            .map(|d| d.bare_extension().to_string())
            .filter(|e| !e.is_empty())
            .or_else(|| {
                path.rsplit_once('.')
                    .map(|(_, ext)| ext.to_string())
                    .filter(|ext| !ext.contains('/'))
            })
            .unwrap_or_default();

        self.entries
            .iter()
            .filter(|entry| path.contains(&entry.token.to_lowercase()))
            .find(|entry| entry.extension.is_empty() || entry.extension.eq_ignore_ascii_case(&extension))
            .map(|entry| entry.title.clone())
    }
}

fn builtin_known_attachments() -> Vec<KnownAttachmentEntry> {
    const TOKEN: &str = "feb482194347a6fa415f145d8178";
    [
        ("docx", "附件1-2025年度天津市教育工作重点调研课题指南"),
        ("doc", "附件2-天津市教育工作重点调研课题申报表"),
        ("xls", "附件3-2025年度天津市教育工作重点调研课题申报汇总表"),
    ]
    .into_iter()
    .map(|(extension, title)| KnownAttachmentEntry {
        token: TOKEN.to_string(),
        extension: extension.to_string(),
        title: title.to_string(),
    })
    .collect()
}

/// Layer 3: anchor text or surrounding context
pub struct HintText;

impl NamingStrategy for HintText {
    fn name(&self) -> &'static str {
        "hint-text"
    }

    fn resolve(&self, _url: &Url, hints: &AttachmentHints) -> Option<String> {
        let anchor = hints.anchor_text.as_deref().map(str::trim).unwrap_or("");

        if let Some(numbered) = numbered_title(anchor) {
            return Some(numbered);
        }

        if is_usable_hint(anchor) {
            return Some(anchor.chars().take(MAX_HINT_TITLE_CHARS).collect());
        }

        // Context blocks are long; only the numbered convention is trusted there
        hints.context.as_deref().and_then(numbered_title)
    }
}

/// Normalizes "附件1：申报表.docx" to "附件1-申报表.docx"
fn numbered_title(text: &str) -> Option<String> {
    let caps = NUMBERED_ATTACHMENT.captures(text)?;
    let number = caps.get(1)?.as_str();
    let description = caps.get(2)?.as_str().trim();
    if description.is_empty() {
        return None;
    }
    Some(format!("附件{}-{}", number, description))
}

fn is_usable_hint(text: &str) -> bool {
    let chars = text.chars().count();
    if chars < 2 || chars > MAX_HINT_TITLE_CHARS {
        return false;
    }

    let lower = text.to_lowercase();
    if GENERIC_TEXTS.iter().any(|g| lower == *g) {
        return false;
    }

    let (stem, extension) = split_known_extension(text);
    if is_hash_like(stem) {
        return false;
    }

    extension.is_some() || DOCUMENT_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Layer 4: the last path segment, unless it is an opaque id
pub struct PathSegment;

impl NamingStrategy for PathSegment {
    fn name(&self) -> &'static str {
        "path-segment"
    }

    fn resolve(&self, url: &Url, _hints: &AttachmentHints) -> Option<String> {
        let segment = last_path_segment(url)?;
        let stem = match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => segment.as_str(),
        };
        let stem = stem.trim();

        if stem.is_empty()
            || is_hash_like(stem)
            || GENERIC_STEMS.contains(&stem.to_lowercase().as_str())
        {
            return None;
        }

        Some(segment.trim().to_string())
    }
}

/// Layer 5: `{site}_{purpose}_{date}`; always succeeds
pub struct Synthesized;

impl NamingStrategy for Synthesized {
    fn name(&self) -> &'static str {
        "synthesized"
    }

    fn resolve(&self, url: &Url, hints: &AttachmentHints) -> Option<String> {
        Some(synthesized_name(url, hints))
    }
}

/// Builds the fallback name; the date comes from a `/YYYY/MMDD/` path when present
pub fn synthesized_name(url: &Url, hints: &AttachmentHints) -> String {
    let date = URL_DATE
        .captures(url.path())
        .map(|caps| format!("{}{}{}", &caps[1], &caps[2], &caps[3]))
        .unwrap_or_else(|| hints.today.format("%Y%m%d").to_string());

    format!("{}_{}_{}", site_label(url), purpose(url, hints), date)
}

fn purpose(url: &Url, hints: &AttachmentHints) -> &'static str {
    let haystack = format!(
        "{} {} {}",
        percent_encoding::percent_decode_str(url.path())
            .decode_utf8_lossy()
            .to_lowercase(),
        hints.anchor_text.as_deref().unwrap_or(""),
        hints.context.as_deref().unwrap_or("")
    );

    if let Some((_, label)) = PURPOSES.iter().find(|(k, _)| haystack.contains(k)) {
        return label;
    }

    match hints.document.as_ref().map(|d| d.file_type.as_str()) {
        Some("Word文档") => "文档",
        Some("Excel表格") => "表格",
        Some("PowerPoint演示文稿") => "演示文稿",
        Some("PDF文档") => "文件",
        _ => "附件",
    }
}

/// The default strategy order
pub fn default_strategies(known: &[KnownAttachmentEntry]) -> Vec<Box<dyn NamingStrategy>> {
    vec![
        Box::new(ContentDisposition),
        Box::new(KnownAttachments::new(known)),
        Box::new(HintText),
        Box::new(PathSegment),
        Box::new(Synthesized),
    ]
}
