//! Filename helpers shared by the naming strategies

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use crate::resource::document_type_for_extension;

static UUID_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{12}$")
        .expect("hardcoded regex pattern is valid")
});

/// Longest filename produced by [`sanitize_filename`], in characters
const MAX_FILENAME_CHARS: usize = 120;

/// Returns true for names that are opaque ids rather than human titles
///
/// Rejected shapes:
/// - UUIDs, with or without dashes
/// - all-hex strings of 16 or more characters
/// - strings of 12 or more alphanumerics that are at least 80% hex digits
/// - numeric-only names of 8 or more digits
pub fn is_hash_like(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }

    if UUID_LIKE.is_match(name) {
        return true;
    }

    let alnum: Vec<char> = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let rest = name
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        .count();
    if rest > 0 {
        // Anything with CJK text or punctuation is a real name
        return false;
    }

    if alnum.len() >= 8 && alnum.iter().all(|c| c.is_ascii_digit()) {
        return true;
    }

    let hex = alnum.iter().filter(|c| c.is_ascii_hexdigit()).count();
    if alnum.len() >= 16 && hex == alnum.len() {
        return true;
    }

    alnum.len() >= 12 && (hex as f64 / alnum.len() as f64) >= 0.8
}

/// Splits `name.ext` when `ext` is a known document extension
pub fn split_known_extension(name: &str) -> (&str, Option<&'static str>) {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if let Some(doc_type) = document_type_for_extension(ext) {
            if !stem.trim().is_empty() {
                return (stem, Some(doc_type.extension));
            }
        }
    }
    (name, None)
}

/// Makes a title safe to use as a filename
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == ' ');
    trimmed.chars().take(MAX_FILENAME_CHARS).collect()
}

/// Extracts the filename from a `Content-Disposition` value
///
/// `filename*=` (RFC 5987) wins over `filename=`; percent-escapes in either
/// are decoded.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in header.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().trim_matches('"');

        if key == "filename*" {
            // charset'language'value
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            extended = Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned());
        } else if key == "filename" {
            plain = Some(percent_decode_str(value).decode_utf8_lossy().into_owned());
        }
    }

    extended
        .or(plain)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Last non-empty path segment, percent-decoded
pub fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// Site label used in synthesized names: the first host label, skipping `www`
pub fn site_label(url: &Url) -> String {
    let host = url.host_str().unwrap_or("site");
    let mut labels = host.split('.');
    let first = labels.next().unwrap_or(host);
    let label = if first.eq_ignore_ascii_case("www") {
        labels.next().unwrap_or(first)
    } else {
        first
    };
    label.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_like_names() {
        assert!(is_hash_like("63000b8a-c2bb-47a4-a4da-f78a1e22d2f3"));
        assert!(is_hash_like("3F9A7C2188E44ABC9E11BB7A11223344"));
        assert!(is_hash_like("abeb6f624f32a210e42600226721"));
        assert!(is_hash_like("2025040312345"));
        assert!(is_hash_like("ab12cd34ef56a7"));
    }

    #[test]
    fn test_human_names() {
        assert!(!is_hash_like("report"));
        assert!(!is_hash_like("2025年度工作要点"));
        assert!(!is_hash_like("annual-report-2024"));
        assert!(!is_hash_like("202504"));
        assert!(!is_hash_like(""));
    }

    #[test]
    fn test_split_known_extension() {
        assert_eq!(split_known_extension("申报表.DOCX"), ("申报表", Some("docx")));
        assert_eq!(split_known_extension("page.htm"), ("page.htm", None));
        assert_eq!(split_known_extension(".pdf"), (".pdf", None));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c*?.pdf"), "a_b_c__.pdf");
        assert_eq!(sanitize_filename("  多余   空格 . "), "多余 空格");
        assert_eq!(sanitize_filename(&"长".repeat(200)).chars().count(), 120);
    }

    #[test]
    fn test_content_disposition_filename() {
        assert_eq!(
            content_disposition_filename("attachment; filename=\"report.pdf\"").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(
            content_disposition_filename(
                "attachment; filename=\"fallback.pdf\"; filename*=UTF-8''%E5%B9%B4%E6%8A%A5.pdf"
            )
            .as_deref(),
            Some("年报.pdf")
        );
        assert_eq!(
            content_disposition_filename("attachment;filename=%E9%80%9A%E7%9F%A5.doc").as_deref(),
            Some("通知.doc")
        );
        assert!(content_disposition_filename("inline").is_none());
    }

    #[test]
    fn test_last_path_segment() {
        let url = Url::parse("https://a.example.edu.cn/files/%E9%99%84%E4%BB%B6.pdf/").unwrap();
        assert_eq!(last_path_segment(&url).as_deref(), Some("附件.pdf"));

        let root = Url::parse("https://a.example.edu.cn/").unwrap();
        assert!(last_path_segment(&root).is_none());
    }

    #[test]
    fn test_site_label() {
        assert_eq!(site_label(&Url::parse("https://rsc.example.edu.cn/a").unwrap()), "rsc");
        assert_eq!(site_label(&Url::parse("https://www.example.edu.cn/a").unwrap()), "example");
    }
}
