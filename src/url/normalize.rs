use crate::UrlError;
use url::Url;

/// Canonicalizes a URL so that equivalent links collapse to one frontier entry
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host (the `url` crate lowercases it and drops default ports)
/// 4. Remove the fragment (everything after `#`)
/// 5. Remove the query string (everything after `?`)
///
/// The scheme is kept as-is: the http and https forms of a page are distinct
/// entries, and the fetcher decides which protocol to try first.
///
/// Normalization is idempotent: `normalize_url(normalize_url(u)) == normalize_url(u)`.
///
/// # Examples
///
/// ```
/// use campus_harvest::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.edu.cn/news/a.htm?id=3#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.edu.cn/news/a.htm");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    url.set_query(None);

    Ok(url)
}

/// Normalizes an already parsed URL in place of re-parsing a string
pub fn normalize(url: &Url) -> Result<Url, UrlError> {
    normalize_url(url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.edu.cn/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.edu.cn/page");
    }

    #[test]
    fn test_remove_query() {
        let result = normalize_url("https://example.edu.cn/list.htm?page=2&sort=asc").unwrap();
        assert_eq!(result.as_str(), "https://example.edu.cn/list.htm");
    }

    #[test]
    fn test_remove_query_and_fragment() {
        let result = normalize_url("http://example.edu.cn/a/b.htm?x=1#frag").unwrap();
        assert_eq!(result.as_str(), "http://example.edu.cn/a/b.htm");
    }

    #[test]
    fn test_scheme_is_kept() {
        let http = normalize_url("http://example.edu.cn/").unwrap();
        let https = normalize_url("https://example.edu.cn/").unwrap();
        assert_ne!(http, https);
    }

    #[test]
    fn test_lowercase_host_and_default_port() {
        let result = normalize_url("HTTPS://Example.EDU.cn:443/Path").unwrap();
        assert_eq!(result.as_str(), "https://example.edu.cn/Path");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.edu.cn").unwrap();
        assert_eq!(result.as_str(), "https://example.edu.cn/");
    }

    #[test]
    fn test_trailing_slash_is_preserved() {
        let result = normalize_url("https://example.edu.cn/news/").unwrap();
        assert_eq!(result.as_str(), "https://example.edu.cn/news/");
    }

    #[test]
    fn test_empty_query_marker_removed() {
        let result = normalize_url("https://example.edu.cn/page?").unwrap();
        assert_eq!(result.as_str(), "https://example.edu.cn/page");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://example.edu.cn/",
            "http://EXAMPLE.edu.cn/a/../b/c.htm?q=1#x",
            "https://example.edu.cn/%E9%99%84%E4%BB%B6.pdf?download=1",
            "https://example.edu.cn:8443/path/",
            "http://sub.example.edu.cn/路径/文件.doc#top",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalization of {} is not idempotent", input);
            assert!(once.query().is_none());
            assert!(once.fragment().is_none());
        }
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.edu.cn/file.pdf");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("").is_err());
    }

    #[test]
    fn test_normalize_parsed_url() {
        let url = Url::parse("https://example.edu.cn/x?y=1#z").unwrap();
        assert_eq!(normalize(&url).unwrap().as_str(), "https://example.edu.cn/x");
    }
}
