//! Host filter deciding which URLs belong to the crawl

use crate::url::normalize_url;
use crate::ConfigError;
use url::Url;

/// The set of hosts a crawl run is permitted to fetch from
///
/// A host is in scope when it matches one of the allowed suffixes and none of
/// the exclude patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    allowed_suffixes: Vec<String>,
    exclude: Vec<String>,
}

impl Scope {
    /// Creates a scope from suffixes and exclude patterns
    ///
    /// Both lists are lowercased; a leading `.` on a suffix is ignored.
    pub fn new<S: AsRef<str>>(allowed_suffixes: &[S], exclude: &[S]) -> Self {
        Self {
            allowed_suffixes: allowed_suffixes
                .iter()
                .map(|s| s.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            exclude: exclude
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// The configured host suffixes
    pub fn allowed_suffixes(&self) -> &[String] {
        &self.allowed_suffixes
    }

    /// Returns true if the URL may be crawled in this run
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let Some(host) = extract_host(url) else {
            return false;
        };

        if self
            .exclude
            .iter()
            .any(|pattern| matches_wildcard(pattern, &host))
        {
            return false;
        }

        in_scope(url, &self.allowed_suffixes)
    }

    /// Parses and checks a raw URL string
    pub fn contains_str(&self, url: &str) -> bool {
        Url::parse(url).map(|u| self.contains(&u)).unwrap_or(false)
    }

    /// Picks the seed URL for a run
    ///
    /// The supplied start URL is used when it normalizes cleanly and is in
    /// scope; otherwise the default seed is tried. If neither qualifies the
    /// run cannot start.
    pub fn resolve_seed(&self, start_url: &str, default_seed: Option<&str>) -> Result<Url, ConfigError> {
        match normalize_url(start_url) {
            Ok(url) if self.contains(&url) => return Ok(url),
            Ok(url) => {
                tracing::warn!("Start URL {} is outside the crawl scope", url);
            }
            Err(e) => {
                tracing::warn!("Start URL {} is unusable: {}", start_url, e);
            }
        }

        let Some(fallback) = default_seed else {
            return Err(ConfigError::NoSeed(format!(
                "{} is not crawlable and no default seed is configured",
                start_url
            )));
        };

        let url = normalize_url(fallback)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid default seed '{}': {}", fallback, e)))?;

        if !self.contains(&url) {
            return Err(ConfigError::NoSeed(format!(
                "default seed {} is outside the crawl scope",
                url
            )));
        }

        tracing::info!("Falling back to default seed {}", url);
        Ok(url)
    }
}

/// Returns true if the URL's host ends with one of the allowed suffixes
///
/// Matching is aligned on labels: `news.example.edu.cn` matches the suffix
/// `example.edu.cn`, but `badexample.edu.cn` does not.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use campus_harvest::url::in_scope;
///
/// let suffixes = vec!["example.edu.cn".to_string()];
/// assert!(in_scope(&Url::parse("https://news.example.edu.cn/").unwrap(), &suffixes));
/// assert!(!in_scope(&Url::parse("https://other.org/").unwrap(), &suffixes));
/// ```
pub fn in_scope(url: &Url, allowed_suffixes: &[String]) -> bool {
    let Some(host) = extract_host(url) else {
        return false;
    };

    allowed_suffixes.iter().any(|suffix| {
        let suffix = suffix.trim_start_matches('.');
        !suffix.is_empty() && (host == suffix || host.ends_with(&format!(".{}", suffix)))
    })
}

/// Extracts the lowercase host of a URL
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Checks a host against an exclude pattern
///
/// `*.example.edu.cn` matches the bare domain and any subdomain; anything else
/// is an exact match.
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
