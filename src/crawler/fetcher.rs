//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - HEAD requests for documents, GET requests for webpages
//! - Retry with exponential backoff
//! - HTTPS -> HTTP downgrade with a single HTTPS fallback
//! - Charset detection for bodies with missing or wrong declarations

use std::sync::LazyLock;
use std::time::Duration;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, GBK};
use regex::Regex;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::{FetchConfig, UserAgentConfig};
use crate::resource::{Classifier, DocumentInfo};
use crate::url::downgrade_to_http;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_\-:.]+)"#)
        .expect("hardcoded regex pattern is valid")
});

/// How a URL is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Metadata only, used for documents
    Head,
    /// Full body, used for webpages
    Get,
}

/// Reason a single attempt failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// A successful response
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,

    /// URL after redirects
    pub final_url: Url,

    pub content_type: Option<String>,
    pub content_disposition: Option<String>,

    /// Decoded text; None for HEAD requests and for bodies the headers
    /// identified as documents
    pub body: Option<String>,

    /// Undecoded body bytes, empty whenever `body` is None
    pub raw: Vec<u8>,

    /// Set when the response headers describe a document
    pub document: Option<DocumentInfo>,

    /// Attempts spent, including the successful one
    pub attempts: u32,
}

/// Exhausted retries and fallbacks
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last_error: FetchError,
}

/// Result of fetching one URL; failures are values, never errors
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchedResponse),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success(response) => response.attempts,
            Self::Failure(failure) => failure.attempts,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `fetch` - Timeouts and certificate policy
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    fetch: &FetchConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );

    Client::builder()
        .user_agent(user_agent.header_value())
        .default_headers(headers)
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .danger_accept_invalid_certs(fetch.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches URLs with the retry and protocol fallback policy
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
    prefer_http: bool,
    classifier: Classifier,
}

impl Fetcher {
    pub fn new(
        fetch: &FetchConfig,
        user_agent: &UserAgentConfig,
        classifier: Classifier,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(fetch, user_agent)?,
            max_retries: fetch.max_retries.max(1),
            backoff_base: Duration::from_millis(fetch.backoff_base_ms),
            prefer_http: fetch.prefer_http,
            classifier,
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetches a URL
    ///
    /// # Retry Logic
    ///
    /// | Step | Action |
    /// |------|--------|
    /// | `https://` URL | Try the `http://` form first |
    /// | Failed attempt | Wait `base * 2^attempt`, retry up to `max-retries` attempts |
    /// | Retries exhausted on a downgraded URL | One attempt against the original `https://` URL |
    /// | Everything failed | `FetchOutcome::Failure` |
    ///
    /// Non-2xx statuses and empty GET bodies count as failed attempts. A GET
    /// whose headers describe a document returns without reading the body.
    pub async fn fetch(&self, url: &Url, mode: FetchMode) -> FetchOutcome {
        self.fetch_with_retries(url, mode, self.max_retries).await
    }

    /// Best-effort text fetch with a single attempt per protocol
    ///
    /// Used for robots.txt; returns None on any failure.
    pub async fn fetch_text(&self, url: &Url) -> Option<String> {
        match self.fetch_with_retries(url, FetchMode::Get, 1).await {
            FetchOutcome::Success(response) => response.body,
            FetchOutcome::Failure(failure) => {
                tracing::debug!("Could not fetch {}: {}", url, failure.last_error);
                None
            }
        }
    }

    async fn fetch_with_retries(&self, url: &Url, mode: FetchMode, retries: u32) -> FetchOutcome {
        let downgraded = if self.prefer_http {
            downgrade_to_http(url)
        } else {
            None
        };
        let (primary, fallback) = match downgraded {
            Some(http) => (http, Some(url.clone())),
            None => (url.clone(), None),
        };

        let retries = retries.max(1);
        let mut attempts = 0;
        let mut last_error = FetchError::Request("no attempt made".to_string());

        for attempt in 0..retries {
            attempts += 1;
            match self.attempt(&primary, mode).await {
                Ok(mut response) => {
                    response.attempts = attempts;
                    if fallback.is_some() {
                        response.final_url = restore_https(response.final_url, url);
                    }
                    return FetchOutcome::Success(response);
                }
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt + 1,
                        retries,
                        primary,
                        e
                    );
                    last_error = e;
                }
            }

            if attempt + 1 < retries {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }

        if let Some(original) = fallback {
            attempts += 1;
            tracing::debug!("Falling back to {}", original);
            match self.attempt(&original, mode).await {
                Ok(mut response) => {
                    response.attempts = attempts;
                    return FetchOutcome::Success(response);
                }
                Err(e) => last_error = e,
            }
        }

        tracing::warn!(
            "Giving up on {} after {} attempts: {}",
            url,
            attempts,
            last_error
        );
        FetchOutcome::Failure(FetchFailure {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << attempt.min(16))
    }

    async fn attempt(&self, url: &Url, mode: FetchMode) -> Result<FetchedResponse, FetchError> {
        let response = match mode {
            FetchMode::Head => {
                let response = self.client.head(url.clone()).send().await?;
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) {
                    // Headers of a GET carry the same metadata; the body is never read
                    self.client.get(url.clone()).send().await?
                } else {
                    response
                }
            }
            FetchMode::Get => self.client.get(url.clone()).send().await?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = header_text(response.headers(), CONTENT_TYPE);
        let content_disposition = header_text(response.headers(), CONTENT_DISPOSITION);
        let document = self
            .classifier
            .classify_response(content_type.as_deref(), content_disposition.as_deref());

        if mode == FetchMode::Head || document.is_some() {
            return Ok(FetchedResponse {
                status: status.as_u16(),
                final_url,
                content_type,
                content_disposition,
                body: None,
                raw: Vec::new(),
                document,
                attempts: 0,
            });
        }

        let raw = response.bytes().await?.to_vec();
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::EmptyBody);
        }

        let body = decode_body(&raw, content_type.as_deref(), &final_url);

        Ok(FetchedResponse {
            status: status.as_u16(),
            final_url,
            content_type,
            content_disposition,
            body: Some(body),
            raw,
            document: None,
            attempts: 0,
        })
    }
}

/// Undoes the downgrade on a response URL
///
/// A response reached through the `http://` form of a requested `https://`
/// URL stands for the requested origin, so links on it resolve as `https://`.
/// Redirects to another origin are kept as they are.
fn restore_https(final_url: Url, requested: &Url) -> Url {
    let same_origin = final_url.scheme() == "http"
        && final_url.host_str() == requested.host_str()
        && final_url.port() == requested.port();
    if !same_origin {
        return final_url;
    }

    let mut restored = final_url.clone();
    match restored.set_scheme("https") {
        Ok(()) => restored,
        Err(()) => final_url,
    }
}

/// Reads a header as text, decoding non-ASCII bytes as UTF-8 or GBK
///
/// Short GBK runs are often valid UTF-8 as well, so UTF-8 is only trusted
/// when it yields CJK text.
fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    let value = headers.get(name)?;
    if let Ok(text) = value.to_str() {
        return Some(text.to_string());
    }

    let bytes = value.as_bytes();
    if let Ok(text) = std::str::from_utf8(bytes) {
        if is_cjk_text(text) {
            return Some(text.to_string());
        }
    }

    let (text, _, had_errors) = GBK.decode(bytes);
    if !had_errors {
        return Some(text.into_owned());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(Some(b"cn"), true);
    Some(encoding.decode(bytes).0.into_owned())
}

/// True when every non-ASCII character is CJK or full-width punctuation
fn is_cjk_text(text: &str) -> bool {
    text.chars().filter(|c| !c.is_ascii()).all(|c| {
        matches!(
            c,
            '\u{3000}'..='\u{303F}'
                | '\u{3400}'..='\u{4DBF}'
                | '\u{4E00}'..='\u{9FFF}'
                | '\u{FF00}'..='\u{FFEF}'
        )
    })
}

/// Decodes a response body
///
/// Order of preference: a declared charset that decodes cleanly (header, then
/// `<meta>`), valid UTF-8, then a statistical guess using the host's TLD.
pub fn decode_body(raw: &[u8], content_type: Option<&str>, url: &Url) -> String {
    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| sniff_meta_charset(raw));

    if let Some(encoding) = declared.and_then(|label| Encoding::for_label(label.as_bytes())) {
        let (text, _, had_errors) = encoding.decode(raw);
        if !had_errors {
            return text.into_owned();
        }
        tracing::debug!(
            "Declared charset {} does not fit {}, detecting",
            encoding.name(),
            url
        );
    }

    if let Ok(text) = std::str::from_utf8(raw) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(raw, true);
    let tld = url
        .host_str()
        .and_then(|host| host.rsplit('.').next())
        .map(str::as_bytes);
    let encoding = detector.guess(tld, true);
    encoding.decode(raw).0.into_owned()
}

/// Extracts the `charset` parameter of a Content-Type value
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase())
        .filter(|value| !value.is_empty())
}

/// Finds a `<meta charset>` or `http-equiv` declaration near the top of a page
fn sniff_meta_charset(raw: &[u8]) -> Option<String> {
    let head = &raw[..raw.len().min(4096)];
    let text = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}
