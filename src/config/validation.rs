use crate::config::types::{
    AttachmentsConfig, Config, CrawlerConfig, ExtractConfig, FetchConfig, ScopeConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_scope_config(&config.scope)?;
    validate_extract_config(&config.extract)?;
    validate_attachments_config(&config.attachments)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawl bounds and politeness settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if !config.delay.is_finite() || config.delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            config.delay
        )));
    }

    if !config.long_pause_factor.is_finite() || config.long_pause_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "long_pause_factor must be non-negative, got {}",
            config.long_pause_factor
        )));
    }

    validate_url(&config.start_url, "start_url")?;
    if let Some(seed) = &config.default_seed {
        validate_url(seed, "default_seed")?;
    }

    Ok(())
}

/// Validates retry and timeout settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries == 0 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the suffix allow-list and exclude patterns
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    if config.allowed_suffixes.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_suffixes must list at least one host suffix".to_string(),
        ));
    }

    for suffix in &config.allowed_suffixes {
        validate_domain_string(suffix.trim_start_matches('.'))?;
    }

    for pattern in &config.exclude {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates that every heuristic pattern compiles
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    for pattern in config
        .attachment_path_patterns
        .iter()
        .chain(config.attachment_page_patterns.iter())
    {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid regex '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

/// Validates known-attachment entries
fn validate_attachments_config(config: &AttachmentsConfig) -> Result<(), ConfigError> {
    for entry in &config.known {
        if entry.token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "known attachment token cannot be empty".to_string(),
            ));
        }

        if entry.title.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "known attachment '{}' needs a title",
                entry.token
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // A bare label like "cn" is allowed as a suffix, "edu.cn" style is the norm
    Ok(())
}
