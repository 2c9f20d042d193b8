use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration held in a string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at run start so records can be traced back to the settings that
/// produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const MINIMAL: &str = r#"
[crawler]
start-url = "https://www.example.edu.cn/"

[scope]
allowed-suffixes = ["example.edu.cn"]
"#;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_pages, 100);
        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.delay, 1.0);
        assert!(config.crawler.respect_robots);
        assert!(!config.crawler.mark_depth_exceeded);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.prefer_http);
        assert_eq!(config.user_agent.crawler_name, "NKUSearchBot");
        assert_eq!(config.output.snapshot_dir, "./snapshots");
        assert!(config.output.database_path.is_none());
        assert!(!config.extract.attachment_page_patterns.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[crawler]
start-url = "https://www.example.edu.cn/"
default-seed = "https://www.example.edu.cn/index.htm"
max-pages = 20
max-depth = 1
delay = 0.5
respect-robots = false
mark-depth-exceeded = true

[fetch]
max-retries = 2
backoff-base-ms = 10
prefer-http = false

[scope]
allowed-suffixes = ["example.edu.cn"]
exclude = ["*.lib.example.edu.cn"]

[extract]
title-suffixes = ["Example University"]

[[attachments.known]]
token = "abc123"
extension = "docx"
title = "附件1-申报指南"

[user-agent]
crawler-name = "TestBot"
crawler-version = "2.0"
contact-url = "https://example.edu.cn/bot"

[output]
records-path = "./records.jsonl"
database-path = "./harvest.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_pages, 20);
        assert_eq!(config.crawler.max_depth, 1);
        assert!(!config.crawler.respect_robots);
        assert!(config.crawler.mark_depth_exceeded);
        assert_eq!(
            config.crawler.default_seed.as_deref(),
            Some("https://www.example.edu.cn/index.htm")
        );
        assert_eq!(config.fetch.max_retries, 2);
        assert!(!config.fetch.prefer_http);
        assert_eq!(config.scope.exclude.len(), 1);
        assert_eq!(config.attachments.known[0].title, "附件1-申报指南");
        assert_eq!(
            config.user_agent.header_value(),
            "Mozilla/5.0 (compatible; TestBot/2.0; +https://example.edu.cn/bot)"
        );
        assert_eq!(config.output.database_path.as_deref(), Some("./harvest.db"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_scope_is_parse_error() {
        let result = parse_config("[crawler]\nstart-url = \"https://example.edu.cn/\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
start-url = "https://www.example.edu.cn/"
max-pages = 0

[scope]
allowed-suffixes = ["example.edu.cn"]
"#;

        let result = parse_config(config_content);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let config_content = r#"
[crawler]
start-url = "https://www.example.edu.cn/"
delay = -1.0

[scope]
allowed-suffixes = ["example.edu.cn"]
"#;

        assert!(matches!(
            parse_config(config_content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_suffix_list_rejected() {
        let config_content = r#"
[crawler]
start-url = "https://www.example.edu.cn/"

[scope]
allowed-suffixes = []
"#;

        assert!(matches!(
            parse_config(config_content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config(MINIMAL);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_load_config_with_hash() {
        let file1 = create_temp_config(MINIMAL);
        let file2 = create_temp_config(&format!("{}\n# comment\n", MINIMAL));

        let (_, hash1) = load_config_with_hash(file1.path()).unwrap();
        let (_, hash2) = load_config_with_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
