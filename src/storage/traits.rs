//! Storage traits and error types

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid snapshot id: {0}")]
    InvalidSnapshotId(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persists raw webpage HTML keyed by URL
///
/// Implementations must be safe to share between tasks; writes for different
/// URLs never contend with each other.
pub trait SnapshotStore: Send + Sync {
    /// Stores the raw bytes of a page
    ///
    /// # Arguments
    ///
    /// * `url` - The normalized URL the bytes were fetched from
    /// * `raw_html` - The undecoded response body
    ///
    /// # Returns
    ///
    /// The snapshot id under which the bytes can be loaded again
    fn save(&self, url: &str, raw_html: &[u8]) -> StorageResult<String>;

    /// Loads a snapshot, or None if nothing is stored under `id`
    fn load(&self, id: &str) -> StorageResult<Option<Vec<u8>>>;
}
