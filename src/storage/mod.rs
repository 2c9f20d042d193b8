//! Snapshot persistence
//!
//! Raw HTML of every successfully fetched webpage is kept under a
//! content-address derived from its normalized URL, so a re-crawl of the
//! same URL overwrites the previous copy. Two backends are provided:
//! - a directory tree on the local filesystem
//! - a SQLite database that also stores crawl records

mod fs;
mod schema;
mod sqlite;
mod traits;

pub use fs::FsSnapshotStore;
pub use sqlite::SqliteStorage;
pub use traits::{SnapshotStore, StorageError, StorageResult};

use sha2::{Digest, Sha256};

/// Computes the snapshot id of a normalized URL
///
/// The id is the hex-encoded SHA-256 of the URL string, so it depends only on
/// the URL and never on page content.
pub fn snapshot_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns true if `id` has the shape produced by [`snapshot_id`]
pub fn is_valid_snapshot_id(id: &str) -> bool {
    id.len() == 64 && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}
