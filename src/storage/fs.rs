use std::path::{Path, PathBuf};

use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{is_valid_snapshot_id, snapshot_id};

/// Filesystem snapshot backend
///
/// Layout: `{root}/{id[0..2]}/{id}.html`. Files are written to a temporary
/// sibling and renamed into place so readers never see a partial snapshot.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a snapshot id is stored at
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(&id[..2]).join(format!("{}.html", id))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn save(&self, url: &str, raw_html: &[u8]) -> StorageResult<String> {
        let id = snapshot_id(url);
        let path = self.path_for(&id);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, raw_html)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!("Saved snapshot {} for {}", id, url);
        Ok(id)
    }

    fn load(&self, id: &str) -> StorageResult<Option<Vec<u8>>> {
        if !is_valid_snapshot_id(id) {
            return Err(StorageError::InvalidSnapshotId(id.to_string()));
        }

        match std::fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
