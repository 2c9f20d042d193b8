//! SQLite storage implementation
//!
//! One database file holds both snapshots and crawl records. The connection
//! sits behind a mutex so the store can be shared through an `Arc`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::output::{AnchorText, CrawlRecord, OutputError, OutputResult, RecordSink};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{is_valid_snapshot_id, snapshot_id};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates a database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }

    /// Inserts or replaces a record, keyed by URL
    pub fn insert_record(&self, record: &CrawlRecord) -> StorageResult<()> {
        let anchors = serde_json::to_string(&record.anchor_texts)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.conn()?.execute(
            "INSERT OR REPLACE INTO records
                (url, title, content, is_document, file_type, mime_type, filename,
                 snapshot_id, crawled_at, is_attachment, depth, anchor_texts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.url,
                record.title,
                record.content,
                record.is_document,
                record.file_type,
                record.mime_type,
                record.filename,
                record.snapshot_id,
                record.crawled_at.to_rfc3339(),
                record.is_attachment,
                record.depth,
                anchors,
            ],
        )?;
        Ok(())
    }

    /// Loads one record by URL
    pub fn get_record(&self, url: &str) -> StorageResult<Option<CrawlRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE url = ?1", SELECT_RECORD))?;
        let row = stmt.query_row(params![url], RawRecord::from_row).optional()?;
        row.map(RawRecord::into_record).transpose()
    }

    /// Loads all records in crawl order
    pub fn records(&self) -> StorageResult<Vec<CrawlRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY crawled_at, url", SELECT_RECORD))?;
        let rows = stmt
            .query_map([], RawRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRecord::into_record).collect()
    }

    pub fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_snapshots(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

const SELECT_RECORD: &str = "SELECT url, title, content, is_document, file_type, mime_type, filename,
        snapshot_id, crawled_at, is_attachment, depth, anchor_texts FROM records";

/// Row shape before the timestamp and anchor JSON are decoded
struct RawRecord {
    url: String,
    title: String,
    content: String,
    is_document: bool,
    file_type: String,
    mime_type: String,
    filename: Option<String>,
    snapshot_id: Option<String>,
    crawled_at: String,
    is_attachment: bool,
    depth: u32,
    anchor_texts: String,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            is_document: row.get(3)?,
            file_type: row.get(4)?,
            mime_type: row.get(5)?,
            filename: row.get(6)?,
            snapshot_id: row.get(7)?,
            crawled_at: row.get(8)?,
            is_attachment: row.get(9)?,
            depth: row.get(10)?,
            anchor_texts: row.get(11)?,
        })
    }

    fn into_record(self) -> StorageResult<CrawlRecord> {
        let crawled_at = DateTime::parse_from_rfc3339(&self.crawled_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?
            .with_timezone(&Utc);
        let anchor_texts: Vec<AnchorText> = serde_json::from_str(&self.anchor_texts)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(CrawlRecord {
            url: self.url,
            title: self.title,
            content: self.content,
            is_document: self.is_document,
            file_type: self.file_type,
            mime_type: self.mime_type,
            filename: self.filename,
            snapshot_id: self.snapshot_id,
            crawled_at,
            is_attachment: self.is_attachment,
            depth: self.depth,
            anchor_texts,
        })
    }
}

impl SnapshotStore for SqliteStorage {
    fn save(&self, url: &str, raw_html: &[u8]) -> StorageResult<String> {
        let id = snapshot_id(url);
        self.conn()?.execute(
            "INSERT OR REPLACE INTO snapshots (id, url, raw_html, stored_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, url, raw_html, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!("Saved snapshot {} for {}", id, url);
        Ok(id)
    }

    fn load(&self, id: &str) -> StorageResult<Option<Vec<u8>>> {
        if !is_valid_snapshot_id(id) {
            return Err(StorageError::InvalidSnapshotId(id.to_string()));
        }

        let bytes = self
            .conn()?
            .query_row(
                "SELECT raw_html FROM snapshots WHERE id = ?1",
                params![id],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(bytes)
    }
}

impl RecordSink for SqliteStorage {
    fn emit(&self, record: &CrawlRecord) -> OutputResult<()> {
        self.insert_record(record)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> CrawlRecord {
        CrawlRecord {
            url: url.to_string(),
            title: "关于我们".to_string(),
            content: "学校简介".to_string(),
            is_document: false,
            file_type: "webpage".to_string(),
            mime_type: "text/html".to_string(),
            filename: None,
            snapshot_id: Some(snapshot_id(url)),
            crawled_at: Utc::now(),
            is_attachment: false,
            depth: 1,
            anchor_texts: vec![AnchorText {
                text: "通知".to_string(),
                href: "https://example.edu.cn/notice".to_string(),
            }],
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .save("https://example.edu.cn/", b"<html></html>")
            .unwrap();

        assert_eq!(storage.load(&id).unwrap().unwrap(), b"<html></html>".to_vec());
        assert_eq!(storage.count_snapshots().unwrap(), 1);

        storage.save("https://example.edu.cn/", b"<html>v2</html>").unwrap();
        assert_eq!(storage.count_snapshots().unwrap(), 1);
        assert_eq!(
            storage.load(&id).unwrap().unwrap(),
            b"<html>v2</html>".to_vec()
        );
    }

    #[test]
    fn test_load_unknown_snapshot() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let id = snapshot_id("https://example.edu.cn/missing");
        assert!(storage.load(&id).unwrap().is_none());
        assert!(storage.load("nope").is_err());
    }

    #[test]
    fn test_emit_and_read_records() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let original = record("https://example.edu.cn/about");

        storage.emit(&original).unwrap();

        let loaded = storage
            .get_record("https://example.edu.cn/about")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.anchor_texts, original.anchor_texts);
        assert_eq!(loaded.snapshot_id, original.snapshot_id);
        assert_eq!(loaded.crawled_at.timestamp(), original.crawled_at.timestamp());
        assert_eq!(storage.count_records().unwrap(), 1);
    }

    #[test]
    fn test_records_keyed_by_url() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        storage.emit(&record("https://example.edu.cn/a")).unwrap();
        storage.emit(&record("https://example.edu.cn/a")).unwrap();
        storage.emit(&record("https://example.edu.cn/b")).unwrap();

        assert_eq!(storage.records().unwrap().len(), 2);
    }
}
