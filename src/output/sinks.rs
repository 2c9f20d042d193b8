//! Destinations for emitted crawl records

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::output::{CrawlRecord, OutputError, OutputResult};

/// Receives records as the crawl emits them
///
/// Writes are keyed by URL, so a sink may be shared between tasks.
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &CrawlRecord) -> OutputResult<()>;

    /// Flushes buffered output at the end of a run
    fn finish(&self) -> OutputResult<()> {
        Ok(())
    }
}

/// Keeps records in memory; used by tests and embedding callers
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<CrawlRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything emitted so far
    pub fn records(&self) -> Vec<CrawlRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &CrawlRecord) -> OutputResult<()> {
        self.records
            .lock()
            .map_err(|_| OutputError::Write("record buffer poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    /// Wraps any writer
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Appends to a file, creating it if needed
    pub fn to_path(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl RecordSink for JsonLinesSink {
    fn emit(&self, record: &CrawlRecord) -> OutputResult<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OutputError::Write("writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    fn finish(&self) -> OutputResult<()> {
        self.writer
            .lock()
            .map_err(|_| OutputError::Write("writer poisoned".to_string()))?
            .flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(url: &str) -> CrawlRecord {
        CrawlRecord {
            url: url.to_string(),
            title: "首页".to_string(),
            content: "欢迎".to_string(),
            is_document: false,
            file_type: "webpage".to_string(),
            mime_type: "text/html".to_string(),
            filename: None,
            snapshot_id: None,
            crawled_at: Utc::now(),
            is_attachment: false,
            depth: 0,
            anchor_texts: Vec::new(),
        }
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(&record("https://example.edu.cn/")).unwrap();
        sink.emit(&record("https://example.edu.cn/about")).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].url, "https://example.edu.cn/about");
    }

    #[test]
    fn test_json_lines_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("records.jsonl");

        let sink = JsonLinesSink::to_path(&path).unwrap();
        sink.emit(&record("https://example.edu.cn/")).unwrap();
        sink.emit(&record("https://example.edu.cn/about")).unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: CrawlRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.url, "https://example.edu.cn/about");
    }
}
