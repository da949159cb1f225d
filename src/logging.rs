//! Request journal: a bounded in-memory ring of events, optionally mirrored
//! to a JSONL file that is replayed on startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

pub struct Logger {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    writer: Option<BufWriter<File>>,
}

impl Logger {
    /// Journal backed by `file_path`. Existing entries are loaded back into
    /// the ring; unparseable lines are skipped.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut logger = Self::in_memory(MAX_LOG_ENTRIES);

        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
                    logger.push(entry);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        logger.writer = Some(BufWriter::new(file));

        Ok(logger)
    }

    /// Journal that never touches the filesystem.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_LOG_ENTRIES)),
            capacity: capacity.max(1),
            writer: None,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn log(&mut self, entry: LogEntry) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
        self.push(entry);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn for_request(&self, request_id: &str) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.request_id.as_deref() == Some(request_id))
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::new(file_path)?))))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Logger::in_memory(MAX_LOG_ENTRIES))))
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut logger) = self.0.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    /// Scope subsequent entries to one request.
    #[must_use]
    pub fn for_request(&self, request_id: impl Into<String>) -> RequestLogger {
        RequestLogger {
            inner: self.clone(),
            request_id: request_id.into(),
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }

    pub fn entries_for_request(&self, request_id: &str) -> Vec<LogEntry> {
        self.0
            .lock()
            .map(|l| l.for_request(request_id))
            .unwrap_or_default()
    }
}

/// A journal handle that tags every entry with a request id.
#[derive(Clone)]
pub struct RequestLogger {
    inner: SharedLogger,
    request_id: String,
}

impl RequestLogger {
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn log(
        &self,
        level: LogLevel,
        component: impl Into<String>,
        message: impl Into<String>,
        context: Option<serde_json::Value>,
    ) {
        let mut entry =
            LogEntry::new(level, component, message).with_request_id(self.request_id.clone());
        if let Some(ctx) = context {
            entry = entry.with_context(ctx);
        }
        self.inner.log(entry);
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogLevel::Info, component, message, None);
    }

    pub fn debug(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogLevel::Debug, component, message, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ring_drops_oldest() {
        let mut logger = Logger::in_memory(2);
        logger.log(LogEntry::new(LogLevel::Info, "t", "one"));
        logger.log(LogEntry::new(LogLevel::Info, "t", "two"));
        logger.log(LogEntry::new(LogLevel::Info, "t", "three"));

        let recent = logger.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "three");
        assert_eq!(recent[1].message, "two");
    }

    #[test]
    fn test_file_journal_is_replayed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("journal.log");

        {
            let logger = SharedLogger::new(&path).unwrap();
            logger.info("startup", "first run");
            logger
                .for_request("req-1")
                .log(LogLevel::Warn, "openai", "status 429", Some(serde_json::json!({"status": 429})));
        }

        let reopened = SharedLogger::new(&path).unwrap();
        let recent = reopened.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].level, LogLevel::Warn);
        assert_eq!(recent[0].context.as_ref().unwrap()["status"], 429);
        assert_eq!(recent[1].message, "first run");
    }

    #[test]
    fn test_entries_for_request() {
        let logger = SharedLogger::in_memory();
        let a = logger.for_request("a");
        let b = logger.for_request("b");
        a.info("dispatch", "a1");
        b.info("dispatch", "b1");
        a.debug("dispatch", "a2");

        let entries = logger.entries_for_request("a");
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.request_id.as_deref() == Some("a")));
        assert_eq!(a.request_id(), "a");
    }
}
