//! Structured request log.
//!
//! Every observed request becomes one [`LogEntry`] in an in-memory list and,
//! when the file sink is enabled, one newline-delimited JSON record in
//! `<dir>/<file_name>`.
//!
//! The two stores diverge: `log_response` only updates the
//! in-memory entry, while `log_error` also appends a separate `error`
//! record to the file. The file is append-only and never rewritten.
//!
//! The user id attached to entries comes from an unverified decode of the
//! bearer token payload. It is log metadata only and must never feed an
//! authorization decision.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::config::LoggingConfig;
use crate::http::request::RequestInfo;

/// One observed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Server-generated and unique within the log.
    pub request_id: String,
    /// ID the client sent in `x-request-id`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_request_id: Option<String>,
    pub method: String,
    pub url: String,
    pub client_ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A line of the log file.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LogRecord {
    Request(LogEntry),
    Error(ErrorRecord),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorRecord {
    request_id: String,
    timestamp: DateTime<Utc>,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<LogEntry>,
}

/// Request logger shared by the admission and logging middleware.
#[derive(Debug)]
pub struct RequestLogger {
    entries: RwLock<VecDeque<LogEntry>>,
    max_entries: usize,
    sink: Option<FileSink>,
}

impl RequestLogger {
    /// Create a logger from configuration.
    ///
    /// The file sink needs a Tokio runtime for its writer task. Outside of
    /// one the logger falls back to memory only.
    pub fn new(config: &LoggingConfig) -> Self {
        let sink = if config.file_enabled {
            let path = Path::new(&config.dir).join(&config.file_name);
            FileSink::spawn(path, config.queue_capacity)
        } else {
            None
        };

        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: config.max_entries.max(1),
            sink,
        }
    }

    /// Memory-only logger.
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: max_entries.max(1),
            sink: None,
        }
    }

    /// `req_<epoch ms>_<12 random alphanumerics>`.
    pub fn generate_request_id() -> String {
        let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(12)
            .collect();
        format!("req_{}_{}", Utc::now().timestamp_millis(), suffix)
    }

    /// Record an admitted request. Returns the ID the entry was stored under.
    pub fn log_request(&self, info: &RequestInfo) -> String {
        let entry = self.push(self.new_entry(info));
        let request_id = entry.request_id.clone();

        tracing::info!(
            request_id = %request_id,
            method = %entry.method,
            url = %entry.url,
            client_ip = %entry.client_ip,
            "Request received"
        );

        self.write_record(&LogRecord::Request(entry));
        request_id
    }

    /// Attach the outcome to an existing entry. Memory only.
    pub fn log_response(
        &self,
        request_id: &str,
        status_code: u16,
        duration_ms: u64,
        error: Option<String>,
    ) {
        let updated = self.update(request_id, |entry| {
            entry.status_code = Some(status_code);
            entry.duration_ms = Some(duration_ms);
            if error.is_some() {
                entry.error = error.clone();
            }
        });

        if updated.is_none() {
            tracing::debug!(request_id = %request_id, "Response for unknown request");
        }

        tracing::info!(
            request_id = %request_id,
            status = status_code,
            duration_ms,
            "Request completed"
        );
    }

    /// Attach an error to an existing entry and append an error record.
    pub fn log_error(&self, request_id: &str, error: &str, metadata: Option<Value>) {
        let entry = self.update(request_id, |entry| {
            entry.error = Some(error.to_string());
        });

        tracing::error!(request_id = %request_id, error = %error, "Request failed");

        self.write_record(&LogRecord::Error(ErrorRecord {
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            error: error.to_string(),
            metadata,
            entry,
        }));
    }

    /// Record a request refused before reaching any handler.
    ///
    /// Produces a single entry with the status and error already set, and a
    /// single error record in the file.
    pub fn log_rejection(
        &self,
        info: &RequestInfo,
        status_code: u16,
        error: &str,
        metadata: Option<Value>,
    ) -> String {
        let mut entry = self.new_entry(info);
        entry.status_code = Some(status_code);
        entry.duration_ms = Some(0);
        entry.error = Some(error.to_string());
        let entry = self.push(entry);
        let request_id = entry.request_id.clone();

        self.write_record(&LogRecord::Error(ErrorRecord {
            request_id: request_id.clone(),
            timestamp: entry.timestamp,
            error: error.to_string(),
            metadata,
            entry: Some(entry),
        }));
        request_id
    }

    /// All entries, oldest first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.read(|entries| entries.iter().cloned().collect())
    }

    pub fn logs_by_user_id(&self, user_id: &str) -> Vec<LogEntry> {
        self.read(|entries| {
            entries
                .iter()
                .filter(|e| e.user_id.as_deref() == Some(user_id))
                .cloned()
                .collect()
        })
    }

    pub fn logs_by_request_id(&self, request_id: &str) -> Vec<LogEntry> {
        self.read(|entries| {
            entries
                .iter()
                .filter(|e| e.request_id == request_id)
                .cloned()
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every queued file record has been written.
    pub async fn flush(&self) {
        if let Some(sink) = &self.sink {
            sink.flush().await;
        }
    }

    /// File records dropped because the writer queue was full.
    pub fn dropped_records(&self) -> u64 {
        self.sink
            .as_ref()
            .map_or(0, |s| s.dropped.load(Ordering::Relaxed))
    }

    /// Path of the log file, when the file sink is active.
    pub fn file_path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|s| s.path.as_path())
    }

    fn new_entry(&self, info: &RequestInfo) -> LogEntry {
        LogEntry {
            request_id: info
                .request_id
                .clone()
                .unwrap_or_else(Self::generate_request_id),
            client_request_id: info.client_request_id.clone(),
            method: info.method.clone(),
            url: info.url.clone(),
            client_ip: info.client_ip.clone(),
            user_agent: info.user_agent.clone(),
            user_id: info.bearer_token.as_deref().and_then(user_id_from_token),
            session_id: info.session_id.clone(),
            timestamp: Utc::now(),
            status_code: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Store `entry`, replacing its ID if another entry already holds it.
    fn push(&self, mut entry: LogEntry) -> LogEntry {
        let mut entries = self.entries.write().expect("request log lock poisoned");
        while entries.iter().any(|e| e.request_id == entry.request_id) {
            let fresh = Self::generate_request_id();
            tracing::warn!(
                request_id = %entry.request_id,
                replacement = %fresh,
                "Duplicate request id replaced"
            );
            entry.request_id = fresh;
        }
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    fn update<F>(&self, request_id: &str, f: F) -> Option<LogEntry>
    where
        F: FnOnce(&mut LogEntry),
    {
        let mut entries = self.entries.write().expect("request log lock poisoned");
        let entry = entries
            .iter_mut()
            .rev()
            .find(|e| e.request_id == request_id)?;
        f(entry);
        Some(entry.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&VecDeque<LogEntry>) -> T) -> T {
        let entries = self.entries.read().expect("request log lock poisoned");
        f(&entries)
    }

    fn write_record(&self, record: &LogRecord) {
        let Some(sink) = &self.sink else {
            return;
        };
        match serde_json::to_string(record) {
            Ok(mut line) => {
                line.push('\n');
                sink.append(line);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode log record"),
        }
    }
}

/// Best-effort `sub` / `userId` / `id` claim from an unverified JWT.
fn user_id_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    ["sub", "userId", "id"]
        .iter()
        .find_map(|key| match claims.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

enum SinkCommand {
    Append(String),
    Flush(oneshot::Sender<()>),
}

/// Append-only file writer.
///
/// A single task owns the file, so lines never interleave and request
/// handling never waits on disk. The queue is bounded: when the writer
/// falls behind, new records are dropped and counted.
#[derive(Debug)]
struct FileSink {
    path: PathBuf,
    tx: mpsc::Sender<SinkCommand>,
    dropped: AtomicU64,
}

impl FileSink {
    fn spawn(path: PathBuf, capacity: usize) -> Option<Self> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(path = ?path, "No runtime available, request log file disabled");
            return None;
        };

        let (tx, rx) = mpsc::channel(capacity.max(1));
        handle.spawn(run_writer(path.clone(), rx));
        Some(Self {
            path,
            tx,
            dropped: AtomicU64::new(0),
        })
    }

    fn append(&self, line: String) {
        match self.tx.try_send(SinkCommand::Append(line)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(path = ?self.path, dropped, "Request log queue full, record dropped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!(path = ?self.path, "Request log writer has stopped");
            }
        }
    }

    async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SinkCommand::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_writer(path: PathBuf, mut rx: mpsc::Receiver<SinkCommand>) {
    let mut file: Option<File> = None;

    while let Some(command) = rx.recv().await {
        match command {
            SinkCommand::Append(line) => {
                if let Err(e) = append_line(&path, &mut file, &line).await {
                    // Stderr via tracing is the fallback sink.
                    tracing::error!(path = ?path, error = %e, "Failed to append request log");
                    file = None;
                }
            }
            SinkCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn append_line(path: &Path, file: &mut Option<File>, line: &str) -> std::io::Result<()> {
    if file.is_none() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let opened = OpenOptions::new().create(true).append(true).open(path).await?;
        *file = Some(opened);
    }

    if let Some(f) = file.as_mut() {
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
    }
    Ok(())
}
