//! Pipeline log channel, printed locally and streamed via Server-Sent Events (SSE).
//!
//! Every stage of a translation logs through the global broadcaster. Entries
//! go to stderr (stdout is reserved for CLI output) and to every client
//! connected to `GET /api/logs`. Reconciliation warnings are logged with
//! their kind so clients can group them.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::Warning;

/// Entries kept for slow SSE clients before they start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Log level for client display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level (header positions under their document, ...)
    #[serde(default)]
    pub indent: u8,
    /// Warning kind (`unmatchedKey`, `weightNormalization`, ...) for warning entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Entry for a reconciliation warning, tagged with its kind.
    pub fn from_warning(warning: &Warning) -> Self {
        let kind = match warning {
            Warning::UnmatchedKey { .. } => "unmatchedKey",
            Warning::WeightNormalization { .. } => "weightNormalization",
            Warning::DuplicateMapping { .. } => "duplicateMapping",
        };
        Self {
            kind: Some(kind.to_string()),
            ..Self::new(LogLevel::Warning, warning.to_string()).with_indent(1)
        }
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Print an entry and send it to all subscribers
    pub fn log(&self, entry: LogEntry) {
        let indent = "   ".repeat(entry.indent as usize);
        eprintln!("{}{} {}", indent, entry.level.prefix(), entry.message);

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Log a batch of reconciliation warnings under a count line.
    pub fn log_warnings(&self, warnings: &[Warning]) {
        if warnings.is_empty() {
            return;
        }
        self.log(LogEntry::new(
            LogLevel::Warning,
            format!("{} warning(s):", warnings.len()),
        ));
        for warning in warnings {
            self.log(LogEntry::from_warning(warning));
        }
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

pub fn log_warnings(warnings: &[Warning]) {
    LOG_BROADCASTER.log_warnings(warnings);
}
