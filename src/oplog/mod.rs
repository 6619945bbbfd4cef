// src/oplog/mod.rs
// Operation Log: ordered, mutable status records for user-triggered
// asynchronous actions, shared live with the rendering layer.

use crate::error::LogError;
use crate::gateway::FailureSink;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Sentinel for fields that have no meaningful value yet.
pub const PLACEHOLDER: &str = "-";

/// Unit suffix appended to the duration on every update.
const DURATION_UNIT: &str = "sec";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Loading,
    Success,
    Error,
    Info,
}

impl FromStr for LogStatus {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(Self::Loading),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            other => Err(LogError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        })
    }
}

/// One user-visible record of an asynchronous action.
///
/// `time` is captured once at creation and never recomputed; `id` is
/// immutable and unique within the store's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: u64,
    pub server: String,
    pub status: LogStatus,
    pub time: String,
    pub action: String,
    pub message: String,
    pub duration: String,
}

/// In-memory store of log entries.
///
/// Constructed once and passed by `Arc` to every call site that adds or
/// updates entries. Entries stay in insertion order and are never removed;
/// all mutation goes through an id lookup.
pub struct OperationLog {
    entries: RwLock<Vec<LogEntry>>,
    next_id: AtomicU64,
}

impl OperationLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a new entry and return its id.
    ///
    /// `status` must be one of `loading`, `success`, `error`, `info`;
    /// anything else fails validation and leaves the store untouched.
    /// `server` and `duration` default to the `"-"` sentinel.
    pub fn add_log(
        &self,
        status: &str,
        action: &str,
        message: &str,
        server: Option<&str>,
        duration: Option<&str>,
    ) -> Result<u64, LogError> {
        let status: LogStatus = status.parse()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let entry = LogEntry {
            id,
            server: server.unwrap_or(PLACEHOLDER).to_string(),
            status,
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            action: action.to_string(),
            message: message.to_string(),
            duration: duration.unwrap_or(PLACEHOLDER).to_string(),
        };

        self.entries
            .write()
            .expect("log store lock poisoned")
            .push(entry);

        Ok(id)
    }

    /// Update the entry with the given id in place.
    ///
    /// Overwrites status, action, message and duration; the duration gets a
    /// `" sec"` suffix on every update, even when the value already carried
    /// one. Id, server and time are preserved. Returns `Ok(false)` without
    /// mutating anything when no entry matches.
    pub fn change_log(
        &self,
        id: u64,
        status: &str,
        action: &str,
        message: &str,
        duration: Option<&str>,
    ) -> Result<bool, LogError> {
        let status: LogStatus = status.parse()?;

        let mut entries = self.entries.write().expect("log store lock poisoned");
        for entry in entries.iter_mut() {
            if entry.id == id {
                entry.status = status;
                entry.action = action.to_string();
                entry.message = message.to_string();
                entry.duration = format!("{} {}", duration.unwrap_or(PLACEHOLDER), DURATION_UNIT);
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Clone of the current entries, for rendering.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.read().expect("log store lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("log store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureSink for OperationLog {
    fn record_failure(&self, action: &str, message: &str) {
        // "error" always parses, so the append cannot fail.
        let _ = self.add_log("error", action, message, None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_status() {
        let log = OperationLog::new();

        let err = log
            .add_log("pending", "Import", "Uploading file", None, None)
            .unwrap_err();
        assert!(matches!(err, LogError::InvalidStatus(s) if s == "pending"));
        assert!(log.is_empty());
    }

    #[test]
    fn add_log_captures_fields_and_raw_duration_sentinel() {
        let log = OperationLog::new();

        let id = log
            .add_log("loading", "Import", "Uploading file", None, None)
            .unwrap();

        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, LogStatus::Loading);
        assert_eq!(entry.server, PLACEHOLDER);
        assert_eq!(entry.action, "Import");
        assert_eq!(entry.message, "Uploading file");
        // Sentinel stays raw at creation; the unit suffix only appears on update.
        assert_eq!(entry.duration, PLACEHOLDER);
        // 24-hour wall clock, HH:MM:SS
        assert_eq!(entry.time.len(), 8);
    }

    #[test]
    fn change_log_mutates_in_place() {
        let log = OperationLog::new();

        let id = log
            .add_log("loading", "Import", "Uploading file", Some("main"), None)
            .unwrap();
        let before = log.snapshot()[0].clone();

        let found = log
            .change_log(id, "success", "Import", "Imported 120 rows", Some("2"))
            .unwrap();
        assert!(found);

        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);

        let after = &entries[0];
        assert_eq!(after.status, LogStatus::Success);
        assert_eq!(after.message, "Imported 120 rows");
        assert_eq!(after.duration, "2 sec");
        assert_eq!(after.id, before.id);
        assert_eq!(after.server, before.server);
        assert_eq!(after.time, before.time);
    }

    #[test]
    fn change_log_unknown_id_is_a_noop() {
        let log = OperationLog::new();
        log.add_log("loading", "Export", "Exporting data", None, None)
            .unwrap();
        let before = log.snapshot();

        let found = log.change_log(999_999, "error", "x", "y", None).unwrap();

        assert!(!found);
        assert_eq!(log.snapshot(), before);
    }

    #[test]
    fn change_log_is_idempotent() {
        let log = OperationLog::new();
        let id = log
            .add_log("loading", "Query", "Executing query", Some("main"), None)
            .unwrap();

        log.change_log(id, "success", "Query", "3 rows", Some("2"))
            .unwrap();
        let first = log.snapshot();

        log.change_log(id, "success", "Query", "3 rows", Some("2"))
            .unwrap();
        assert_eq!(log.snapshot(), first);
    }

    #[test]
    fn change_log_suffixes_even_the_placeholder() {
        let log = OperationLog::new();
        let id = log
            .add_log("loading", "Servers", "Fetching server list", None, None)
            .unwrap();

        log.change_log(id, "error", "Servers", "backend unreachable", None)
            .unwrap();

        assert_eq!(log.snapshot()[0].duration, "- sec");
    }

    #[test]
    fn invalid_status_on_change_leaves_entry_untouched() {
        let log = OperationLog::new();
        let id = log
            .add_log("loading", "Import", "Uploading file", None, None)
            .unwrap();
        let before = log.snapshot();

        let err = log.change_log(id, "done", "Import", "finished", None);

        assert!(matches!(err, Err(LogError::InvalidStatus(_))));
        assert_eq!(log.snapshot(), before);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let log = OperationLog::new();

        let a = log.add_log("info", "Servers", "a", None, None).unwrap();
        let b = log.add_log("info", "Servers", "b", None, None).unwrap();
        let c = log.add_log("info", "Servers", "c", None, None).unwrap();

        assert!(a < b && b < c);
    }

    #[test]
    fn record_failure_appends_error_entry() {
        let log = OperationLog::new();

        log.record_failure("list servers", "backend error 500: boom");

        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Error);
        assert_eq!(entries[0].action, "list servers");
        assert_eq!(entries[0].message, "backend error 500: boom");
        assert_eq!(entries[0].server, PLACEHOLDER);
    }
}
