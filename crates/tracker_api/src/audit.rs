//! Call log and cell-save audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheet_sync::CellEdit;

/// Disposition recorded for accepted cell saves
pub const CELL_SAVE_DISPOSITION: &str = "save-cell";

/// One row of the log table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub user: String,
    pub role: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub disposition: String,
    #[serde(default)]
    pub history: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/logs`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLogEntry {
    pub user: String,
    pub role: String,
    pub phone: String,
    pub disposition: String,
    pub history: String,
}

/// Query of `GET /api/logs`. Empty fields match everything.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    /// Exact role, ignoring case
    pub role: Option<String>,
    /// Exact disposition, ignoring case
    pub disposition: Option<String>,
    /// Part of the phone number
    pub phone: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        fn given(field: &Option<String>) -> Option<&str> {
            field.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        given(&self.role).map_or(true, |r| entry.role.eq_ignore_ascii_case(r))
            && given(&self.disposition).map_or(true, |d| entry.disposition.eq_ignore_ascii_case(d))
            && given(&self.phone).map_or(true, |p| entry.phone.contains(p))
    }
}

/// Append-only log with sequential ids.
#[derive(Clone, Debug)]
pub struct AuditLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a row, stamping id and time. Returns the new id.
    pub fn append(&mut self, row: NewLogEntry) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LogEntry {
            id,
            user: row.user,
            role: row.role,
            phone: row.phone,
            disposition: row.disposition,
            history: row.history,
            timestamp: Utc::now(),
        });
        id
    }

    /// Record an accepted cell save
    pub fn record_cell_save(&mut self, edit: &CellEdit, is_replay: bool) -> u64 {
        let mut history = format!("{}:{}:{}", edit.manager_id, edit.row, edit.col);
        if is_replay {
            history.push_str(" (replay)");
        }
        self.append(NewLogEntry {
            user: edit.role.clone(),
            role: edit.role.clone(),
            phone: String::new(),
            disposition: CELL_SAVE_DISPOSITION.to_string(),
            history,
        })
    }

    /// All rows, newest first
    pub fn newest_first(&self) -> Vec<LogEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Rows passing `filter`, newest first
    pub fn filtered(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
