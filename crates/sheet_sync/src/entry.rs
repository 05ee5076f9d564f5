//! Cell edits and the queue entries that carry them.
//!
//! A [`CellEdit`] is what the sheet UI produces when a cell loses focus with a
//! changed value. A [`QueueEntry`] is that edit once it has been accepted into
//! the offline queue and given a stable [`EntryId`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a manager's sheet.
///
/// The dashboard sends either numeric database ids or string ids, so both
/// forms are accepted when deserializing. The id is always written back as a
/// string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ManagerId(String);

impl ManagerId {
    /// Create a manager id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ManagerId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ManagerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ManagerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ManagerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => ManagerId(id.to_string()),
            Raw::Text(id) => ManagerId(id),
        })
    }
}

/// Stable identifier of a queued edit, used to match removals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell edit made by a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEdit {
    /// Sheet the edit belongs to
    pub manager_id: ManagerId,
    /// Zero-based row
    pub row: u32,
    /// Zero-based column
    pub col: u32,
    /// New cell content; empty means the cell was cleared
    pub value: String,
    /// Role of the acting user at edit time
    pub role: String,
}

impl CellEdit {
    /// Create a new cell edit.
    pub fn new(
        manager_id: impl Into<ManagerId>,
        row: u32,
        col: u32,
        value: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            manager_id: manager_id.into(),
            row,
            col,
            value: value.into(),
            role: role.into(),
        }
    }

    /// The cell this edit targets.
    pub fn cell(&self) -> (&ManagerId, u32, u32) {
        (&self.manager_id, self.row, self.col)
    }

    /// Spreadsheet-style reference such as `C1` for row 0, column 2.
    pub fn cell_ref(&self) -> String {
        format!("{}{}", column_label(self.col), self.row + 1)
    }
}

/// A cell edit waiting in the offline queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Assigned on enqueue, never changes
    pub id: EntryId,
    /// The edit to replay
    #[serde(flatten)]
    pub edit: CellEdit,
    /// When the entry was queued
    pub queued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Wrap an edit with a fresh id and the current time.
    pub fn new(edit: CellEdit) -> Self {
        Self {
            id: EntryId::new(),
            edit,
            queued_at: Utc::now(),
        }
    }

    /// Sheet this entry belongs to.
    pub fn manager_id(&self) -> &ManagerId {
        &self.edit.manager_id
    }
}

/// Convert a zero-based column index to a spreadsheet label (`A`, `Z`, `AA`).
pub fn column_label(col: u32) -> String {
    let mut label = Vec::new();
    let mut index = col as u64 + 1;
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        label.push(b'A' + rem);
        index = (index - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_id_accepts_number_and_string() {
        let from_int: ManagerId = serde_json::from_str("7").unwrap();
        let from_str: ManagerId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(from_int, from_str);
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"7\"");

        let named: ManagerId = serde_json::from_str("\"mgr-a\"").unwrap();
        assert_eq!(named.as_str(), "mgr-a");
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let edit = CellEdit::new(1u64, 0, 0, "x", "admin");
        let a = QueueEntry::new(edit.clone());
        let b = QueueEntry::new(edit);
        assert_ne!(a.id, b.id);
        assert_eq!(a.edit, b.edit);
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = QueueEntry::new(CellEdit::new(1u64, 0, 2, "Confirmed", "admin"));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["manager_id"], "1");
        assert_eq!(json["row"], 0);
        assert_eq!(json["col"], 2);
        assert_eq!(json["value"], "Confirmed");
        assert_eq!(json["role"], "admin");
        assert!(json["id"].is_string());

        let restored: QueueEntry = serde_json::from_value(json).unwrap();
        assert_eq!(restored, entry);
    }

    #[test]
    fn test_empty_value_is_a_valid_edit() {
        let edit = CellEdit::new("3", 4, 1, "", "admin");
        assert!(edit.value.is_empty());
        assert_eq!(edit.cell_ref(), "B5");
    }

    #[test]
    fn test_column_label() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(27), "AB");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
    }
}
