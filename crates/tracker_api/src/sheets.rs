//! Per-manager sheets held by the server.
//!
//! Cells are plain strings. A save overwrites whatever was there (last write
//! wins); saving outside the current grid grows it so every row keeps the
//! same width.

use serde::{Deserialize, Serialize};
use sheet_sync::ManagerId;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Column count of a freshly created sheet
pub const DEFAULT_COLUMNS: usize = 4;

/// Rows a sheet may grow to
pub const MAX_ROWS: u32 = 1_000;

/// Columns a sheet may grow to
pub const MAX_COLS: u32 = 64;

/// Whether a cell lies inside the largest allowed grid
pub fn in_bounds(row: u32, col: u32) -> bool {
    row < MAX_ROWS && col < MAX_COLS
}

/// One manager's activity log grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: ManagerId,
    pub name: String,
    /// Notes shown to the manager above the sheet
    #[serde(default)]
    pub instructions: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Create a sheet with a single empty row
    pub fn new(id: ManagerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            instructions: String::new(),
            rows: vec![vec![String::new(); DEFAULT_COLUMNS]],
        }
    }

    /// Number of columns (all rows share it)
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Cell content, if the cell is inside the grid
    pub fn cell(&self, row: u32, col: u32) -> Option<&str> {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(String::as_str)
    }

    /// Overwrite a cell, growing the grid as needed.
    ///
    /// Returns `false` and leaves the sheet alone when the cell is outside
    /// `MAX_ROWS` x `MAX_COLS`.
    pub fn set_cell(&mut self, row: u32, col: u32, value: impl Into<String>) -> bool {
        if !in_bounds(row, col) {
            return false;
        }
        let (row, col) = (row as usize, col as usize);
        let width = self.width().max(col + 1);

        for r in &mut self.rows {
            r.resize(width, String::new());
        }
        while self.rows.len() <= row {
            self.rows.push(vec![String::new(); width]);
        }
        self.rows[row][col] = value.into();
        true
    }

    /// Summary without the cell data
    pub fn summary(&self) -> SheetSummary {
        SheetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            rows: self.rows.len(),
            cols: self.width(),
        }
    }
}

/// Manager listing entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub id: ManagerId,
    pub name: String,
    pub instructions: String,
    pub rows: usize,
    pub cols: usize,
}

/// All sheets, keyed by manager
#[derive(Clone, Debug, Default)]
pub struct SheetStore {
    sheets: BTreeMap<ManagerId, Sheet>,
}

impl SheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the dashboard's starter sheet
    pub fn with_default_managers() -> Self {
        let mut store = Self::new();
        let sheet = store.add_manager(ManagerId::from(1u64), "Manager A");
        sheet.set_cell(0, 2, "Pending");
        store
    }

    /// Add (or replace) a manager's sheet
    pub fn add_manager(&mut self, id: ManagerId, name: impl Into<String>) -> &mut Sheet {
        let sheet = Sheet::new(id.clone(), name);
        match self.sheets.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(sheet);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(sheet),
        }
    }

    /// Smallest numeric id above every numeric id in use
    pub fn next_id(&self) -> ManagerId {
        let max = self
            .sheets
            .keys()
            .filter_map(|id| id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        ManagerId::from(max + 1)
    }

    /// Get a sheet
    pub fn get(&self, id: &ManagerId) -> Option<&Sheet> {
        self.sheets.get(id)
    }

    /// Summaries of every sheet, ordered by id
    pub fn list(&self) -> Vec<SheetSummary> {
        self.sheets.values().map(Sheet::summary).collect()
    }

    /// Number of sheets
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Check if there are no sheets
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Save one cell. A sheet is created for unknown managers so replays
    /// for a manager the server has not seen yet are not rejected forever.
    ///
    /// Returns `false` for cells outside the allowed grid.
    pub fn save_cell(&mut self, id: &ManagerId, row: u32, col: u32, value: impl Into<String>) -> bool {
        if !in_bounds(row, col) {
            return false;
        }
        let sheet = self
            .sheets
            .entry(id.clone())
            .or_insert_with(|| Sheet::new(id.clone(), format!("Manager {}", id)));
        sheet.set_cell(row, col, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_managers() {
        let store = SheetStore::with_default_managers();
        let sheet = store.get(&ManagerId::from(1u64)).unwrap();
        assert_eq!(sheet.name, "Manager A");
        assert_eq!(sheet.rows, vec![vec!["", "", "Pending", ""]]);
    }

    #[test]
    fn test_save_overwrites() {
        let mut store = SheetStore::with_default_managers();
        let id = ManagerId::from(1u64);

        store.save_cell(&id, 0, 2, "Confirmed");
        store.save_cell(&id, 0, 2, "Pending");
        assert_eq!(store.get(&id).unwrap().cell(0, 2), Some("Pending"));

        store.save_cell(&id, 0, 2, "");
        assert_eq!(store.get(&id).unwrap().cell(0, 2), Some(""));
    }

    #[test]
    fn test_save_grows_grid() {
        let mut sheet = Sheet::new(ManagerId::from("m"), "M");
        sheet.set_cell(2, 5, "x");

        assert_eq!(sheet.rows.len(), 3);
        assert!(sheet.rows.iter().all(|r| r.len() == 6));
        assert_eq!(sheet.cell(2, 5), Some("x"));
        assert_eq!(sheet.cell(1, 5), Some(""));
        assert_eq!(sheet.cell(3, 0), None);
    }

    #[test]
    fn test_grid_stops_at_limit() {
        let mut sheet = Sheet::new(ManagerId::from("m"), "M");
        assert!(sheet.set_cell(MAX_ROWS - 1, MAX_COLS - 1, "corner"));
        assert_eq!(sheet.rows.len(), MAX_ROWS as usize);
        assert_eq!(sheet.width(), MAX_COLS as usize);

        assert!(!sheet.set_cell(MAX_ROWS, 0, "x"));
        assert!(!sheet.set_cell(0, MAX_COLS, "x"));
        assert!(!sheet.set_cell(u32::MAX, u32::MAX, "x"));
        assert_eq!(sheet.rows.len(), MAX_ROWS as usize);
        assert_eq!(sheet.width(), MAX_COLS as usize);
    }

    #[test]
    fn test_out_of_range_save_creates_nothing() {
        let mut store = SheetStore::new();
        assert!(!store.save_cell(&ManagerId::from(5u64), MAX_ROWS, 0, "x"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_next_id() {
        let mut store = SheetStore::with_default_managers();
        store.add_manager(ManagerId::from(7u64), "Manager G");
        store.add_manager(ManagerId::from("north"), "North");
        assert_eq!(store.next_id(), ManagerId::from(8u64));
        assert_eq!(SheetStore::new().next_id(), ManagerId::from(1u64));
    }

    #[test]
    fn test_unknown_manager_gets_a_sheet() {
        let mut store = SheetStore::new();
        let id = ManagerId::from(42u64);
        store.save_cell(&id, 0, 0, "hello");

        let sheet = store.get(&id).unwrap();
        assert_eq!(sheet.name, "Manager 42");
        assert_eq!(sheet.cell(0, 0), Some("hello"));
    }

    #[test]
    fn test_list_summaries() {
        let mut store = SheetStore::with_default_managers();
        store.add_manager(ManagerId::from(2u64), "Manager B");

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Manager A");
        assert_eq!(list[0].cols, DEFAULT_COLUMNS);
        assert_eq!(list[1].rows, 1);
    }
}
