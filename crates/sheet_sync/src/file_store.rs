//! File-based queue persistence.
//!
//! The queue is kept as a single JSON document:
//!
//! ```text
//! {data_dir}/
//! └── pending_edits.json    # {"version": 1, "entries": [...]}
//! ```
//!
//! Writes go to a sibling temporary file that is then renamed over the real
//! one, so a crash mid-write leaves the previous queue intact.

use crate::entry::QueueEntry;
use crate::storage::{QueueDocument, QueuePersistence, StorageResult};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default file name for the queue inside a data directory
pub const QUEUE_FILE: &str = "pending_edits.json";

/// File-based implementation of `QueuePersistence`
#[derive(Debug)]
pub struct FilePersistence {
    /// Path of the queue document
    path: PathBuf,
    /// Serializes writers within this process
    write_lock: Mutex<()>,
}

impl FilePersistence {
    /// Store the queue at the given file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store the queue as [`QUEUE_FILE`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(QUEUE_FILE))
    }

    /// Path of the queue document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| QUEUE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl QueuePersistence for FilePersistence {
    fn load(&self) -> StorageResult<Vec<QueueEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        Ok(QueueDocument::from_json(&bytes)?.entries)
    }

    fn store(&self, entries: &[QueueEntry]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = QueueDocument::new(entries.to_vec()).to_json()?;
        let temp = self.temp_path();
        {
            let mut file = File::create(&temp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        tracing::debug!("Persisted {} queued edits to {:?}", entries.len(), self.path);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CellEdit;
    use crate::storage::StorageError;

    fn entry(row: u32, value: &str) -> QueueEntry {
        QueueEntry::new(CellEdit::new(4u64, row, 1, value, "admin"))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FilePersistence::in_dir(temp_dir.path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_store_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = vec![entry(0, "Called"), entry(1, ""), entry(0, "No answer")];

        {
            let store = FilePersistence::in_dir(temp_dir.path());
            store.store(&entries).unwrap();
        }

        // A new instance simulates an application reload
        let store = FilePersistence::in_dir(temp_dir.path());
        assert_eq!(store.load().unwrap(), entries);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("queue.json");
        let store = FilePersistence::new(&path);

        store.store(&[entry(0, "x")]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_malformed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FilePersistence::in_dir(temp_dir.path());
        fs::write(store.path(), "garbage{").unwrap();

        assert!(matches!(store.load(), Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_blank_file_loads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FilePersistence::in_dir(temp_dir.path());
        fs::write(store.path(), "  \n").unwrap();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_clear_removes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FilePersistence::in_dir(temp_dir.path());
        store.store(&[entry(0, "x")]).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }
}
