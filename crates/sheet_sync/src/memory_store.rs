//! In-memory queue persistence.
//!
//! `MemoryPersistence` keeps the serialized queue in a byte buffer, which makes
//! it behave like browser local storage: it stores JSON, can hold corrupt data,
//! and can be told to refuse writes to simulate an exceeded quota. It is meant
//! for tests and for clients that do not need to survive a restart.

use crate::entry::QueueEntry;
use crate::storage::{QueueDocument, QueuePersistence, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// In-memory implementation of `QueuePersistence`
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    /// Serialized queue, `None` when nothing has been stored
    data: RwLock<Option<Vec<u8>>>,
    /// When set, every `store` fails with `Unavailable`
    unavailable: AtomicBool,
    /// Number of successful writes, clears included
    writes: AtomicUsize,
}

impl MemoryPersistence {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with raw bytes, e.g. a corrupt queue.
    pub fn with_raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(Some(bytes.into())),
            ..Self::default()
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `store` and `clear` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw stored bytes, if any.
    pub fn raw(&self) -> Option<Vec<u8>> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl QueuePersistence for MemoryPersistence {
    fn load(&self) -> StorageResult<Vec<QueueEntry>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        match data.as_deref() {
            None => Ok(Vec::new()),
            Some(bytes) => Ok(QueueDocument::from_json(bytes)?.entries),
        }
    }

    fn store(&self, entries: &[QueueEntry]) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage quota exceeded".to_string()));
        }

        let bytes = QueueDocument::new(entries.to_vec()).to_json()?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *data = Some(bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage quota exceeded".to_string()));
        }

        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *data = None;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CellEdit;

    fn entry(value: &str) -> QueueEntry {
        QueueEntry::new(CellEdit::new(1u64, 0, 2, value, "admin"))
    }

    #[test]
    fn test_load_empty() {
        let store = MemoryPersistence::new();
        assert!(store.load().unwrap().is_empty());
        assert!(store.raw().is_none());
    }

    #[test]
    fn test_store_then_load_is_lossless() {
        let store = MemoryPersistence::new();
        let entries = vec![entry("Confirmed"), entry("Pending"), entry("")];

        store.store(&entries).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, entries);

        store.store(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), entries);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_unavailable_rejects_writes_but_keeps_data() {
        let store = MemoryPersistence::new();
        store.store(&[entry("a")]).unwrap();

        store.set_unavailable(true);
        let result = store.store(&[entry("a"), entry("b")]);
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(store.load().unwrap().len(), 1);

        store.set_unavailable(false);
        store.store(&[entry("a"), entry("b")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_data_is_malformed() {
        let store = MemoryPersistence::with_raw("[{\"oops\": true}]");
        assert!(matches!(store.load(), Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_clear() {
        let store = MemoryPersistence::new();
        store.store(&[entry("a")]).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
