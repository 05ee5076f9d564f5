//! Durable storage abstraction for the offline edit queue.
//!
//! This module defines the `QueuePersistence` trait that the queue store writes
//! through after every mutation. Implementations can keep the queue in memory
//! (tests) or in a JSON file on disk (the default for the desktop client).

use crate::entry::QueueEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current on-disk format version of the queue document.
pub const QUEUE_FORMAT_VERSION: u32 = 1;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage could not be read or written (I/O failure, quota exceeded)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data does not parse as a queue
    #[error("Malformed stored queue: {0}")]
    Malformed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            StorageError::Malformed(err.to_string())
        } else {
            StorageError::Serialization(err.to_string())
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Serialized form of the whole queue.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueueDocument {
    /// Format version for forward compatibility
    pub version: u32,
    /// Pending entries in enqueue order
    pub entries: Vec<QueueEntry>,
}

impl QueueDocument {
    /// Wrap entries in a document at the current format version.
    pub fn new(entries: Vec<QueueEntry>) -> Self {
        Self {
            version: QUEUE_FORMAT_VERSION,
            entries,
        }
    }

    /// Encode to JSON bytes.
    pub fn to_json(&self) -> StorageResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Decode from JSON bytes.
    ///
    /// A bare JSON array of entries is accepted as well, which is how the
    /// browser dashboard stored its queue before the envelope existed.
    pub fn from_json(bytes: &[u8]) -> StorageResult<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Stored {
            Document(QueueDocument),
            Bare(Vec<QueueEntry>),
        }

        match serde_json::from_slice::<Stored>(bytes) {
            Ok(Stored::Document(doc)) => {
                if doc.version > QUEUE_FORMAT_VERSION {
                    return Err(StorageError::Malformed(format!(
                        "unsupported queue format version {}",
                        doc.version
                    )));
                }
                Ok(doc)
            }
            Ok(Stored::Bare(entries)) => Ok(Self::new(entries)),
            Err(e) => Err(StorageError::Malformed(e.to_string())),
        }
    }
}

/// Trait for queue persistence backends
///
/// `load` returns the stored entries in enqueue order, or an empty list when
/// nothing has been stored yet. `store` replaces the stored queue with the
/// given entries.
///
/// # Thread Safety
///
/// The queue store serializes all calls behind its own lock, so backends only
/// need to be `Send + Sync` to be shared across tasks.
pub trait QueuePersistence: Send + Sync {
    /// Load the stored queue.
    ///
    /// Returns `StorageError::Malformed` when data exists but cannot be
    /// parsed; callers decide whether to drop it.
    fn load(&self) -> StorageResult<Vec<QueueEntry>>;

    /// Replace the stored queue with `entries`.
    fn store(&self, entries: &[QueueEntry]) -> StorageResult<()>;

    /// Remove any stored queue.
    fn clear(&self) -> StorageResult<()> {
        self.store(&[])
    }
}

impl<P: QueuePersistence + ?Sized> QueuePersistence for &P {
    fn load(&self) -> StorageResult<Vec<QueueEntry>> {
        (**self).load()
    }

    fn store(&self, entries: &[QueueEntry]) -> StorageResult<()> {
        (**self).store(entries)
    }

    fn clear(&self) -> StorageResult<()> {
        (**self).clear()
    }
}

impl<P: QueuePersistence + ?Sized> QueuePersistence for Box<P> {
    fn load(&self) -> StorageResult<Vec<QueueEntry>> {
        (**self).load()
    }

    fn store(&self, entries: &[QueueEntry]) -> StorageResult<()> {
        (**self).store(entries)
    }

    fn clear(&self) -> StorageResult<()> {
        (**self).clear()
    }
}

impl<P: QueuePersistence + ?Sized> QueuePersistence for std::sync::Arc<P> {
    fn load(&self) -> StorageResult<Vec<QueueEntry>> {
        (**self).load()
    }

    fn store(&self, entries: &[QueueEntry]) -> StorageResult<()> {
        (**self).store(entries)
    }

    fn clear(&self) -> StorageResult<()> {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CellEdit;

    #[test]
    fn test_document_round_trip() {
        let entries = vec![
            QueueEntry::new(CellEdit::new(1u64, 0, 2, "Confirmed", "admin")),
            QueueEntry::new(CellEdit::new(1u64, 0, 2, "", "admin")),
        ];
        let bytes = QueueDocument::new(entries.clone()).to_json().unwrap();
        let doc = QueueDocument::from_json(&bytes).unwrap();

        assert_eq!(doc.version, QUEUE_FORMAT_VERSION);
        assert_eq!(doc.entries, entries);
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let entry = QueueEntry::new(CellEdit::new(2u64, 1, 1, "Pending", "admin"));
        let bytes = serde_json::to_vec(&vec![entry.clone()]).unwrap();
        let doc = QueueDocument::from_json(&bytes).unwrap();
        assert_eq!(doc.entries, vec![entry]);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result = QueueDocument::from_json(b"{not json");
        assert!(matches!(result, Err(StorageError::Malformed(_))));

        let result = QueueDocument::from_json(b"{\"entries\": 5}");
        assert!(matches!(result, Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_future_version_is_malformed() {
        let result = QueueDocument::from_json(b"{\"version\": 99, \"entries\": []}");
        assert!(matches!(result, Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_io_error_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: StorageError = io.into();
        assert_eq!(err, StorageError::Unavailable("disk full".to_string()));
    }
}
