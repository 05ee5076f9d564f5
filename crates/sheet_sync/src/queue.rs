//! Ordered, durable store of cell edits awaiting remote confirmation.
//!
//! `EditQueueStore` owns the in-memory queue and writes the whole queue
//! through its [`QueuePersistence`] backend after every mutation. The
//! in-memory queue is authoritative: when a write fails the mutation stands,
//! the store remembers that it is dirty, and the next persist retries.

use crate::entry::{CellEdit, EntryId, ManagerId, QueueEntry};
use crate::storage::{QueuePersistence, StorageError, StorageResult};

/// Durable FIFO of pending cell edits
pub struct EditQueueStore<P> {
    /// Pending entries in enqueue order
    entries: Vec<QueueEntry>,
    /// Durable backend
    persistence: P,
    /// Set when the last write failed and the backend is behind
    dirty: bool,
}

impl<P: QueuePersistence> EditQueueStore<P> {
    /// Create an empty store without reading the backend.
    pub fn new(persistence: P) -> Self {
        Self {
            entries: Vec::new(),
            persistence,
            dirty: false,
        }
    }

    /// Open a store, restoring whatever the backend holds.
    ///
    /// Missing data yields an empty queue. Data that cannot be parsed is
    /// dropped with a warning and also yields an empty queue; an unreadable
    /// backend is treated the same way so a broken disk never blocks editing.
    pub fn open(persistence: P) -> Self {
        let entries = match persistence.load() {
            Ok(entries) => entries,
            Err(StorageError::Malformed(reason)) => {
                tracing::warn!("Discarding malformed offline queue: {}", reason);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to load offline queue, starting empty: {}", e);
                Vec::new()
            }
        };

        if !entries.is_empty() {
            tracing::info!("Restored {} pending cell edits", entries.len());
        }

        Self {
            entries,
            persistence,
            dirty: false,
        }
    }

    /// Append an edit with a fresh id and persist the queue.
    ///
    /// The entry is kept even if persisting fails.
    pub fn enqueue(&mut self, edit: CellEdit) -> QueueEntry {
        let entry = QueueEntry::new(edit);
        tracing::debug!(
            "Queued edit {} for manager {} at {}",
            entry.id,
            entry.edit.manager_id,
            entry.edit.cell_ref()
        );
        self.entries.push(entry.clone());
        let _ = self.persist();
        entry
    }

    /// Remove the entry with `id` and persist the queue.
    ///
    /// Returns `false` without touching storage when no such entry exists.
    pub fn remove(&mut self, id: EntryId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        self.entries.remove(pos);
        let _ = self.persist();
        true
    }

    /// Ordered copy of the pending entries.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries.clone()
    }

    /// Borrow the pending entries in order.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any pending entry targets `manager_id`.
    pub fn has_pending_for(&self, manager_id: &ManagerId) -> bool {
        self.entries.iter().any(|e| e.manager_id() == manager_id)
    }

    /// Write the current queue to the backend. An empty queue clears it.
    ///
    /// On failure the store is flagged dirty and the error is logged and
    /// returned; the in-memory queue is unchanged.
    pub fn persist(&mut self) -> StorageResult<()> {
        let result = if self.entries.is_empty() {
            self.persistence.clear()
        } else {
            self.persistence.store(&self.entries)
        };
        match result {
            Ok(()) => {
                if self.dirty {
                    tracing::info!("Offline queue persisted after earlier failure");
                }
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to persist offline queue ({} entries kept in memory): {}",
                    self.entries.len(),
                    e
                );
                self.dirty = true;
                Err(e)
            }
        }
    }

    /// Whether the backend is behind the in-memory queue.
    pub fn needs_persist(&self) -> bool {
        self.dirty
    }

    /// Access the backend
    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}
