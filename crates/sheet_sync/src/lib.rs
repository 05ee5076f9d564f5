//! Offline-first sync for manager sheet cell edits.
//!
//! Admins edit per-manager sheets in the tracker dashboard. When the server
//! cannot be reached, edits are held in a durable local queue and replayed in
//! order once the connection comes back.
//!
//! # Modules
//!
//! - `entry`: Cell edits, queue entries and their identifiers
//! - `storage`: The `QueuePersistence` trait and the stored queue format
//! - `memory_store` / `file_store`: Persistence backends
//! - `queue`: The ordered, durable `EditQueueStore`
//! - `sync`: The `SyncExecutor` that replays the queue
//! - `editor`: The entry point that routes each edit to the remote or the queue
//! - `connectivity`: Online/offline tracking
//! - `remote`: The `RemoteSave` trait and its HTTP and in-memory implementations
//! - `notify`: User-facing notifications
//! - `config`: Client configuration
//! - `error`: Error types for the sync crate
//!
//! # Example
//!
//! ```
//! use sheet_sync::{
//!     CellEdit, CellEditor, Connectivity, ConnectivityObserver, EditQueueStore,
//!     MemoryPersistence, MemoryRemote, RecordingSink, SyncExecutor,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test_block_on(async {
//! let remote = Arc::new(MemoryRemote::new());
//! let executor = Arc::new(SyncExecutor::new(
//!     EditQueueStore::open(MemoryPersistence::new()),
//!     Arc::clone(&remote),
//!     ConnectivityObserver::new(Connectivity::Offline),
//!     Arc::new(RecordingSink::new()),
//! ));
//! let editor = CellEditor::new(Arc::clone(&executor));
//!
//! // Edits made while offline are queued
//! editor.edit(CellEdit::new(1u64, 0, 2, "Confirmed", "admin")).await;
//! assert_eq!(executor.pending_count().await, 1);
//!
//! // and replayed once the connection returns
//! executor.connectivity().set_online();
//! executor.process_queue().await;
//! assert_eq!(remote.value(1u64, 0, 2).as_deref(), Some("Confirmed"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod connectivity;
pub mod editor;
pub mod entry;
pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod notify;
pub mod queue;
pub mod remote;
pub mod storage;
pub mod sync;

/// Client wired from [`SyncConfig`] with the HTTP remote.
///
/// Only available with the `http` feature (on by default).
#[cfg(feature = "http")]
pub mod client;

// Re-export commonly used types
pub use config::SyncConfig;
pub use connectivity::{Connectivity, ConnectivityObserver};
pub use editor::{CellEditor, EditOutcome, QueueReason};
pub use entry::{column_label, CellEdit, EntryId, ManagerId, QueueEntry};
pub use error::{SyncError, SyncResult};
pub use file_store::FilePersistence;
pub use memory_store::MemoryPersistence;
pub use notify::{
    ChannelSink, Notification, NotificationSink, NullSink, RecordingSink, Severity, TracingSink,
};
pub use queue::EditQueueStore;
pub use remote::{
    MemoryRemote, RemoteSave, SaveCall, SaveCellRequest, REPLAY_HEADER, ROLE_HEADER,
};
pub use storage::{QueueDocument, QueuePersistence, StorageError, StorageResult};
pub use sync::{SyncExecutor, SyncOutcome, SyncStatusInfo};

#[cfg(feature = "http")]
pub use client::SyncClient;
#[cfg(feature = "http")]
pub use remote::HttpRemoteSave;
