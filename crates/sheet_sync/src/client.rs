//! Ready-made sync client wired from a [`SyncConfig`].
//!
//! Bundles a queue store (file-backed when `queue_path` is set), the HTTP
//! remote, a connectivity observer and the background sync task.

use crate::config::SyncConfig;
use crate::connectivity::{Connectivity, ConnectivityObserver};
use crate::editor::{CellEditor, EditOutcome};
use crate::entry::CellEdit;
use crate::error::SyncResult;
use crate::file_store::FilePersistence;
use crate::memory_store::MemoryPersistence;
use crate::notify::{NotificationSink, NullSink, TracingSink};
use crate::queue::EditQueueStore;
use crate::remote::HttpRemoteSave;
use crate::storage::QueuePersistence;
use crate::sync::{SyncExecutor, SyncOutcome, SyncStatusInfo};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Queue backend chosen from configuration
pub type DynPersistence = Box<dyn QueuePersistence>;

/// Executor type used by [`SyncClient`]
pub type HttpSyncExecutor = SyncExecutor<DynPersistence, HttpRemoteSave>;

/// High-level client: edit cells, report connectivity, inspect status.
pub struct SyncClient {
    editor: CellEditor<DynPersistence, HttpRemoteSave>,
    background: Option<JoinHandle<()>>,
}

impl SyncClient {
    /// Build a client from configuration, logging notifications.
    pub fn open(config: &SyncConfig, initial: Connectivity) -> SyncResult<Self> {
        let notifier: Arc<dyn NotificationSink> = if config.notifications {
            Arc::new(TracingSink)
        } else {
            Arc::new(NullSink)
        };
        Self::open_with_sink(config, initial, notifier)
    }

    /// Build a client that reports to the given sink.
    pub fn open_with_sink(
        config: &SyncConfig,
        initial: Connectivity,
        notifier: Arc<dyn NotificationSink>,
    ) -> SyncResult<Self> {
        let persistence: DynPersistence = match &config.queue_path {
            Some(path) => Box::new(FilePersistence::new(path)),
            None => Box::new(MemoryPersistence::new()),
        };
        let remote = HttpRemoteSave::new(&config.base_url, config.save_timeout())?;

        let executor = SyncExecutor::new(
            EditQueueStore::open(persistence),
            remote,
            ConnectivityObserver::new(initial),
            notifier,
        )
        .with_save_timeout(config.save_timeout());

        Ok(Self {
            editor: CellEditor::new(Arc::new(executor)),
            background: None,
        })
    }

    /// Start replaying on reconnect and on the configured retry interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, config: &SyncConfig) {
        if self.background.is_none() {
            self.background = Some(
                self.editor
                    .executor()
                    .spawn_background_sync(config.retry_interval()),
            );
        }
    }

    /// Handle a changed cell
    pub async fn edit(&self, edit: CellEdit) -> EditOutcome {
        self.editor.edit(edit).await
    }

    /// Replay the queue once
    pub async fn sync_now(&self) -> SyncOutcome {
        self.editor.executor().process_queue().await
    }

    /// Connectivity handle for the host to report transitions
    pub fn connectivity(&self) -> &ConnectivityObserver {
        self.editor.executor().connectivity()
    }

    /// Status for the connection indicator
    pub async fn status(&self) -> SyncStatusInfo {
        self.editor.executor().status().await
    }

    /// The executor behind this client
    pub fn executor(&self) -> &Arc<HttpSyncExecutor> {
        self.editor.executor()
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        if let Some(handle) = self.background.take() {
            handle.abort();
        }
    }
}
