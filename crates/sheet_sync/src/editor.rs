//! Entry point for cell edits coming from the sheet UI.
//!
//! Decides per edit whether to save straight to the remote or to queue it:
//!
//! - offline: queue, no remote attempt
//! - online, earlier edits for the same manager still queued: queue, so the
//!   direct write cannot overtake them
//! - online, nothing pending for the manager: save directly, and queue the
//!   edit if that save fails
//!
//! Edits for one manager are routed one at a time. A later edit waits until
//! the earlier direct save is confirmed or queued, so it can never land ahead
//! of it.

use crate::entry::{CellEdit, EntryId};
use crate::error::SyncError;
use crate::notify::Severity;
use crate::remote::RemoteSave;
use crate::storage::QueuePersistence;
use crate::sync::SyncExecutor;
use std::sync::Arc;

/// Why an edit went to the queue instead of the remote
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueReason {
    /// Connectivity was down
    Offline,
    /// Earlier edits for the same manager had not been replayed yet
    PendingEarlierEdits,
    /// The direct save failed
    SaveFailed(SyncError),
}

/// What happened to an edit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// Confirmed by the remote
    Saved,
    /// Held in the offline queue
    Queued { entry: EntryId, reason: QueueReason },
}

impl EditOutcome {
    /// Check if the edit reached the remote
    pub fn is_saved(&self) -> bool {
        matches!(self, EditOutcome::Saved)
    }
}

/// Routes cell edits to the remote or the offline queue
pub struct CellEditor<P, R> {
    executor: Arc<SyncExecutor<P, R>>,
}

impl<P, R> Clone for CellEditor<P, R> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<P, R> CellEditor<P, R>
where
    P: QueuePersistence,
    R: RemoteSave,
{
    /// Create an editor that shares the executor's queue and remote
    pub fn new(executor: Arc<SyncExecutor<P, R>>) -> Self {
        Self { executor }
    }

    /// The executor behind this editor
    pub fn executor(&self) -> &Arc<SyncExecutor<P, R>> {
        &self.executor
    }

    /// Handle a changed cell. The edit is never lost: it is either confirmed
    /// remotely or queued.
    pub async fn edit(&self, edit: CellEdit) -> EditOutcome {
        let _turn = self.executor.lock_manager(&edit.manager_id).await;
        let notifier = self.executor.notifier();

        if self.executor.connectivity().is_offline() {
            let entry = self.executor.enqueue(edit).await;
            notifier.notify("Offline - change saved locally", Severity::Info);
            return EditOutcome::Queued {
                entry: entry.id,
                reason: QueueReason::Offline,
            };
        }

        if self.executor.has_pending_for(&edit.manager_id).await {
            tracing::debug!(
                "Queueing edit for manager {} behind pending edits",
                edit.manager_id
            );
            let entry = self.executor.enqueue(edit).await;
            return EditOutcome::Queued {
                entry: entry.id,
                reason: QueueReason::PendingEarlierEdits,
            };
        }

        match self.executor.save_with_timeout(&edit, false).await {
            Ok(()) => {
                notifier.notify("Cell synced to cloud", Severity::Success);
                EditOutcome::Saved
            }
            Err(e) => {
                tracing::warn!(
                    "Direct save of {} for manager {} failed, queueing: {}",
                    edit.cell_ref(),
                    edit.manager_id,
                    e
                );
                let entry = self.executor.enqueue(edit).await;
                notifier.notify("Sync failed - saved locally", Severity::Info);
                EditOutcome::Queued {
                    entry: entry.id,
                    reason: QueueReason::SaveFailed(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{Connectivity, ConnectivityObserver};
    use crate::memory_store::MemoryPersistence;
    use crate::notify::RecordingSink;
    use crate::queue::EditQueueStore;
    use crate::remote::MemoryRemote;
    use crate::sync::SyncOutcome;
    use std::time::Duration;

    fn editor(
        initial: Connectivity,
    ) -> (
        CellEditor<MemoryPersistence, Arc<MemoryRemote>>,
        Arc<MemoryRemote>,
        Arc<RecordingSink>,
    ) {
        let remote = Arc::new(MemoryRemote::new());
        let sink = Arc::new(RecordingSink::new());
        let executor = SyncExecutor::new(
            EditQueueStore::new(MemoryPersistence::new()),
            Arc::clone(&remote),
            ConnectivityObserver::new(initial),
            sink.clone(),
        );
        (CellEditor::new(Arc::new(executor)), remote, sink)
    }

    #[tokio::test]
    async fn test_online_saves_directly() {
        let (editor, remote, sink) = editor(Connectivity::Online);

        let outcome = editor.edit(CellEdit::new(1u64, 0, 2, "Confirmed", "admin")).await;
        assert!(outcome.is_saved());
        assert_eq!(remote.value(1u64, 0, 2).as_deref(), Some("Confirmed"));
        assert!(!remote.calls()[0].is_replay);
        assert_eq!(editor.executor().pending_count().await, 0);
        assert_eq!(sink.messages(), vec!["Cell synced to cloud"]);
    }

    #[tokio::test]
    async fn test_offline_queues_without_remote_attempt() {
        let (editor, remote, _sink) = editor(Connectivity::Online);
        editor.executor().connectivity().set_offline();

        let outcome = editor.edit(CellEdit::new(1u64, 0, 0, "a", "admin")).await;
        assert!(matches!(
            outcome,
            EditOutcome::Queued {
                reason: QueueReason::Offline,
                ..
            }
        ));
        assert_eq!(remote.call_count(), 0);
        assert_eq!(editor.executor().pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_save_falls_back_to_queue() {
        let (editor, remote, sink) = editor(Connectivity::Online);
        remote.set_failing(true);

        let edit = CellEdit::new(1u64, 2, 1, "Callback", "admin");
        let outcome = editor.edit(edit.clone()).await;
        match outcome {
            EditOutcome::Queued {
                reason: QueueReason::SaveFailed(e),
                ..
            } => assert!(e.is_network()),
            other => panic!("unexpected outcome {:?}", other),
        }

        let pending = editor.executor().pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].edit, edit);
        assert_eq!(sink.messages(), vec!["Sync failed - saved locally"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_waits_for_slow_direct_save() {
        let (editor, remote, _sink) = editor(Connectivity::Online);
        remote.set_delay(Duration::from_millis(100));
        remote.fail_on_call(0);

        let first = {
            let editor = editor.clone();
            tokio::spawn(async move {
                editor
                    .edit(CellEdit::new(1u64, 0, 2, "Confirmed", "admin"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = editor
            .edit(CellEdit::new(1u64, 0, 2, "Pending", "admin"))
            .await;
        let first = first.await.unwrap();

        assert!(matches!(
            first,
            EditOutcome::Queued {
                reason: QueueReason::SaveFailed(_),
                ..
            }
        ));
        assert!(matches!(
            second,
            EditOutcome::Queued {
                reason: QueueReason::PendingEarlierEdits,
                ..
            }
        ));

        editor.executor().process_queue().await;
        assert_eq!(remote.value(1u64, 0, 2).as_deref(), Some("Pending"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_managers_are_not_held_up() {
        let (editor, remote, _sink) = editor(Connectivity::Online);
        remote.set_delay(Duration::from_millis(100));

        let slow = {
            let editor = editor.clone();
            tokio::spawn(async move { editor.edit(CellEdit::new(1u64, 0, 0, "a", "admin")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let started = tokio::time::Instant::now();
        let other = editor.edit(CellEdit::new(2u64, 0, 0, "b", "admin")).await;
        assert!(other.is_saved());
        assert!(started.elapsed() < Duration::from_millis(150));
        assert!(slow.await.unwrap().is_saved());
    }

    #[tokio::test]
    async fn test_pending_edits_for_manager_force_queueing() {
        let (editor, remote, _sink) = editor(Connectivity::Online);
        remote.fail_on_call(0);

        editor.edit(CellEdit::new(1u64, 0, 2, "Confirmed", "admin")).await;
        let outcome = editor.edit(CellEdit::new(1u64, 0, 2, "Pending", "admin")).await;
        assert!(matches!(
            outcome,
            EditOutcome::Queued {
                reason: QueueReason::PendingEarlierEdits,
                ..
            }
        ));
        // Only the failed direct attempt reached the remote
        assert_eq!(remote.call_count(), 1);

        // Another manager is unaffected
        let other = editor.edit(CellEdit::new(2u64, 0, 0, "x", "admin")).await;
        assert!(other.is_saved());

        assert_eq!(
            editor.executor().process_queue().await,
            SyncOutcome::Completed { synced: 2 }
        );
        assert_eq!(remote.value(1u64, 0, 2).as_deref(), Some("Pending"));
    }
}
