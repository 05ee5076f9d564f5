//! Sync executor that replays the offline queue.
//!
//! A pass takes a snapshot of the queue and replays it strictly in order,
//! awaiting each remote save before starting the next. The first failure ends
//! the pass so no later edit can overtake the failed one. Only one pass runs
//! at a time; overlapping triggers (several reconnect events, a retry tick
//! during a reconnect) are turned away by an in-flight guard.

use crate::connectivity::{Connectivity, ConnectivityObserver};
use crate::entry::{CellEdit, ManagerId, QueueEntry};
use crate::error::{SyncError, SyncResult};
use crate::notify::{NotificationSink, Severity};
use crate::queue::EditQueueStore;
use crate::remote::RemoteSave;
use crate::storage::QueuePersistence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// Default bound for one remote save
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_secs(15);

/// How often a reconnect trigger re-checks a busy executor
const BUSY_RETRY: Duration = Duration::from_millis(50);

/// Result of one `process_queue` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing to do: queue empty or offline
    Idle,
    /// Another pass was already in flight
    AlreadyRunning,
    /// Every entry of the snapshot was confirmed
    Completed { synced: usize },
    /// The pass stopped at the first failed entry
    Interrupted {
        synced: usize,
        remaining: usize,
        error: SyncError,
    },
}

impl SyncOutcome {
    /// Number of entries confirmed in this pass
    pub fn synced(&self) -> usize {
        match self {
            SyncOutcome::Completed { synced } | SyncOutcome::Interrupted { synced, .. } => *synced,
            SyncOutcome::Idle | SyncOutcome::AlreadyRunning => 0,
        }
    }

    /// Check if the pass drained its snapshot
    pub fn is_complete(&self) -> bool {
        matches!(self, SyncOutcome::Completed { .. })
    }
}

/// Releases the in-flight flag when a pass ends, even by panic.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drains the edit queue against a remote endpoint
pub struct SyncExecutor<P, R> {
    /// Pending edits
    store: Mutex<EditQueueStore<P>>,
    /// Remote save endpoint
    remote: R,
    /// Online/offline state
    connectivity: ConnectivityObserver,
    /// Where user-facing messages go
    notifier: Arc<dyn NotificationSink>,
    /// Set while a pass is in flight
    running: AtomicBool,
    /// Bound for each remote save
    save_timeout: Duration,
    /// End of the last pass that drained its snapshot
    last_sync: std::sync::Mutex<Option<DateTime<Utc>>>,
    /// One lock per manager with an edit in progress
    edit_locks: std::sync::Mutex<HashMap<ManagerId, Arc<Mutex<()>>>>,
}

impl<P, R> SyncExecutor<P, R>
where
    P: QueuePersistence,
    R: RemoteSave,
{
    /// Create an executor over an opened queue store
    pub fn new(
        store: EditQueueStore<P>,
        remote: R,
        connectivity: ConnectivityObserver,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            remote,
            connectivity,
            notifier,
            running: AtomicBool::new(false),
            save_timeout: DEFAULT_SAVE_TIMEOUT,
            last_sync: std::sync::Mutex::new(None),
            edit_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Set the bound for each remote save
    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout = timeout;
        self
    }

    /// Connectivity handle shared with the host
    pub fn connectivity(&self) -> &ConnectivityObserver {
        &self.connectivity
    }

    /// The remote endpoint
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The notification sink
    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Check if a pass is in flight
    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Time the last complete pass finished
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ========== Queue Access ==========

    /// Append an edit to the queue
    pub async fn enqueue(&self, edit: CellEdit) -> QueueEntry {
        self.store.lock().await.enqueue(edit)
    }

    /// Ordered copy of the pending entries
    pub async fn pending(&self) -> Vec<QueueEntry> {
        self.store.lock().await.snapshot()
    }

    /// Number of pending entries
    pub async fn pending_count(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Whether any pending entry targets the manager
    pub async fn has_pending_for(&self, manager_id: &ManagerId) -> bool {
        self.store.lock().await.has_pending_for(manager_id)
    }

    /// Retry a failed persist without running a pass
    pub async fn flush(&self) -> SyncResult<()> {
        self.store.lock().await.persist()?;
        Ok(())
    }

    /// Wait until no other edit for the manager is being routed.
    ///
    /// Held for the whole of `CellEditor::edit`, so a direct save is either
    /// confirmed or queued before the next edit for the manager looks at
    /// the queue.
    pub async fn lock_manager(&self, manager_id: &ManagerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.edit_locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(manager_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    // ========== Remote ==========

    /// Call the remote with the configured timeout.
    pub async fn save_with_timeout(&self, edit: &CellEdit, is_replay: bool) -> SyncResult<()> {
        match tokio::time::timeout(self.save_timeout, self.remote.save(edit, is_replay)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.save_timeout)),
        }
    }

    // ========== Replay ==========

    /// Replay the queue once.
    ///
    /// Entries added while the pass runs are left for the next trigger.
    pub async fn process_queue(&self) -> SyncOutcome {
        if self.connectivity.is_offline() {
            return SyncOutcome::Idle;
        }

        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::debug!("Sync pass already in flight, skipping trigger");
            return SyncOutcome::AlreadyRunning;
        };

        let snapshot = self.store.lock().await.snapshot();
        if snapshot.is_empty() {
            return SyncOutcome::Idle;
        }

        tracing::info!("Replaying {} queued cell edits", snapshot.len());

        let mut synced = 0;
        let mut failure = None;
        for entry in &snapshot {
            if self.connectivity.is_offline() {
                failure = Some(SyncError::NetworkUnreachable(
                    "connection lost during sync".to_string(),
                ));
                break;
            }

            match self.save_with_timeout(&entry.edit, true).await {
                Ok(()) => {
                    tracing::debug!(
                        "Replayed edit {} ({} {})",
                        entry.id,
                        entry.edit.manager_id,
                        entry.edit.cell_ref()
                    );
                    self.store.lock().await.remove(entry.id);
                    synced += 1;
                }
                Err(e) => {
                    tracing::warn!("Replay of edit {} failed: {}", entry.id, e);
                    failure = Some(e);
                    break;
                }
            }
        }

        let remaining = {
            let mut store = self.store.lock().await;
            // Each remove already wrote the queue; only a failed write is retried.
            if store.needs_persist() {
                let _ = store.persist();
            }
            store.len()
        };

        match failure {
            None => {
                *self.last_sync.lock().unwrap_or_else(|p| p.into_inner()) = Some(Utc::now());
                tracing::info!("Sync complete: {} edits replayed", synced);
                self.notifier.notify(
                    &format!("Sync complete - {} offline changes saved", synced),
                    Severity::Success,
                );
                SyncOutcome::Completed { synced }
            }
            Some(error) => {
                tracing::info!(
                    "Sync interrupted after {} edits, {} still pending",
                    synced,
                    remaining
                );
                // A rejection that will not clear by itself needs the user's attention
                let severity = if error.is_retryable() {
                    Severity::Warning
                } else {
                    Severity::Error
                };
                self.notifier.notify(
                    &format!("Sync interrupted - {} changes still pending", remaining),
                    severity,
                );
                SyncOutcome::Interrupted {
                    synced,
                    remaining,
                    error,
                }
            }
        }
    }

    /// Run a pass, waiting for an in-flight pass to finish first.
    pub async fn process_queue_when_free(&self) -> SyncOutcome {
        loop {
            match self.process_queue().await {
                SyncOutcome::AlreadyRunning => tokio::time::sleep(BUSY_RETRY).await,
                outcome => return outcome,
            }
        }
    }

    // ========== Status ==========

    /// Status for the connection indicator
    pub async fn status(&self) -> SyncStatusInfo {
        let pending = self.pending_count().await;
        let connectivity = self.connectivity.current();
        let syncing = self.is_syncing();

        let message = if syncing {
            "Syncing changes...".to_string()
        } else {
            match (connectivity, pending) {
                (Connectivity::Online, 0) => "Connected".to_string(),
                (Connectivity::Online, n) => format!("Online - {} pending changes", n),
                (Connectivity::Offline, 0) => "Offline".to_string(),
                (Connectivity::Offline, n) => format!("Offline - {} pending changes", n),
            }
        };

        SyncStatusInfo {
            connectivity,
            pending_changes: pending,
            syncing,
            last_sync: self.last_sync(),
            status_message: message,
        }
    }
}

impl<P, R> SyncExecutor<P, R>
where
    P: QueuePersistence + 'static,
    R: RemoteSave + 'static,
{
    /// Run a pass on every offline→online transition, and every
    /// `retry_interval` while online with pending edits.
    ///
    /// The task lives until aborted.
    pub fn spawn_background_sync(self: &Arc<Self>, retry_interval: Option<Duration>) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        let mut rx = self.connectivity.subscribe();
        let _ = rx.borrow_and_update();

        tokio::spawn(async move {
            let mut ticker = retry_interval.map(|period| {
                let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                interval
            });

            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        // Only real state changes are published, so landing on
                        // online means at least one reconnect since the last look,
                        // even when flaps during a pass were coalesced.
                        if *rx.borrow_and_update() == Connectivity::Online {
                            executor.process_queue_when_free().await;
                        }
                    }
                    _ = tick(&mut ticker) => {
                        if executor.connectivity.is_online() && executor.pending_count().await > 0 {
                            executor.process_queue().await;
                        }
                    }
                }
            }
        })
    }
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Status information for the UI's connection indicator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncStatusInfo {
    pub connectivity: Connectivity,
    pub pending_changes: usize,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub status_message: String,
}

impl SyncStatusInfo {
    /// Check if the indicator should be shown
    ///
    /// Returns true if offline or has pending changes
    pub fn should_show(&self) -> bool {
        self.connectivity != Connectivity::Online || self.pending_changes > 0
    }

    /// Get a short status string
    pub fn short_status(&self) -> &'static str {
        if self.syncing {
            return "Syncing";
        }
        match self.connectivity {
            Connectivity::Online => "Online",
            Connectivity::Offline => "Offline",
        }
    }

    /// Seconds since the last complete sync
    pub fn time_since_sync(&self) -> Option<u64> {
        self.last_sync
            .map(|t| (Utc::now() - t).num_seconds().max(0) as u64)
    }

    /// Format time since sync for display
    pub fn formatted_time_since_sync(&self) -> Option<String> {
        self.time_since_sync().map(format_elapsed)
    }
}

fn format_elapsed(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s ago", seconds)
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}
