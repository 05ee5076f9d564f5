//! Remote save endpoint.
//!
//! [`RemoteSave`] persists one cell edit on the tracker server. The HTTP
//! implementation posts to `/api/save-cell`; [`MemoryRemote`] is an in-process
//! stand-in with scripted failures for tests and demos.

use crate::entry::{CellEdit, ManagerId};
use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Endpoint that durably stores a single cell edit.
///
/// `is_replay` is `true` when the edit comes out of the offline queue rather
/// than straight from the editor.
#[trait_variant::make(Send)]
pub trait RemoteSave: Send + Sync {
    /// Save one edit. Any error means the edit was not confirmed.
    async fn save(&self, edit: &CellEdit, is_replay: bool) -> SyncResult<()>;
}

impl<R: RemoteSave> RemoteSave for Arc<R> {
    async fn save(&self, edit: &CellEdit, is_replay: bool) -> SyncResult<()> {
        (**self).save(edit, is_replay).await
    }
}

/// A save attempt seen by [`MemoryRemote`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveCall {
    pub edit: CellEdit,
    pub is_replay: bool,
}

/// In-memory remote with last-write-wins cells and scripted failures.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    /// Confirmed cell values
    cells: Mutex<HashMap<(ManagerId, u32, u32), String>>,
    /// Every attempt, including failed ones
    calls: Mutex<Vec<SaveCall>>,
    /// Zero-based attempt numbers that must fail
    fail_on: Mutex<HashSet<usize>>,
    /// Fail every attempt while set
    failing: AtomicBool,
    /// Answer every attempt with this HTTP status while set
    rejection: Mutex<Option<u16>>,
    /// Artificial latency per attempt
    delay: Mutex<Option<Duration>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every save until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Reject every save with `status`, as a server refusing the request would.
    pub fn set_rejection(&self, status: Option<u16>) {
        *self.rejection.lock().unwrap_or_else(|p| p.into_inner()) = status;
    }

    /// Fail the attempt with the given zero-based number.
    pub fn fail_on_call(&self, attempt: usize) {
        self.fail_on
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(attempt);
    }

    /// Sleep this long inside every save.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|p| p.into_inner()) = Some(delay);
    }

    /// Confirmed value of a cell
    pub fn value(&self, manager_id: impl Into<ManagerId>, row: u32, col: u32) -> Option<String> {
        self.cells
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(manager_id.into(), row, col))
            .cloned()
    }

    /// All confirmed cells
    pub fn cells(&self) -> HashMap<(ManagerId, u32, u32), String> {
        self.cells.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Every save attempt in order
    pub fn calls(&self) -> Vec<SaveCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Number of save attempts so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl RemoteSave for MemoryRemote {
    async fn save(&self, edit: &CellEdit, is_replay: bool) -> SyncResult<()> {
        let delay = *self.delay.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let attempt = {
            let mut calls = self.calls.lock().unwrap_or_else(|p| p.into_inner());
            calls.push(SaveCall {
                edit: edit.clone(),
                is_replay,
            });
            calls.len() - 1
        };

        let scripted = self
            .fail_on
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&attempt);
        let rejection = *self.rejection.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(status) = rejection {
            return Err(SyncError::RemoteRejected {
                status,
                message: "rejected".to_string(),
            });
        }
        if scripted || self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::NetworkUnreachable(format!(
                "simulated failure on attempt {}",
                attempt
            )));
        }

        self.cells
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(
                (edit.manager_id.clone(), edit.row, edit.col),
                edit.value.clone(),
            );
        Ok(())
    }
}

/// Header carrying the acting user's role
pub const ROLE_HEADER: &str = "X-Role";
/// Header marking queued replays
pub const REPLAY_HEADER: &str = "X-Replay";

/// JSON body of `POST /api/save-cell`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveCellRequest {
    pub manager_id: ManagerId,
    pub row: u32,
    pub col: u32,
    pub value: String,
}

impl From<&CellEdit> for SaveCellRequest {
    fn from(edit: &CellEdit) -> Self {
        Self {
            manager_id: edit.manager_id.clone(),
            row: edit.row,
            col: edit.col,
            value: edit.value.clone(),
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpRemoteSave;

#[cfg(feature = "http")]
mod http {
    use super::*;

    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    /// `reqwest`-backed remote talking to the tracker API.
    #[derive(Clone, Debug)]
    pub struct HttpRemoteSave {
        client: reqwest::Client,
        endpoint: String,
        timeout: Duration,
    }

    impl HttpRemoteSave {
        /// Create a client for the server at `base_url`.
        pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SyncError::NetworkUnreachable(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: format!("{}/api/save-cell", base_url.trim_end_matches('/')),
                timeout,
            })
        }

        /// Full URL saves are posted to
        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }

        fn map_error(&self, err: reqwest::Error) -> SyncError {
            if err.is_timeout() {
                SyncError::Timeout(self.timeout)
            } else {
                SyncError::NetworkUnreachable(err.to_string())
            }
        }
    }

    impl RemoteSave for HttpRemoteSave {
        async fn save(&self, edit: &CellEdit, is_replay: bool) -> SyncResult<()> {
            let response = self
                .client
                .post(&self.endpoint)
                .header(ROLE_HEADER, edit.role.as_str())
                .header(REPLAY_HEADER, if is_replay { "true" } else { "false" })
                .json(&SaveCellRequest::from(edit))
                .send()
                .await
                .map_err(|e| self.map_error(e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            Err(SyncError::RemoteRejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_remote_last_write_wins() {
        let remote = MemoryRemote::new();
        remote
            .save(&CellEdit::new(1u64, 0, 2, "Confirmed", "admin"), false)
            .await
            .unwrap();
        remote
            .save(&CellEdit::new(1u64, 0, 2, "Pending", "admin"), true)
            .await
            .unwrap();

        assert_eq!(remote.value(1u64, 0, 2).as_deref(), Some("Pending"));
        assert_eq!(remote.call_count(), 2);
        assert!(remote.calls()[1].is_replay);
    }

    #[tokio::test]
    async fn test_memory_remote_scripted_failure() {
        let remote = MemoryRemote::new();
        remote.fail_on_call(1);

        let edit = CellEdit::new(1u64, 0, 0, "a", "admin");
        assert!(remote.save(&edit, false).await.is_ok());
        assert!(remote.save(&edit, false).await.is_err());
        // The scripted failure is consumed
        assert!(remote.save(&edit, false).await.is_ok());
        assert_eq!(remote.call_count(), 3);
    }

    #[tokio::test]
    async fn test_memory_remote_failing_keeps_cells_unchanged() {
        let remote = MemoryRemote::new();
        remote.set_failing(true);

        let result = remote
            .save(&CellEdit::new(1u64, 0, 0, "a", "admin"), false)
            .await;
        assert!(matches!(result, Err(SyncError::NetworkUnreachable(_))));
        assert!(remote.cells().is_empty());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_endpoint_normalizes_slash() {
        let remote = HttpRemoteSave::new("http://127.0.0.1:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(remote.endpoint(), "http://127.0.0.1:5000/api/save-cell");
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_unreachable_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote =
            HttpRemoteSave::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let result = remote
            .save(&CellEdit::new(1u64, 0, 0, "a", "admin"), false)
            .await;
        assert!(result.unwrap_err().is_network());
    }
}
