//! Client-side sync configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the tracker API (default: http://127.0.0.1:5000)
    pub base_url: String,
    /// File holding the offline queue; `None` keeps the queue in memory
    pub queue_path: Option<PathBuf>,
    /// Upper bound for a single remote save in seconds (default: 15)
    pub save_timeout_secs: u64,
    /// Interval between background retries while online with pending edits.
    /// `None` disables periodic retries; reconnects still trigger a pass.
    pub retry_interval_secs: Option<u64>,
    /// Whether user-facing notifications are emitted
    pub notifications: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            queue_path: None,
            save_timeout_secs: 15,
            retry_interval_secs: Some(30),
            notifications: true,
        }
    }
}

impl SyncConfig {
    /// Create a config pointing at the given server
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Persist the queue to a file
    pub fn with_queue_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.queue_path = Some(path.into());
        self
    }

    /// Set the remote save timeout
    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set or disable the background retry interval
    pub fn with_retry_interval(mut self, interval: Option<Duration>) -> Self {
        self.retry_interval_secs = interval.map(|d| d.as_secs().max(1));
        self
    }

    /// Disable user-facing notifications
    pub fn without_notifications(mut self) -> Self {
        self.notifications = false;
        self
    }

    /// Remote save timeout as a `Duration`
    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs.max(1))
    }

    /// Retry interval as a `Duration`
    pub fn retry_interval(&self) -> Option<Duration> {
        self.retry_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
