//! Error types for the sheet sync crate.

use crate::storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while saving or replaying a cell edit.
///
/// None of these are fatal to the application. A failed save leaves the edit
/// in the local queue until a later pass succeeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote save could not be attempted at all.
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The remote answered with a non-success status.
    #[error("Remote rejected save ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// The remote did not answer within the configured bound.
    #[error("Remote save timed out after {0:?}")]
    Timeout(Duration),

    /// The local queue could not be written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
}

impl SyncError {
    /// Whether the edit should stay queued and be retried on the next pass.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::NetworkUnreachable(_) | SyncError::Timeout(_) => true,
            // 4xx other than 408/429 will not fix itself, but the edit is kept
            // anyway: dropping it would lose data.
            SyncError::RemoteRejected { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            SyncError::Persistence(_) => true,
        }
    }

    /// Whether the failure happened before the remote saw the request.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SyncError::NetworkUnreachable(_) | SyncError::Timeout(_)
        )
    }
}
