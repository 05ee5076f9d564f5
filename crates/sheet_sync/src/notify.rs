//! User-facing notifications emitted by the sync core.
//!
//! The core only decides *what* to tell the user; rendering a toast is up to
//! whichever [`NotificationSink`] the UI layer plugs in.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Severity of a notification, mirrors the dashboard's toast styles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// CSS-style name used by the toast container
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A notification as delivered to a sink
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Receiver of user-facing notifications.
pub trait NotificationSink: Send + Sync {
    /// Deliver a message. Must not block.
    fn notify(&self, message: &str, severity: Severity);
}

/// Sink that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success | Severity::Info => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
    }
}

/// Sink that drops everything, used when notifications are turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// Sink that keeps every notification, for tests and polling UIs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Messages received so far
    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }

    /// Drop everything recorded
    pub fn clear(&self) {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, message: &str, severity: Severity) {
        self.received
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Notification {
                message: message.to_string(),
                severity,
            });
    }
}

/// Sink that forwards notifications over a channel to a UI task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for the UI.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, message: &str, severity: Severity) {
        // A closed receiver means the UI went away; nothing left to show.
        let _ = self.tx.send(Notification {
            message: message.to_string(),
            severity,
        });
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for std::sync::Arc<S> {
    fn notify(&self, message: &str, severity: Severity) {
        (**self).notify(message, severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.notify("Cell synced to cloud", Severity::Success);
        sink.notify("Sync failed - saved locally", Severity::Info);

        let received = sink.notifications();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].severity, Severity::Success);
        assert_eq!(sink.messages()[1], "Sync failed - saved locally");

        sink.clear();
        assert!(sink.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut rx) = ChannelSink::new();
        sink.notify("hello", Severity::Warning);

        let n = rx.recv().await.unwrap();
        assert_eq!(n.message, "hello");
        assert_eq!(n.severity, Severity::Warning);
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.notify("nobody listening", Severity::Error);
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::Success.as_str(), "success");
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
    }
}
