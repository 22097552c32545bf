//! User-facing notifications for mutation outcomes
//!
//! Every mutation outcome surfaces as a notification: success or failure,
//! with the underlying error's message on failure. Sinks implement
//! [`Notifier`]; the coordinator never swallows an error silently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A user-visible notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID
    pub id: String,

    /// Severity
    pub level: NotificationLevel,

    /// Message shown to the user
    pub message: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Create a success notification.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    /// Create an error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Sink for user-visible notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification.
    async fn notify(&self, notification: Notification);
}

/// Notifier that forwards to `tracing`
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                tracing::info!(message = %notification.message, "notification");
            }
            NotificationLevel::Error => {
                tracing::error!(message = %notification.message, "notification");
            }
        }
    }
}

/// Notifier that retains notifications for later display or assertions
///
/// Used by the CLI to print outcomes after a command settles, and by tests
/// to assert on emitted messages.
#[derive(Default)]
pub struct BufferingNotifier {
    buffer: Mutex<Vec<Notification>>,
}

impl BufferingNotifier {
    /// Create an empty buffering notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered notifications, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        let mut buffer = self.buffer.lock().unwrap();
        std::mem::take(&mut *buffer)
    }

    /// Messages currently buffered, oldest first.
    pub fn messages(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        buffer.iter().map(|n| n.message.clone()).collect()
    }
}

#[async_trait]
impl Notifier for BufferingNotifier {
    async fn notify(&self, notification: Notification) {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.push(notification);
    }
}
