use std::sync::{Arc, Mutex};

use crate::shipments::ShipmentError;
use crate::workflows::skip::SkipError;

/// What the operator is told after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success { message: String },
    /// Transient toast for failures the operator can retry after a reload
    UpdateFailed { message: String },
    ErrorModal { title: String, message: String },
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification::Success {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notification::Success { .. })
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Map a failed operation onto the notification the operator sees.
///
/// Stale versions and transport trouble become an "update failed" toast;
/// everything else opens an error modal with the server's message.
pub fn notification_for(err: &ShipmentError, operation: &str) -> Notification {
    match err {
        ShipmentError::VersionConflict { .. } => Notification::UpdateFailed {
            message: format!("{operation} failed: the shipment was changed elsewhere, reload and try again"),
        },
        ShipmentError::Transport(_) => Notification::UpdateFailed {
            message: format!("{operation} failed: {err}"),
        },
        other => Notification::ErrorModal {
            title: format!("{operation} failed"),
            message: other.user_message(),
        },
    }
}

/// Notification for a skip that stopped part way
pub fn skip_notification(err: &SkipError) -> Notification {
    match notification_for(&err.source, "Skip") {
        Notification::ErrorModal { title, .. } => Notification::ErrorModal {
            title,
            message: err.user_message(),
        },
        Notification::UpdateFailed { .. } => Notification::UpdateFailed {
            message: format!("Skip failed: {}", err.user_message()),
        },
        success => success,
    }
}

/// Prints notifications to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::Success { message } => println!("✅ {message}"),
            Notification::UpdateFailed { message } => eprintln!("⚠️  {message}"),
            Notification::ErrorModal { title, message } => {
                eprintln!("❌ {title}");
                eprintln!("   {message}");
            }
        }
    }
}

/// Keeps every notification; used by tests and non-interactive callers
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}
