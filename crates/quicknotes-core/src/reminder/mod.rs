//! Reminders: scheduling one-shot timers and turning fired timers into
//! notifications.
//!
//! The scheduler and the deliverer never talk to each other directly. The
//! scheduler registers a timer with a `TimerService`; whoever owns the
//! timers (the `ReminderDispatcher` here) hands fired timers to a
//! `ReminderDeliverer`, possibly in another process.

mod deliver;
mod dispatch;
mod queue;
mod schedule;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use deliver::ReminderDeliverer;
pub use dispatch::{ReminderDispatcher, DISPATCH_POLL_INTERVAL};
pub use queue::{PendingTimer, TimerQueue};
pub use schedule::{request_token, ReminderScheduler};

pub const REMINDER_CHANNEL_ID: &str = "quicknotes_channel";
pub const REMINDER_CHANNEL_NAME: &str = "QuickNotes Reminders";
pub const REMINDER_TITLE: &str = "⏰ Reminder!";
pub const DEFAULT_REMINDER_TEXT: &str = "Reminder!";

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Failed to access timer queue at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse timer queue at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Notification failed: {0}")]
    Notification(String),
}

pub type ReminderResult<T> = Result<T, ReminderError>;

/// Opaque data carried by a timer to the deliverer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    #[serde(default)]
    pub note_text: Option<String>,
}

impl ReminderPayload {
    pub fn new(note_text: impl Into<String>) -> Self {
        Self {
            note_text: Some(note_text.into()),
        }
    }
}

/// One-shot timer registration.
pub trait TimerService {
    /// Register a timer firing at `fire_at` (Unix ms). An existing timer
    /// with the same `token` is replaced.
    fn schedule_once(
        &self,
        token: i32,
        fire_at: i64,
        payload: ReminderPayload,
    ) -> ReminderResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Low,
    Default,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: Importance,
}

impl NotificationChannel {
    /// The channel all reminders are posted to.
    pub fn reminders() -> Self {
        Self {
            id: REMINDER_CHANNEL_ID.to_string(),
            name: REMINDER_CHANNEL_NAME.to_string(),
            importance: Importance::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub body: String,
}

/// Where notifications are shown.
pub trait NotificationService {
    /// Create the channel if it does not exist yet.
    fn ensure_channel(&self, channel: &NotificationChannel) -> ReminderResult<()>;
    fn notify(&self, notification: &Notification) -> ReminderResult<()>;
}
