//! Terminal stand-in for the OS notification service.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use quicknotes_core::reminder::{
    Notification, NotificationChannel, NotificationService, ReminderError, ReminderResult,
};

/// Prints notifications to stdout with a terminal bell.
#[derive(Debug, Clone, Default)]
pub struct TerminalNotifier {
    channels: Arc<Mutex<BTreeSet<String>>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_channel(&self, id: &str) -> bool {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

pub fn render_notification(notification: &Notification) -> String {
    format!("{}  {}", notification.title, notification.body)
}

impl NotificationService for TerminalNotifier {
    fn ensure_channel(&self, channel: &NotificationChannel) -> ReminderResult<()> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if channels.insert(channel.id.clone()) {
            tracing::debug!(
                "Created notification channel {} ({}, {:?})",
                channel.id,
                channel.name,
                channel.importance
            );
        }
        Ok(())
    }

    fn notify(&self, notification: &Notification) -> ReminderResult<()> {
        if !self.has_channel(&notification.channel_id) {
            return Err(ReminderError::Notification(format!(
                "unknown channel {}",
                notification.channel_id
            )));
        }
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\x07{}", render_notification(notification))
            .and_then(|()| stdout.flush())
            .map_err(|error| ReminderError::Notification(error.to_string()))?;
        tracing::info!("Delivered notification {}", notification.id);
        Ok(())
    }
}
