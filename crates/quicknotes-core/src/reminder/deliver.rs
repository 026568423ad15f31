use std::sync::atomic::{AtomicI64, Ordering};

use super::{
    Notification, NotificationChannel, NotificationService, ReminderPayload,
    DEFAULT_REMINDER_TEXT, REMINDER_TITLE,
};
use crate::util::unix_millis_now;

/// Turns a fired timer into exactly one notification.
///
/// Holds no note state: everything it needs arrives in the payload.
#[derive(Debug)]
pub struct ReminderDeliverer<N: NotificationService> {
    notifications: N,
    last_id: AtomicI64,
}

impl<N: NotificationService> ReminderDeliverer<N> {
    pub const fn new(notifications: N) -> Self {
        Self {
            notifications,
            last_id: AtomicI64::new(0),
        }
    }

    pub const fn notifications(&self) -> &N {
        &self.notifications
    }

    /// Show the reminder. Returns the notification id, or `None` when the
    /// notification service failed.
    pub fn deliver(&self, payload: &ReminderPayload) -> Option<i32> {
        let channel = NotificationChannel::reminders();
        if let Err(error) = self.notifications.ensure_channel(&channel) {
            tracing::warn!("Failed to ensure notification channel: {}", error);
        }

        let body = payload
            .note_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(DEFAULT_REMINDER_TEXT);
        let notification = Notification {
            id: self.next_notification_id(),
            channel_id: channel.id,
            title: REMINDER_TITLE.to_string(),
            body: body.to_string(),
        };

        match self.notifications.notify(&notification) {
            Ok(()) => Some(notification.id),
            Err(error) => {
                tracing::warn!("Failed to show reminder: {}", error);
                None
            }
        }
    }

    /// Millisecond clock, bumped so ids never repeat within a process.
    fn next_notification_id(&self) -> i32 {
        let now = unix_millis_now();
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let id = now.max(previous + 1);
        i32::try_from(id.rem_euclid(i64::from(i32::MAX))).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use super::*;
    use crate::reminder::{ReminderError, ReminderResult, REMINDER_CHANNEL_ID};

    #[derive(Default)]
    struct RecordingNotifier {
        channels: RefCell<HashSet<String>>,
        shown: RefCell<Vec<Notification>>,
        fail: bool,
    }

    impl NotificationService for RecordingNotifier {
        fn ensure_channel(&self, channel: &NotificationChannel) -> ReminderResult<()> {
            self.channels.borrow_mut().insert(channel.id.clone());
            Ok(())
        }

        fn notify(&self, notification: &Notification) -> ReminderResult<()> {
            if self.fail {
                return Err(ReminderError::Notification("offline".to_string()));
            }
            self.shown.borrow_mut().push(notification.clone());
            Ok(())
        }
    }

    #[test]
    fn deliver_renders_exactly_one_notification() {
        let deliverer = ReminderDeliverer::new(RecordingNotifier::default());
        let id = deliverer.deliver(&ReminderPayload::new("Call mom"));

        let shown = deliverer.notifications().shown.borrow();
        assert_eq!(shown.len(), 1);
        assert_eq!(Some(shown[0].id), id);
        assert_eq!(shown[0].title, "⏰ Reminder!");
        assert_eq!(shown[0].body, "Call mom");
        assert_eq!(shown[0].channel_id, REMINDER_CHANNEL_ID);
        assert!(deliverer
            .notifications()
            .channels
            .borrow()
            .contains(REMINDER_CHANNEL_ID));
    }

    #[test]
    fn deliver_falls_back_to_default_text() {
        let deliverer = ReminderDeliverer::new(RecordingNotifier::default());
        deliverer.deliver(&ReminderPayload::default());
        assert_eq!(deliverer.notifications().shown.borrow()[0].body, "Reminder!");
    }

    #[test]
    fn successive_reminders_get_distinct_ids() {
        let deliverer = ReminderDeliverer::new(RecordingNotifier::default());
        let ids = (0..5)
            .filter_map(|_| deliverer.deliver(&ReminderPayload::new("x")))
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn notify_failure_is_not_retried() {
        let deliverer = ReminderDeliverer::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        assert_eq!(deliverer.deliver(&ReminderPayload::new("x")), None);
        assert!(deliverer.notifications().shown.borrow().is_empty());
    }
}
