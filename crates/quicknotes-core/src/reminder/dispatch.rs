//! Fires due timers from a `TimerQueue`.

use std::future::Future;
use std::time::Duration;

use super::{NotificationService, ReminderDeliverer, TimerQueue};
use crate::util::unix_millis_now;

/// Upper bound on how long the dispatcher sleeps before re-reading the
/// queue, so timers scheduled by other processes are noticed.
pub const DISPATCH_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct ReminderDispatcher<N: NotificationService> {
    queue: TimerQueue,
    deliverer: ReminderDeliverer<N>,
    poll_interval: Duration,
}

impl<N: NotificationService> ReminderDispatcher<N> {
    pub const fn new(queue: TimerQueue, deliverer: ReminderDeliverer<N>) -> Self {
        Self {
            queue,
            deliverer,
            poll_interval: DISPATCH_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Deliver every timer due at `now` once. Returns how many fired.
    pub fn fire_due(&self, now: i64) -> usize {
        let due = match self.queue.take_due(now) {
            Ok(due) => due,
            Err(error) => {
                tracing::warn!("Failed to read pending reminders: {}", error);
                return 0;
            }
        };

        for timer in &due {
            tracing::info!("Reminder timer {} fired", timer.token);
            self.deliverer.deliver(&timer.payload);
        }
        due.len()
    }

    /// Fire timers as they come due until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            let now = unix_millis_now();
            self.fire_due(now);

            let wait = self
                .queue
                .next_fire_at()
                .map_or(self.poll_interval, |next| {
                    let until_next = u64::try_from(next.saturating_sub(now)).unwrap_or(0);
                    Duration::from_millis(until_next).min(self.poll_interval)
                });

            tokio::select! {
                () = &mut shutdown => {
                    tracing::debug!("Reminder dispatcher stopped");
                    return;
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}
