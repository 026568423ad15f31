use super::{ReminderPayload, TimerService};

/// Stable 32-bit token for a key: `h = 31 * h + unit` over the UTF-16
/// code units, wrapping.
///
/// Scheduling twice with the same key yields the same token, so the
/// second registration replaces the first.
pub fn request_token(key: &str) -> i32 {
    key.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

#[derive(Debug, Clone)]
pub struct ReminderScheduler<T: TimerService> {
    timers: T,
}

impl<T: TimerService> ReminderScheduler<T> {
    pub const fn new(timers: T) -> Self {
        Self { timers }
    }

    pub const fn timers(&self) -> &T {
        &self.timers
    }

    /// Register one timer for `note_text` at `fire_at` (Unix ms).
    ///
    /// Best effort: a failure is logged and reported as `false`.
    pub fn schedule(&self, note_text: &str, unique_key: &str, fire_at: i64) -> bool {
        let token = request_token(unique_key);
        match self
            .timers
            .schedule_once(token, fire_at, ReminderPayload::new(note_text))
        {
            Ok(()) => {
                tracing::info!(
                    "Scheduled reminder for {} at {} (token {})",
                    unique_key,
                    fire_at,
                    token
                );
                true
            }
            Err(error) => {
                tracing::warn!("Failed to schedule reminder for {}: {}", unique_key, error);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::TimerQueue;

    #[test]
    fn request_token_matches_string_hash() {
        assert_eq!(request_token(""), 0);
        assert_eq!(request_token("abc"), 96_354);
        assert_eq!(request_token("-NqZ3abc"), request_token("-NqZ3abc"));
        assert_ne!(request_token("-NqZ3abc"), request_token("-NqZ3abd"));
    }

    #[test]
    fn request_token_wraps_on_long_keys() {
        let token = request_token("-NqZ3abcdefghijklmnopqrstuvwxyz");
        assert_eq!(token, request_token("-NqZ3abcdefghijklmnopqrstuvwxyz"));
    }

    #[test]
    fn scheduling_same_key_replaces_timer() {
        let scheduler = ReminderScheduler::new(TimerQueue::in_memory());
        assert!(scheduler.schedule("first", "-key", 1_000));
        assert!(scheduler.schedule("second", "-key", 2_000));

        let pending = scheduler.timers().pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].fire_at, 2_000);
        assert_eq!(pending[0].payload.note_text.as_deref(), Some("second"));
        assert_eq!(pending[0].token, request_token("-key"));
    }
}
