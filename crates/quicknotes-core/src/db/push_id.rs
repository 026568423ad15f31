//! Firebase-compatible push ids.
//!
//! A push id is 8 characters of millisecond timestamp followed by 12 random
//! characters, all drawn from an alphabet whose byte order matches its
//! value order, so ids sort chronologically.

use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::util::unix_millis_now;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 12;

#[derive(Debug, Default)]
struct PushState {
    last_millis: i64,
    last_random: [u8; RANDOM_LEN],
}

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl PushIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.generate(unix_millis_now())
    }

    /// Generate an id for the given clock reading.
    ///
    /// Ids generated within the same millisecond reuse the previous random
    /// part incremented by one, keeping them strictly increasing.
    pub fn generate(&self, now_millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now_millis == state.last_millis {
            for digit in state.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            let entropy = Uuid::new_v4();
            for (digit, byte) in state.last_random.iter_mut().zip(entropy.as_bytes()) {
                *digit = byte % 64;
            }
        }
        state.last_millis = now_millis;

        let mut id = Vec::with_capacity(8 + RANDOM_LEN);
        let mut remaining = now_millis.max(0);
        let mut timestamp = [0u8; 8];
        for slot in timestamp.iter_mut().rev() {
            *slot = PUSH_CHARS[usize::try_from(remaining % 64).unwrap_or(0)];
            remaining /= 64;
        }
        id.extend_from_slice(&timestamp);
        id.extend(
            state
                .last_random
                .iter()
                .map(|digit| PUSH_CHARS[usize::from(*digit)]),
        );

        String::from_utf8_lossy(&id).into_owned()
    }
}
