//! Process-local database with the same snapshot semantics as the remote
//! one. Used by tests and for offline runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

use super::push_id::PushIdGenerator;
use super::{tree, DatabaseError, DatabaseProvider, DatabaseResult, DbPath, Subscription, SubscriptionEvent};
use crate::models::NoteId;

/// A call made against the in-memory database, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Write { path: String, value: Value },
    Delete { path: String },
}

#[derive(Debug, Default)]
struct MemoryState {
    root: Value,
    subscribers: Vec<MemorySubscriber>,
    operations: Vec<Operation>,
    fail_writes: bool,
    fail_deletes: bool,
}

#[derive(Debug)]
struct MemorySubscriber {
    path: DbPath,
    sender: mpsc::UnboundedSender<SubscriptionEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    push_ids: Arc<PushIdGenerator>,
}

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make every following delete fail until reset.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.lock().fail_deletes = fail;
    }

    /// Every write/delete attempted so far, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Current value stored at `path` (`Null` when absent).
    pub fn value_at(&self, path: &DbPath) -> Value {
        let state = self.lock();
        tree::get(&state.root, path.segments())
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Deliver a subscription error to every live subscriber.
    pub fn emit_error(&self, message: &str) {
        let mut state = self.lock();
        state.subscribers.retain(|subscriber| {
            subscriber
                .sender
                .send(SubscriptionEvent::Error(message.to_string()))
                .is_ok()
        });
    }

    /// Number of subscriptions that have not been cancelled.
    pub fn live_subscriptions(&self) -> usize {
        let mut state = self.lock();
        state
            .subscribers
            .retain(|subscriber| !subscriber.sender.is_closed());
        state.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(state: &mut MemoryState, changed: &DbPath) {
        let MemoryState {
            root, subscribers, ..
        } = state;
        subscribers.retain(|subscriber| {
            if !(changed.starts_with(&subscriber.path) || subscriber.path.starts_with(changed)) {
                return !subscriber.sender.is_closed();
            }
            let snapshot = tree::get(root, subscriber.path.segments())
                .cloned()
                .unwrap_or(Value::Null);
            subscriber
                .sender
                .send(SubscriptionEvent::Snapshot(snapshot))
                .is_ok()
        });
    }
}

impl DatabaseProvider for InMemoryDatabase {
    fn new_key(&self, _collection: &DbPath) -> NoteId {
        NoteId::from_generated(self.push_ids.next_id())
    }

    async fn write(&self, path: &DbPath, value: &Value) -> DatabaseResult<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Write {
            path: path.to_string(),
            value: value.clone(),
        });
        if state.fail_writes {
            return Err(DatabaseError::Api("simulated write failure".to_string()));
        }

        tree::set(&mut state.root, path.segments(), value.clone());
        Self::publish(&mut state, path);
        Ok(())
    }

    async fn delete(&self, path: &DbPath) -> DatabaseResult<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Delete {
            path: path.to_string(),
        });
        if state.fail_deletes {
            return Err(DatabaseError::Api("simulated delete failure".to_string()));
        }

        tree::set(&mut state.root, path.segments(), Value::Null);
        Self::publish(&mut state, path);
        Ok(())
    }

    async fn subscribe(&self, path: &DbPath) -> DatabaseResult<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let snapshot = tree::get(&state.root, path.segments())
            .cloned()
            .unwrap_or(Value::Null);
        // Initial snapshot, as the remote database sends on connect.
        let _ = sender.send(SubscriptionEvent::Snapshot(snapshot));
        state.subscribers.push(MemorySubscriber {
            path: path.clone(),
            sender,
        });
        Ok(Subscription::new(receiver, None))
    }
}
