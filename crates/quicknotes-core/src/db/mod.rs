//! Remote realtime database layer.
//!
//! `DatabaseProvider` is the boundary the note services talk to. Two
//! implementations ship here: `FirebaseDatabaseClient` (Realtime Database
//! REST + streaming) and `InMemoryDatabase` (process-local, for tests and
//! offline use).

mod firebase;
mod memory;
mod push_id;
mod stream;
mod tree;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::models::NoteId;

pub use firebase::FirebaseDatabaseClient;
pub use memory::{InMemoryDatabase, Operation};
pub use push_id::PushIdGenerator;
pub use stream::{EventStreamParser, ServerEvent};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid database path '{0}'")]
    InvalidPath(String),
    #[error("Database HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Database request timed out")]
    Timeout,
    #[error("Failed to parse database payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database rejected the request: permission denied")]
    PermissionDenied,
    #[error("Database session is no longer authorized")]
    Unauthorized,
    #[error("Database API error: {0}")]
    Api(String),
    #[error("Event stream error: {0}")]
    Stream(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// A `/`-separated location in the database tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The database root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn child(&self, segment: &str) -> DatabaseResult<Self> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `self` is `other` or lies below it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl FromStr for DbPath {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let segments = trimmed
            .split('/')
            .map(|segment| {
                validate_segment(segment).map_err(|_| DatabaseError::InvalidPath(s.to_string()))?;
                Ok(segment.to_string())
            })
            .collect::<DatabaseResult<Vec<_>>>()?;
        Ok(Self { segments })
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

fn validate_segment(segment: &str) -> DatabaseResult<()> {
    if segment.is_empty()
        || segment
            .chars()
            .any(|c| matches!(c, '.' | '#' | '$' | '[' | ']' | '/') || c.is_control())
    {
        return Err(DatabaseError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

/// What a subscription delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    /// The complete current value of the subscribed location.
    Snapshot(serde_json::Value),
    /// A transport or permission problem. The provider keeps trying.
    Error(String),
}

/// Handle to a live subscription. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<SubscriptionEvent>,
    task: Option<AbortHandle>,
}

impl Subscription {
    pub(crate) const fn new(
        receiver: mpsc::UnboundedReceiver<SubscriptionEvent>,
        task: Option<AbortHandle>,
    ) -> Self {
        Self { receiver, task }
    }

    /// Wait for the next event. Returns `None` once cancelled.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.receiver.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The database provider boundary.
#[allow(async_fn_in_trait)]
pub trait DatabaseProvider {
    /// A fresh unique key for a new child of `collection`.
    fn new_key(&self, collection: &DbPath) -> NoteId;

    /// Replace the value at `path`.
    async fn write(&self, path: &DbPath, value: &serde_json::Value) -> DatabaseResult<()>;

    /// Remove the value at `path`.
    async fn delete(&self, path: &DbPath) -> DatabaseResult<()>;

    /// Subscribe to full snapshots of `path`.
    async fn subscribe(&self, path: &DbPath) -> DatabaseResult<Subscription>;

    fn unsubscribe(&self, mut subscription: Subscription) {
        subscription.cancel();
    }
}
