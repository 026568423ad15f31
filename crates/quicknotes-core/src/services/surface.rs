//! The open notes list: live subscription plus check and delete actions.

use serde_json::Value;

use crate::db::{DatabaseProvider, DbPath, Subscription};
use crate::models::{Note, NoteId};
use crate::Result;

use super::{Feedback, NoteListStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Updated { checked: bool },
    /// The write failed and the local presentation was rolled back.
    Failed { feedback: Feedback },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Declined,
    Deleted(Feedback),
    Failed(Feedback),
    NotFound,
}

impl DeleteOutcome {
    pub const fn feedback(self) -> Option<Feedback> {
        match self {
            Self::Deleted(feedback) | Self::Failed(feedback) => Some(feedback),
            Self::Declined | Self::NotFound => None,
        }
    }
}

/// The signed-in note surface: one live subscription to the collection and
/// the list derived from it.
pub struct NoteSurface<'a, D: DatabaseProvider> {
    db: &'a D,
    collection: DbPath,
    list: NoteListStore,
    subscription: Option<Subscription>,
}

impl<'a, D: DatabaseProvider> NoteSurface<'a, D> {
    /// Subscribe to `collection`. The list stays empty until the first
    /// snapshot is received.
    pub async fn open(db: &'a D, collection: DbPath) -> Result<Self> {
        let subscription = db.subscribe(&collection).await?;
        tracing::debug!("Subscribed to {}", collection);
        Ok(Self {
            db,
            collection,
            list: NoteListStore::new(),
            subscription: Some(subscription),
        })
    }

    pub const fn list(&self) -> &NoteListStore {
        &self.list
    }

    pub const fn collection(&self) -> &DbPath {
        &self.collection
    }

    pub const fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next subscription event and apply it.
    ///
    /// Returns `None` once the subscription is closed, otherwise whether the
    /// list changed.
    pub async fn next_update(&mut self) -> Option<bool> {
        let event = self.subscription.as_mut()?.next().await?;
        Some(self.list.handle_event(event))
    }

    /// Wait until at least one snapshot has been applied. Returns `false` if
    /// the subscription closed first.
    pub async fn wait_for_snapshot(&mut self) -> bool {
        while self.list.snapshots_applied() == 0 {
            if self.next_update().await.is_none() {
                return false;
            }
        }
        true
    }

    pub async fn toggle_checked(&mut self, id: &NoteId) -> ToggleOutcome {
        let Some(row) = self.list.find(id) else {
            return ToggleOutcome::NotFound;
        };
        let checked = !row.note.checked;
        self.set_checked(id, checked).await
    }

    /// Flip the presentation right away, then write the flag.
    pub async fn set_checked(&mut self, id: &NoteId, checked: bool) -> ToggleOutcome {
        let Some(previous) = self.list.find(id).map(|row| row.note.checked) else {
            return ToggleOutcome::NotFound;
        };
        self.list.set_presentation(id, checked);

        let path = match self.field_path(id, "checked") {
            Ok(path) => path,
            Err(error) => {
                tracing::error!("Invalid path for note {}: {}", id, error);
                self.list.set_presentation(id, previous);
                return ToggleOutcome::Failed {
                    feedback: Feedback::NoteUpdateFailed,
                };
            }
        };

        match self.db.write(&path, &Value::Bool(checked)).await {
            Ok(()) => {
                tracing::info!("Note {} checked={}", id, checked);
                ToggleOutcome::Updated { checked }
            }
            Err(error) => {
                tracing::warn!("Failed to update note {}: {}", id, error);
                self.list.set_presentation(id, previous);
                ToggleOutcome::Failed {
                    feedback: Feedback::NoteUpdateFailed,
                }
            }
        }
    }

    /// Delete a note after `confirm` agrees. The list itself only changes
    /// when the resulting snapshot arrives.
    pub async fn delete_with_confirmation(
        &mut self,
        id: &NoteId,
        confirm: impl FnOnce(&Note) -> bool,
    ) -> DeleteOutcome {
        let Some(row) = self.list.find(id) else {
            return DeleteOutcome::NotFound;
        };
        if !confirm(&row.note) {
            tracing::debug!("Deletion of {} declined", id);
            return DeleteOutcome::Declined;
        }

        let result = match self.collection.child(id.as_str()) {
            Ok(path) => self.db.delete(&path).await.map_err(crate::Error::from),
            Err(error) => Err(error.into()),
        };
        match result {
            Ok(()) => {
                tracing::info!("Deleted note {}", id);
                DeleteOutcome::Deleted(Feedback::NoteDeleted)
            }
            Err(error) => {
                tracing::warn!("Failed to delete note {}: {}", id, error);
                DeleteOutcome::Failed(Feedback::NoteDeleteFailed)
            }
        }
    }

    /// Stop listening. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.db.unsubscribe(subscription);
            tracing::debug!("Unsubscribed from {}", self.collection);
        }
    }

    fn field_path(&self, id: &NoteId, field: &str) -> crate::db::DatabaseResult<DbPath> {
        self.collection.child(id.as_str())?.child(field)
    }
}

impl<D: DatabaseProvider> Drop for NoteSurface<'_, D> {
    fn drop(&mut self) {
        self.close();
    }
}
