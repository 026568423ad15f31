//! Ordered note rows kept in step with database snapshots.

use serde_json::Value;

use crate::db::SubscriptionEvent;
use crate::models::{decode_snapshot, Note, NoteId};

/// A note as presented in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub note: Note,
    /// Rendered with strike-through; follows `note.checked`.
    pub struck_through: bool,
}

impl From<Note> for NoteRow {
    fn from(note: Note) -> Self {
        let struck_through = note.checked;
        Self {
            note,
            struck_through,
        }
    }
}

/// Local mirror of the remote collection.
///
/// Rows are only ever replaced wholesale from snapshots. The one exception is
/// the checked presentation, which is flipped locally while the matching
/// remote write is in flight.
#[derive(Debug, Default)]
pub struct NoteListStore {
    rows: Vec<NoteRow>,
    snapshots_applied: u64,
}

impl NoteListStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with the notes in `snapshot`, in collection order.
    pub fn apply_snapshot(&mut self, snapshot: &Value) {
        self.rows = decode_snapshot(snapshot)
            .into_iter()
            .map(NoteRow::from)
            .collect();
        self.snapshots_applied += 1;
        tracing::debug!("Applied snapshot with {} notes", self.rows.len());
    }

    /// Apply one subscription event. Returns whether the list changed.
    pub fn handle_event(&mut self, event: SubscriptionEvent) -> bool {
        match event {
            SubscriptionEvent::Snapshot(snapshot) => {
                self.apply_snapshot(&snapshot);
                true
            }
            SubscriptionEvent::Error(message) => {
                tracing::error!("Note subscription error: {}", message);
                false
            }
        }
    }

    pub fn rows(&self) -> &[NoteRow] {
        &self.rows
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.rows.iter().map(|row| &row.note)
    }

    pub fn find(&self, id: &NoteId) -> Option<&NoteRow> {
        self.rows.iter().find(|row| &row.note.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of snapshots applied so far; zero until the first one arrives.
    pub const fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    pub(crate) fn set_presentation(&mut self, id: &NoteId, checked: bool) -> bool {
        let Some(row) = self.rows.iter_mut().find(|row| &row.note.id == id) else {
            return false;
        };
        row.note.checked = checked;
        row.struck_through = checked;
        true
    }
}
