//! Composing a note and optionally scheduling its reminder.

use crate::db::{DatabaseProvider, DbPath};
use crate::models::Note;
use crate::reminder::{ReminderScheduler, TimerService};
use crate::util::{normalize_text_option, unix_millis_now};

use super::Feedback;

/// Who changed the reminder switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    User,
    /// Reset by the editor itself after a save; produces no feedback.
    Programmatic,
}

/// The "remind me" switch and the instant picked for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSelection {
    at: Option<i64>,
}

impl ReminderSelection {
    /// Turn the switch on at `at` (Unix ms). Past instants leave it off.
    pub fn choose(&mut self, at: i64, now: i64) -> Feedback {
        if at <= now {
            self.at = None;
            return Feedback::ReminderInPast;
        }
        self.at = Some(at);
        Feedback::ReminderSet
    }

    /// Turn the switch off.
    pub fn clear(&mut self, transition: Transition) -> Option<Feedback> {
        self.at = None;
        match transition {
            Transition::User => Some(Feedback::ReminderCleared),
            Transition::Programmatic => None,
        }
    }

    pub const fn pending(&self) -> Option<i64> {
        self.at
    }

    pub const fn is_enabled(&self) -> bool {
        self.at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was written.
    Rejected(Feedback),
    Saved {
        note: Note,
        reminder_scheduled: bool,
    },
    /// The write failed; input and reminder were kept for a retry.
    Failed(Feedback),
}

impl SubmitOutcome {
    pub const fn feedback(&self) -> Feedback {
        match self {
            Self::Rejected(feedback) | Self::Failed(feedback) => *feedback,
            Self::Saved { .. } => Feedback::NoteSaved,
        }
    }
}

/// Draft text plus reminder choice for the next note.
#[derive(Debug, Default)]
pub struct NoteEditor {
    input: String,
    reminder: ReminderSelection,
}

impl NoteEditor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub const fn reminder(&self) -> &ReminderSelection {
        &self.reminder
    }

    pub fn reminder_mut(&mut self) -> &mut ReminderSelection {
        &mut self.reminder
    }

    /// Write the draft as a new note under `collection`.
    ///
    /// The reminder is scheduled only once the write succeeded.
    pub async fn submit<D, T>(
        &mut self,
        db: &D,
        collection: &DbPath,
        scheduler: &ReminderScheduler<T>,
    ) -> SubmitOutcome
    where
        D: DatabaseProvider,
        T: TimerService,
    {
        let Some(content) = normalize_text_option(Some(self.input.clone())) else {
            return SubmitOutcome::Rejected(Feedback::NoteEmpty);
        };

        let id = db.new_key(collection);
        let path = match collection.child(id.as_str()) {
            Ok(path) => path,
            Err(error) => {
                tracing::error!("Generated key '{}' is not a valid path: {}", id, error);
                return SubmitOutcome::Failed(Feedback::NoteSaveFailed);
            }
        };
        let note = Note::new(id, content, unix_millis_now(), self.reminder.pending());
        let record = match serde_json::to_value(note.to_record()) {
            Ok(record) => record,
            Err(error) => {
                tracing::error!("Failed to encode note {}: {}", note.id, error);
                return SubmitOutcome::Failed(Feedback::NoteSaveFailed);
            }
        };

        if let Err(error) = db.write(&path, &record).await {
            tracing::warn!("Failed to save note {}: {}", note.id, error);
            return SubmitOutcome::Failed(Feedback::NoteSaveFailed);
        }
        tracing::info!("Saved note {}", note.id);

        self.input.clear();
        self.reminder.clear(Transition::Programmatic);

        let reminder_scheduled = note
            .reminder_at
            .is_some_and(|at| scheduler.schedule(&note.content, note.id.as_str(), at));

        SubmitOutcome::Saved {
            note,
            reminder_scheduled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryDatabase, Operation};
    use crate::reminder::{request_token, TimerQueue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn collection() -> DbPath {
        "notes".parse().unwrap()
    }

    fn scheduler() -> ReminderScheduler<TimerQueue> {
        ReminderScheduler::new(TimerQueue::in_memory())
    }

    #[test]
    fn reminder_switch_transitions() {
        let mut switch = ReminderSelection::default();
        assert_eq!(switch.choose(500, 1_000), Feedback::ReminderInPast);
        assert!(!switch.is_enabled());

        assert_eq!(switch.choose(5_000, 1_000), Feedback::ReminderSet);
        assert_eq!(switch.pending(), Some(5_000));

        assert_eq!(switch.clear(Transition::Programmatic), None);
        assert!(!switch.is_enabled());

        switch.choose(5_000, 1_000);
        assert_eq!(switch.clear(Transition::User), Some(Feedback::ReminderCleared));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_write() {
        let db = InMemoryDatabase::new();
        let mut editor = NoteEditor::new();
        editor.set_input("   \n ");

        let outcome = editor.submit(&db, &collection(), &scheduler()).await;
        assert_eq!(outcome, SubmitOutcome::Rejected(Feedback::NoteEmpty));
        assert!(db.operations().is_empty());
    }

    #[tokio::test]
    async fn save_writes_record_and_clears_input() {
        let db = InMemoryDatabase::new();
        let scheduler = scheduler();
        let mut editor = NoteEditor::new();
        editor.set_input("  Buy milk ");
        let t0 = unix_millis_now();

        let SubmitOutcome::Saved {
            note,
            reminder_scheduled,
        } = editor.submit(&db, &collection(), &scheduler).await
        else {
            panic!("expected save");
        };

        let t1 = unix_millis_now();
        assert_eq!(note.content, "Buy milk");
        assert!((t0..=t1).contains(&note.created_at));
        assert!(!note.checked);
        assert!(!reminder_scheduled);
        assert_eq!(editor.input(), "");
        assert!(scheduler.timers().pending().is_empty());

        let stored = db.value_at(&collection().child(note.id.as_str()).unwrap());
        assert_eq!(stored["content"], json!("Buy milk"));
        assert_eq!(stored["id"], json!(note.id.as_str()));
        assert_eq!(stored["checked"], json!(false));
        assert_eq!(stored["timestamp"], json!(note.created_at));
        assert!(stored.get("reminderTime").is_none());
    }

    #[tokio::test]
    async fn save_with_reminder_schedules_once_and_resets_switch() {
        let db = InMemoryDatabase::new();
        let scheduler = scheduler();
        let mut editor = NoteEditor::new();
        let fire_at = unix_millis_now() + 60_000;
        editor.set_input("Call mom");
        editor.reminder_mut().choose(fire_at, unix_millis_now());

        let SubmitOutcome::Saved {
            note,
            reminder_scheduled,
        } = editor.submit(&db, &collection(), &scheduler).await
        else {
            panic!("expected save");
        };

        assert!(reminder_scheduled);
        assert!(!editor.reminder().is_enabled());
        let pending = scheduler.timers().pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].fire_at, fire_at);
        assert_eq!(pending[0].token, request_token(note.id.as_str()));
        assert_eq!(pending[0].payload.note_text.as_deref(), Some("Call mom"));

        let stored = db.value_at(&collection().child(note.id.as_str()).unwrap());
        assert_eq!(stored["reminderTime"], json!(fire_at));
    }

    #[tokio::test]
    async fn failed_write_keeps_draft_and_skips_reminder() {
        let db = InMemoryDatabase::new();
        db.set_fail_writes(true);
        let scheduler = scheduler();
        let mut editor = NoteEditor::new();
        let fire_at = unix_millis_now() + 60_000;
        editor.set_input("Call mom");
        editor.reminder_mut().choose(fire_at, unix_millis_now());

        let outcome = editor.submit(&db, &collection(), &scheduler).await;

        assert_eq!(outcome, SubmitOutcome::Failed(Feedback::NoteSaveFailed));
        assert_eq!(editor.input(), "Call mom");
        assert_eq!(editor.reminder().pending(), Some(fire_at));
        assert!(scheduler.timers().pending().is_empty());
        assert!(matches!(db.operations().as_slice(), [Operation::Write { .. }]));
    }
}
