//! User-facing outcome messages shown after an operation.

use std::fmt;

/// Short, user-facing outcome messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    EnterCredentials,
    LoginSuccessful,
    LoginFailed,
    SignupSuccessful,
    SignupFailed,
    NoteEmpty,
    NoteSaved,
    NoteSaveFailed,
    NoteUpdateFailed,
    NoteDeleted,
    NoteDeleteFailed,
    ReminderSet,
    ReminderCleared,
    ReminderInPast,
}

impl Feedback {
    pub const fn message(self) -> &'static str {
        match self {
            Self::EnterCredentials => "Enter email & password",
            Self::LoginSuccessful => "Login successful",
            Self::LoginFailed => "Login failed",
            Self::SignupSuccessful => "Signup successful",
            Self::SignupFailed => "Signup failed",
            Self::NoteEmpty => "Note is empty!",
            Self::NoteSaved => "Note saved!",
            Self::NoteSaveFailed => "Error saving note",
            Self::NoteUpdateFailed => "Failed to update note",
            Self::NoteDeleted => "Note deleted!",
            Self::NoteDeleteFailed => "Failed to delete note",
            Self::ReminderSet => "Reminder set!",
            Self::ReminderCleared => "Reminder cleared",
            Self::ReminderInPast => "Reminder must be in the future",
        }
    }

    /// Whether the message reports a failure.
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::EnterCredentials
                | Self::LoginFailed
                | Self::SignupFailed
                | Self::NoteEmpty
                | Self::NoteSaveFailed
                | Self::NoteUpdateFailed
                | Self::NoteDeleteFailed
                | Self::ReminderInPast
        )
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
