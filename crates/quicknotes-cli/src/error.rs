use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quicknotes_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Invalid reminder time: {0}")]
    InvalidReminder(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in. Run `quicknotes auth login --email <email> --password <password>` first.")]
    NotSignedIn,
    #[error("Timed out waiting for notes from the database")]
    SnapshotTimeout,
    #[error("Note subscription closed before any notes arrived")]
    SubscriptionClosed,
    /// A note operation failed; the message is the user-facing feedback.
    #[error("{0}")]
    Operation(quicknotes_core::services::Feedback),
}

impl From<quicknotes_core::config::ConfigError> for CliError {
    fn from(error: quicknotes_core::config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}
