//! Error types for quicknotes-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::db::DatabaseError;
use crate::preferences::PreferenceError;
use crate::reminder::ReminderError;

/// Result type alias using quicknotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quicknotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Auth provider error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Remote database error
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Reminder scheduling or delivery error
    #[error(transparent)]
    Reminder(#[from] ReminderError),

    /// Preference store error
    #[error(transparent)]
    Preferences(#[from] PreferenceError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
