//! quicknotes-core - Core library for QuickNotes
//!
//! This crate contains the note model, the Firebase auth and realtime
//! database clients, reminder scheduling and delivery, display preferences,
//! and the note-surface services used by the QuickNotes front ends.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod preferences;
pub mod reminder;
pub mod services;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteId};
