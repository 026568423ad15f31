//! Data models for QuickNotes

mod note;

pub use note::{decode_snapshot, Note, NoteId, NoteRecord};
