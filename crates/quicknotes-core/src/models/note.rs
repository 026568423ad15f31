//! Note model and its wire record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A note identifier, assigned by the remote collection when the note is
/// created (a Firebase push id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Wrap a key produced by a database provider.
    pub(crate) const fn from_generated(key: String) -> Self {
        Self(key)
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in listings.
    #[must_use]
    pub fn short(&self) -> String {
        let count = self.0.chars().count();
        self.0.chars().skip(count.saturating_sub(8)).collect()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("note id must not be empty".to_string()));
        }
        if trimmed
            .chars()
            .any(|c| matches!(c, '.' | '#' | '$' | '[' | ']' | '/') || c.is_control())
        {
            return Err(Error::InvalidInput(format!(
                "note id '{trimmed}' contains characters not allowed in a key"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A note in the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Plain text content
    pub content: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Completion flag
    pub checked: bool,
    /// Reminder time chosen at creation (Unix ms)
    pub reminder_at: Option<i64>,
}

impl Note {
    /// Create a new, unchecked note
    #[must_use]
    pub fn new(
        id: NoteId,
        content: impl Into<String>,
        created_at: i64,
        reminder_at: Option<i64>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            created_at,
            checked: false,
            reminder_at,
        }
    }

    /// Get first line as title preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    /// Serialized form written to the remote collection.
    #[must_use]
    pub fn to_record(&self) -> NoteRecord {
        NoteRecord {
            id: Some(self.id.to_string()),
            content: Some(self.content.clone()),
            timestamp: Some(self.created_at),
            checked: self.checked,
            reminder_time: self.reminder_at,
        }
    }

    /// Build a note from a record stored under `key`.
    ///
    /// The key is authoritative for the id. Records without a creation
    /// timestamp are rejected.
    pub fn from_record(key: &str, record: NoteRecord) -> Result<Self, Error> {
        let id: NoteId = key.parse()?;
        let created_at = record
            .timestamp
            .ok_or_else(|| Error::InvalidInput(format!("record '{key}' has no timestamp")))?;

        if let Some(stored_id) = record.id.as_deref() {
            if stored_id != id.as_str() {
                tracing::debug!("Record id '{}' differs from key '{}'", stored_id, id);
            }
        }

        Ok(Self {
            id,
            content: record.content.unwrap_or_default(),
            created_at,
            checked: record.checked,
            reminder_at: record.reminder_time,
        })
    }
}

/// Wire form of a note, compatible with the records written by the
/// QuickNotes Android app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub checked: bool,
    #[serde(
        default,
        rename = "reminderTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub reminder_time: Option<i64>,
}

/// Decode a full collection snapshot into notes, in key order.
///
/// Children that cannot be decoded are skipped.
pub fn decode_snapshot(snapshot: &serde_json::Value) -> Vec<Note> {
    let Some(children) = snapshot.as_object() else {
        if !snapshot.is_null() {
            tracing::warn!("Ignoring non-object collection snapshot");
        }
        return Vec::new();
    };

    children
        .iter()
        .filter_map(|(key, value)| {
            let record = match serde_json::from_value::<NoteRecord>(value.clone()) {
                Ok(record) => record,
                Err(error) => {
                    tracing::warn!("Skipping undecodable record '{}': {}", key, error);
                    return None;
                }
            };
            match Note::from_record(key, record) {
                Ok(note) => Some(note),
                Err(error) => {
                    tracing::warn!("Skipping record '{}': {}", key, error);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn id(raw: &str) -> NoteId {
        raw.parse().unwrap()
    }

    #[test]
    fn test_note_id_rejects_invalid_keys() {
        assert!("".parse::<NoteId>().is_err());
        assert!("a.b".parse::<NoteId>().is_err());
        assert!("a/b".parse::<NoteId>().is_err());
        assert!("-NqZ3abc".parse::<NoteId>().is_ok());
    }

    #[test]
    fn test_note_id_short_keeps_tail() {
        assert_eq!(id("-NqZ3abcdefghijk").short(), "defghijk");
        assert_eq!(id("abc").short(), "abc");
    }

    #[test]
    fn test_note_new_is_unchecked() {
        let note = Note::new(id("k1"), "Buy milk", 1_000, None);
        assert!(!note.checked);
        assert_eq!(note.reminder_at, None);
    }

    #[test]
    fn test_record_uses_android_field_names() {
        let note = Note::new(id("k1"), "Call mom", 1_000, Some(61_000));
        let value = serde_json::to_value(note.to_record()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "k1",
                "content": "Call mom",
                "timestamp": 1_000,
                "checked": false,
                "reminderTime": 61_000
            })
        );
    }

    #[test]
    fn test_record_omits_missing_reminder() {
        let note = Note::new(id("k1"), "Buy milk", 1_000, None);
        let value = serde_json::to_value(note.to_record()).unwrap();
        assert!(value.get("reminderTime").is_none());
    }

    #[test]
    fn test_decode_snapshot_keeps_key_order_and_skips_bad_records() {
        let snapshot = json!({
            "-b": { "id": "-b", "content": "second", "timestamp": 2, "checked": true },
            "-a": { "id": "-a", "content": "first", "timestamp": 1 },
            "-c": { "content": "no timestamp" },
            "-d": "not a record"
        });

        let notes = decode_snapshot(&snapshot);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id.as_str(), "-a");
        assert_eq!(notes[1].id.as_str(), "-b");
        assert!(notes[1].checked);
    }

    #[test]
    fn test_decode_snapshot_key_is_authoritative() {
        let snapshot = json!({ "-key": { "id": "-other", "content": "x", "timestamp": 5 } });
        let notes = decode_snapshot(&snapshot);
        assert_eq!(notes[0].id.as_str(), "-key");
    }

    #[test]
    fn test_decode_empty_snapshot() {
        assert!(decode_snapshot(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_title_preview() {
        let note = Note::new(id("k"), "First line\nSecond line", 1, None);
        assert_eq!(note.title_preview(50), "First line");
        assert_eq!(note.title_preview(5), "First");
    }
}
