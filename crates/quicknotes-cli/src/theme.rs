//! List rendering in light and dark palettes.

use chrono::{Local, TimeZone};
use quicknotes_core::preferences::DisplayPreferences;
use quicknotes_core::services::NoteRow;

const RESET: &str = "\x1b[0m";
const STRIKE: &str = "\x1b[9m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    text: &'static str,
    muted: &'static str,
}

impl Palette {
    pub const LIGHT: Self = Self {
        text: "\x1b[30m",
        muted: "\x1b[90m",
    };
    pub const DARK: Self = Self {
        text: "\x1b[97m",
        muted: "\x1b[37m",
    };

    pub const fn for_preferences(preferences: DisplayPreferences) -> Self {
        if preferences.dark_mode {
            Self::DARK
        } else {
            Self::LIGHT
        }
    }

    /// One list line: checkbox, content (struck through when checked),
    /// creation time and short id.
    pub fn render_row(self, row: &NoteRow) -> String {
        let checkbox = if row.note.checked { "[x]" } else { "[ ]" };
        let content = row.note.content.replace('\n', " ");
        let content = if row.struck_through {
            // The reset also drops the palette colour, so restore it.
            format!("{STRIKE}{content}{RESET}{}", self.text)
        } else {
            content
        };
        format!(
            "{}{} {}{}  {}{} · {}{}",
            self.text,
            checkbox,
            content,
            RESET,
            self.muted,
            format_created_at(row.note.created_at),
            row.note.id.short(),
            RESET,
        )
    }
}

/// `MMM dd, hh:mm a` in local time.
pub fn format_created_at(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map_or_else(
            || "unknown time".to_string(),
            |time| time.format("%b %d, %I:%M %p").to_string(),
        )
}
