use std::io::{self, BufRead, Write};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use quicknotes_core::config::ResolvedFirebaseConfig;
use quicknotes_core::db::{DbPath, FirebaseDatabaseClient};
use quicknotes_core::preferences::{DisplayPreferences, JsonPreferenceStore};
use quicknotes_core::reminder::TimerQueue;
use quicknotes_core::services::{check_session, GateDecision, NoteListStore, NoteRow, NoteSurface};
use quicknotes_core::{Note, NoteId};
use serde::Serialize;

use crate::auth::{auth_client, CliAuthClient};
use crate::config_profiles::{default_reminders_path, default_settings_path, CliProfilesConfig};
use crate::error::CliError;
use crate::theme::{format_created_at, Palette};

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub created_at_label: String,
    pub checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<i64>,
}

/// Authenticated clients for one profile.
pub struct Backend {
    pub profile_name: String,
    pub config: ResolvedFirebaseConfig,
    pub auth: CliAuthClient,
    pub db: FirebaseDatabaseClient,
    pub collection: DbPath,
}

impl Backend {
    /// Make sure the database client holds an id token that stays valid for
    /// at least `min_validity`, refreshing it early if needed.
    pub async fn refresh_token(&self, min_validity: Duration) -> bool {
        match self.auth.session_valid_for(min_validity).await {
            Ok(Some(session)) => {
                self.db.set_auth_token(Some(session.id_token));
                true
            }
            Ok(None) => {
                tracing::warn!("Session for profile '{}' ended", self.profile_name);
                false
            }
            Err(error) => {
                tracing::warn!("Failed to refresh session: {}", error);
                false
            }
        }
    }
}

pub fn load_profile_config(
    global_profile: Option<&str>,
) -> Result<(String, ResolvedFirebaseConfig), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let resolved = config.firebase_for(&profile_name).resolve().map_err(|error| {
        CliError::Config(format!(
            "{error}. Run `quicknotes config init --profile {profile_name}` or set the QUICKNOTES_* variables."
        ))
    })?;
    Ok((profile_name, resolved))
}

/// Resolve the profile, require a session, and build the clients.
pub async fn connect(global_profile: Option<&str>) -> Result<Backend, CliError> {
    let (profile_name, config) = load_profile_config(global_profile)?;
    let auth =
        auth_client(&profile_name, &config).map_err(|error| CliError::Auth(error.to_string()))?;
    let GateDecision::Proceed(session) = check_session(&auth).await else {
        return Err(CliError::NotSignedIn);
    };

    let db = FirebaseDatabaseClient::new(&config).map_err(quicknotes_core::Error::from)?;
    db.set_auth_token(Some(session.id_token));
    let collection = config
        .collection
        .parse::<DbPath>()
        .map_err(|error| CliError::Config(format!("Invalid collection: {error}")))?;

    Ok(Backend {
        profile_name,
        config,
        auth,
        db,
        collection,
    })
}

/// Open the note surface and wait for the first snapshot.
pub async fn open_surface(
    backend: &Backend,
) -> Result<NoteSurface<'_, FirebaseDatabaseClient>, CliError> {
    let mut surface = NoteSurface::open(&backend.db, backend.collection.clone()).await?;
    match tokio::time::timeout(backend.config.request_timeout, surface.wait_for_snapshot()).await {
        Ok(true) => Ok(surface),
        Ok(false) => Err(CliError::SubscriptionClosed),
        Err(_) => Err(CliError::SnapshotTimeout),
    }
}

pub fn open_preferences() -> Result<JsonPreferenceStore, CliError> {
    let path = default_settings_path().map_err(CliError::Config)?;
    Ok(JsonPreferenceStore::open(path).map_err(quicknotes_core::Error::from)?)
}

pub fn load_palette() -> Palette {
    match open_preferences() {
        Ok(store) => Palette::for_preferences(DisplayPreferences::load(&store)),
        Err(error) => {
            tracing::warn!("Falling back to default display settings: {}", error);
            Palette::for_preferences(DisplayPreferences::default())
        }
    }
}

pub fn open_timer_queue() -> Result<TimerQueue, CliError> {
    let path = default_reminders_path().map_err(CliError::Config)?;
    Ok(TimerQueue::open(path).map_err(quicknotes_core::Error::from)?)
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let id = id.trim();
    if id.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(id.to_string())
    }
}

/// Find the note whose id equals `query`, or the single one containing it.
pub fn resolve_note_id(list: &NoteListStore, query: &str) -> Result<NoteId, CliError> {
    let query = normalize_note_identifier(query)?;
    if let Some(note) = list.notes().find(|note| note.id.as_str() == query) {
        return Ok(note.id.clone());
    }

    let matches = list
        .notes()
        .filter(|note| note.id.as_str().contains(&query))
        .map(|note| note.id.clone())
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [] => Err(CliError::NoteNotFound(query)),
        [id] => Ok(id.clone()),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(NoteId::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "Note id '{query}' is ambiguous. Matches: {options}"
            )))
        }
    }
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        content: note.content.clone(),
        created_at: note.created_at,
        created_at_label: format_created_at(note.created_at),
        checked: note.checked,
        reminder_at: note.reminder_at,
    }
}

pub fn format_note_lines(rows: &[NoteRow], palette: Palette) -> Vec<String> {
    rows.iter().map(|row| palette.render_row(row)).collect()
}

/// Parse `--remind-at` / `--remind-in` into a Unix ms instant.
pub fn parse_reminder(
    remind_at: Option<&str>,
    remind_in: Option<&str>,
    now: DateTime<Local>,
) -> Result<Option<i64>, CliError> {
    if let Some(raw_delay) = remind_in {
        let delay = parse_delay(raw_delay)?;
        let delay = chrono::Duration::from_std(delay)
            .map_err(|error| CliError::InvalidReminder(error.to_string()))?;
        let fire_at = now.checked_add_signed(delay).ok_or_else(|| {
            CliError::InvalidReminder(format!("{} is too far in the future", raw_delay.trim()))
        })?;
        return Ok(Some(fire_at.timestamp_millis()));
    }

    let Some(raw) = remind_at.map(str::trim) else {
        return Ok(None);
    };
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(instant.timestamp_millis()));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").map_err(|_| {
        CliError::InvalidReminder(format!(
            "'{raw}' is neither \"YYYY-MM-DD HH:MM\" nor an RFC 3339 timestamp"
        ))
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| Some(time.timestamp_millis()))
        .ok_or_else(|| CliError::InvalidReminder(format!("'{raw}' does not exist in local time")))
}

/// `30s`, `10m`, `2h`, `1d`.
pub fn parse_delay(raw: &str) -> Result<Duration, CliError> {
    let raw = raw.trim();
    let invalid = || CliError::InvalidReminder(format!("'{raw}' is not a delay like 10m or 2h"));
    let (split, _) = raw.char_indices().last().ok_or_else(invalid)?;
    let (amount, unit) = raw.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| invalid())?;
    let seconds = match unit {
        "s" => Some(amount),
        "m" => amount.checked_mul(60),
        "h" => amount.checked_mul(60 * 60),
        "d" => amount.checked_mul(24 * 60 * 60),
        _ => None,
    }
    .ok_or_else(invalid)?;
    if seconds == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(seconds))
}

/// Ask a yes/no question on the terminal. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> bool {
    confirm_with(prompt, &mut io::stdin().lock(), &mut io::stdout())
}

pub fn confirm_with(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> bool {
    if write!(output, "{prompt} [y/N] ")
        .and_then(|()| output.flush())
        .is_err()
    {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(error) => {
            tracing::warn!("Failed to read confirmation: {}", error);
            false
        }
    }
}
