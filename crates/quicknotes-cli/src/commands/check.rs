use quicknotes_core::services::ToggleOutcome;

use crate::commands::common::{connect, open_surface, resolve_note_id};
use crate::error::CliError;

pub async fn run_set_checked(
    id: &str,
    checked: bool,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let backend = connect(global_profile).await?;
    let mut surface = open_surface(&backend).await?;
    let note_id = resolve_note_id(surface.list(), id)?;

    match surface.set_checked(&note_id, checked).await {
        ToggleOutcome::Updated { checked: true } => println!("Checked {note_id}"),
        ToggleOutcome::Updated { checked: false } => println!("Unchecked {note_id}"),
        ToggleOutcome::Failed { feedback } => return Err(CliError::Operation(feedback)),
        ToggleOutcome::NotFound => return Err(CliError::NoteNotFound(note_id.to_string())),
    }
    Ok(())
}
