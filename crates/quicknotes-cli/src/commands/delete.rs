use quicknotes_core::services::DeleteOutcome;

use crate::commands::common::{confirm, connect, open_surface, resolve_note_id};
use crate::error::CliError;

const PREVIEW_CHARS: usize = 60;

pub async fn run_delete(id: &str, yes: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let backend = connect(global_profile).await?;
    let mut surface = open_surface(&backend).await?;
    let note_id = resolve_note_id(surface.list(), id)?;

    let outcome = surface
        .delete_with_confirmation(&note_id, |note| {
            yes || confirm(&format!(
                "Delete \"{}\"?",
                note.title_preview(PREVIEW_CHARS)
            ))
        })
        .await;

    match outcome {
        DeleteOutcome::Deleted(feedback) => println!("{feedback}"),
        DeleteOutcome::Declined => println!("Cancelled"),
        DeleteOutcome::Failed(feedback) => return Err(CliError::Operation(feedback)),
        DeleteOutcome::NotFound => return Err(CliError::NoteNotFound(note_id.to_string())),
    }
    Ok(())
}
