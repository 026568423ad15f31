use chrono::Local;
use quicknotes_core::reminder::ReminderScheduler;
use quicknotes_core::services::{Feedback, NoteEditor, SubmitOutcome};
use quicknotes_core::util::unix_millis_now;

use crate::commands::common::{connect, open_timer_queue, parse_reminder};
use crate::error::CliError;
use crate::theme::format_created_at;

pub async fn run_add(
    content_parts: &[String],
    remind_at: Option<&str>,
    remind_in: Option<&str>,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let content = content_parts.join(" ");
    if content.trim().is_empty() {
        return Err(CliError::Operation(Feedback::NoteEmpty));
    }

    let mut editor = NoteEditor::new();
    editor.set_input(content);
    if let Some(at) = parse_reminder(remind_at, remind_in, Local::now())? {
        let feedback = editor.reminder_mut().choose(at, unix_millis_now());
        if feedback.is_failure() {
            return Err(CliError::Operation(feedback));
        }
        println!("{feedback}");
    }

    let backend = connect(global_profile).await?;
    let scheduler = ReminderScheduler::new(open_timer_queue()?);

    match editor
        .submit(&backend.db, &backend.collection, &scheduler)
        .await
    {
        SubmitOutcome::Saved {
            note,
            reminder_scheduled,
        } => {
            println!("{}", Feedback::NoteSaved);
            println!("{}", note.id);
            match (note.reminder_at, reminder_scheduled) {
                (Some(at), true) => println!(
                    "Reminder due {}. Keep `quicknotes watch` or `quicknotes reminders run` going to receive it.",
                    format_created_at(at)
                ),
                (Some(_), false) => eprintln!("Warning: the reminder could not be scheduled"),
                (None, _) => {}
            }
            Ok(())
        }
        SubmitOutcome::Rejected(feedback) | SubmitOutcome::Failed(feedback) => {
            Err(CliError::Operation(feedback))
        }
    }
}
