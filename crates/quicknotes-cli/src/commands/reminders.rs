use quicknotes_core::reminder::{PendingTimer, ReminderDeliverer, ReminderDispatcher, DEFAULT_REMINDER_TEXT};

use crate::cli::ReminderCommands;
use crate::commands::common::open_timer_queue;
use crate::error::CliError;
use crate::notifier::TerminalNotifier;
use crate::theme::format_created_at;

pub async fn run_reminders(command: ReminderCommands) -> Result<(), CliError> {
    let queue = open_timer_queue()?;
    match command {
        ReminderCommands::List { json } => {
            let pending = queue.pending();
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No pending reminders.");
            } else {
                for line in format_pending_lines(&pending) {
                    println!("{line}");
                }
            }
        }
        ReminderCommands::Run => {
            println!("Delivering reminders. Ctrl-C to exit.");
            let dispatcher =
                ReminderDispatcher::new(queue, ReminderDeliverer::new(TerminalNotifier::new()));
            dispatcher
                .run(async {
                    if let Err(error) = tokio::signal::ctrl_c().await {
                        tracing::warn!("Failed to listen for Ctrl-C: {}", error);
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
    }
    Ok(())
}

pub fn format_pending_lines(pending: &[PendingTimer]) -> Vec<String> {
    pending
        .iter()
        .map(|timer| {
            format!(
                "{}  {}  (token {})",
                format_created_at(timer.fire_at),
                timer
                    .payload
                    .note_text
                    .as_deref()
                    .unwrap_or(DEFAULT_REMINDER_TEXT),
                timer.token
            )
        })
        .collect()
}
