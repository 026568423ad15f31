use std::io::Write;
use std::time::Duration;

use quicknotes_core::reminder::{ReminderDeliverer, ReminderDispatcher};
use quicknotes_core::services::{NoteListStore, NoteSurface};

use crate::commands::common::{connect, format_note_lines, load_palette, open_timer_queue};
use crate::error::CliError;
use crate::notifier::TerminalNotifier;
use crate::theme::Palette;

/// Id tokens live for an hour; check on them well before that.
const TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Each check leaves a token that outlives the next check.
pub const MIN_TOKEN_VALIDITY: Duration =
    Duration::from_secs(TOKEN_REFRESH_INTERVAL.as_secs() + 2 * 60);

pub async fn run_watch(global_profile: Option<&str>) -> Result<(), CliError> {
    let backend = connect(global_profile).await?;
    let palette = load_palette();
    let dispatcher = ReminderDispatcher::new(
        open_timer_queue()?,
        ReminderDeliverer::new(TerminalNotifier::new()),
    );
    let mut surface = NoteSurface::open(&backend.db, backend.collection.clone()).await?;
    tracing::info!("Watching '{}' for profile '{}'", backend.collection, backend.profile_name);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    // The dispatcher stops when this select loop drops it.
    let dispatch = dispatcher.run(std::future::pending::<()>());
    tokio::pin!(dispatch);
    let mut refresh = tokio::time::interval_at(
        tokio::time::Instant::now() + TOKEN_REFRESH_INTERVAL,
        TOKEN_REFRESH_INTERVAL,
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            () = &mut dispatch => break,
            update = surface.next_update() => match update {
                Some(true) => render(&backend.profile_name, surface.list(), palette)?,
                Some(false) => {}
                None => break,
            },
            _ = refresh.tick() => {
                if !backend.refresh_token(MIN_TOKEN_VALIDITY).await {
                    eprintln!("Session ended. Run `quicknotes auth login` to continue.");
                    break;
                }
            }
        }
    }

    surface.close();
    Ok(())
}

fn render(profile_name: &str, list: &NoteListStore, palette: Palette) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\x1b[2J\x1b[H")?;
    writeln!(stdout, "QuickNotes ({profile_name}), {} notes. Ctrl-C to exit.", list.len())?;
    writeln!(stdout)?;
    for line in format_note_lines(list.rows(), palette) {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}
