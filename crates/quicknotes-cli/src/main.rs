//! QuickNotes CLI - cloud-synced notes with reminders from the terminal.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;
mod notifier;
mod theme;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::check::run_set_checked;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::reminders::run_reminders;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "quicknotes=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Auth { command } => run_auth(command, profile).await,
        Commands::Add {
            content,
            remind_at,
            remind_in,
        } => run_add(&content, remind_at.as_deref(), remind_in.as_deref(), profile).await,
        Commands::List { json } => run_list(json, profile).await,
        Commands::Check { id } => run_set_checked(&id, true, profile).await,
        Commands::Uncheck { id } => run_set_checked(&id, false, profile).await,
        Commands::Delete { id, yes } => run_delete(&id, yes, profile).await,
        Commands::Watch => run_watch(profile).await,
        Commands::Reminders { command } => run_reminders(command).await,
        Commands::Config { command } => run_config(command, profile),
    }
}
