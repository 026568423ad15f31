use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quicknotes")]
#[command(about = "Cloud-synced notes with reminders, from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name holding the Firebase configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, sign up, or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Save a new note
    #[command(alias = "new")]
    Add {
        /// Note content
        #[arg(required = true)]
        content: Vec<String>,
        /// Remind at a local time ("YYYY-MM-DD HH:MM") or an RFC 3339 instant
        #[arg(long, value_name = "TIME", conflicts_with = "remind_in")]
        remind_at: Option<String>,
        /// Remind after a delay such as 30s, 10m, 2h or 1d
        #[arg(long, value_name = "DELAY")]
        remind_in: Option<String>,
    },
    /// List notes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a note as done
    Check {
        /// Note ID or a unique fragment of it
        id: String,
    },
    /// Mark a note as not done
    Uncheck {
        /// Note ID or a unique fragment of it
        id: String,
    },
    /// Delete a note
    Delete {
        /// Note ID or a unique fragment of it
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the live note list and deliver reminders until interrupted
    Watch,
    /// Inspect or deliver pending reminders
    Reminders {
        #[command(subcommand)]
        command: ReminderCommands,
    },
    /// Configure CLI profiles and display settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password and store the session in the keychain
    Login {
        #[arg(long, value_name = "EMAIL", default_value = "")]
        email: String,
        #[arg(long, value_name = "PASSWORD", default_value = "")]
        password: String,
    },
    /// Create an account and store the session in the keychain
    Signup {
        #[arg(long, value_name = "EMAIL", default_value = "")]
        email: String,
        #[arg(long, value_name = "PASSWORD", default_value = "")]
        password: String,
    },
    /// Show auth status for the profile
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum ReminderCommands {
    /// List pending reminders
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Deliver reminders as they come due, until interrupted
    Run,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Firebase web API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Realtime Database URL
        #[arg(long, value_name = "URL")]
        database_url: Option<String>,
        /// Collection holding the notes
        #[arg(long, value_name = "NAME")]
        collection: Option<String>,
        /// Import api key and database URL from an Android google-services.json
        #[arg(long, value_name = "PATH")]
        google_services: Option<PathBuf>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved configuration
    Show,
    /// Turn dark mode on or off
    DarkMode {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}
