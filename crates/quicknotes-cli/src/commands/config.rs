use std::path::Path;

use quicknotes_core::config::{
    parse_google_services, ConfigError, FirebaseConfig, DEFAULT_COLLECTION,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use quicknotes_core::preferences::DisplayPreferences;
use quicknotes_core::util::normalize_text_option;

use crate::cli::{ConfigCommands, Toggle};
use crate::commands::common::open_preferences;
use crate::config_profiles::{default_config_path, default_reminders_path, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_key,
            database_url,
            collection,
            google_services,
            no_activate,
        } => {
            let explicit = FirebaseConfig {
                api_key,
                database_url,
                collection,
                request_timeout_secs: None,
            };
            run_config_init(
                global_profile,
                explicit,
                google_services.as_deref(),
                no_activate,
            )
        }
        ConfigCommands::Show => run_config_show(global_profile),
        ConfigCommands::DarkMode { state } => run_dark_mode(state),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    explicit: FirebaseConfig,
    google_services: Option<&Path>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config
        .profile(&profile_name)
        .map(|profile| profile.firebase.clone())
        .unwrap_or_default();

    let imported = match google_services {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|error| {
                CliError::Config(format!("Failed to read {}: {}", path.display(), error))
            })?;
            let imported = parse_google_services(&raw)?;
            println!("Imported Firebase settings from {}", path.display());
            imported
        }
        None => FirebaseConfig::default(),
    };

    let merged = merge_profile_settings(explicit, imported, FirebaseConfig::from_env(), existing);
    validate_profile(&merged)?;

    config.profile_mut_or_default(&profile_name).firebase = merged.clone();
    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    match merged.resolve() {
        Ok(_) => println!(
            "Profile '{profile_name}' is ready. Run `quicknotes auth login --email <email> --password <password>`."
        ),
        Err(ConfigError::Missing(field)) => {
            println!("Profile '{profile_name}' is missing: {field}");
        }
        Err(error) => return Err(error.into()),
    }
    Ok(())
}

/// Explicit flags, then an imported google-services.json, then the
/// environment, then what the profile already had.
pub fn merge_profile_settings(
    explicit: FirebaseConfig,
    imported: FirebaseConfig,
    env: FirebaseConfig,
    existing: FirebaseConfig,
) -> FirebaseConfig {
    explicit.or(imported).or(env).or(existing)
}

fn validate_profile(profile: &FirebaseConfig) -> Result<(), CliError> {
    match profile.clone().resolve() {
        Ok(_) | Err(ConfigError::Missing(_)) => Ok(()),
        Err(error) => Err(error.into()),
    }
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let firebase = config.firebase_for(&profile_name);
    let preferences = DisplayPreferences::load(&open_preferences()?);

    println!("profile:       {profile_name}");
    println!(
        "config file:   {}",
        default_config_path().map_err(CliError::Config)?.display()
    );
    println!(
        "api_key:       {}",
        firebase
            .api_key
            .as_deref()
            .map_or_else(|| "(unset)".to_string(), mask_secret)
    );
    println!(
        "database_url:  {}",
        firebase.database_url.as_deref().unwrap_or("(unset)")
    );
    println!(
        "collection:    {}",
        normalize_text_option(firebase.collection).as_deref().unwrap_or(DEFAULT_COLLECTION)
    );
    println!(
        "timeout:       {}s",
        firebase
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    );
    println!(
        "dark mode:     {}",
        if preferences.dark_mode { "on" } else { "off" }
    );
    println!(
        "reminders:     {}",
        default_reminders_path().map_err(CliError::Config)?.display()
    );
    Ok(())
}

fn run_dark_mode(state: Toggle) -> Result<(), CliError> {
    let store = open_preferences()?;
    let mut preferences = DisplayPreferences::load(&store);
    preferences
        .set_dark_mode(&store, state.enabled())
        .map_err(quicknotes_core::Error::from)?;
    println!(
        "Dark mode {}",
        if preferences.dark_mode { "on" } else { "off" }
    );
    Ok(())
}

/// Keep only the last four characters visible.
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail = value.chars().skip(count - 4).collect::<String>();
    format!("****{tail}")
}
